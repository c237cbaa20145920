use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected `oer_materials`/`links` shape.
    #[error("Malformed catalog response: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Network failures, rate limiting and 5xx responses are worth retrying.
    /// A malformed body is not: the cursor it should have carried is lost.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(_) => true,
            CatalogError::Api { status, .. } => *status == 429 || *status >= 500,
            CatalogError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}
