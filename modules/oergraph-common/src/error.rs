use thiserror::Error;

#[derive(Error, Debug)]
pub enum OerGraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dedup store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for OerGraphError {
    fn from(err: serde_json::Error) -> Self {
        OerGraphError::Store(err.to_string())
    }
}
