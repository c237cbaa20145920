use serde::Deserialize;

/// A resolved knowledge-base page. Text is plain, unnormalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    /// Lead section only.
    pub summary: String,
    /// Full page text.
    pub text: String,
}

// --- action=query&prop=extracts (formatversion=2) ---

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryBody {
    #[serde(default)]
    pub pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtractPage {
    pub title: Option<String>,
    pub extract: Option<String>,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
}
