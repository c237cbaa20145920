use serde::{Deserialize, Serialize};

// --- Output tables ---
//
// Field order in each row struct is the column order on disk. The csv
// writer serializes structs positionally, so reordering fields reorders
// columns.

/// Column names of the materials table, in order.
pub const MATERIAL_COLUMNS: [&str; 15] = [
    "tag",
    "material_id",
    "title",
    "description",
    "url",
    "language",
    "creation_date",
    "retrieved_date",
    "type",
    "extension",
    "mimetype",
    "provider_id",
    "provider_name",
    "provider_domain",
    "license",
];

/// Column names of the concepts table, in order.
pub const CONCEPT_COLUMNS: [&str; 12] = [
    "tag",
    "slug",
    "title",
    "description",
    "text",
    "page_length",
    "uri",
    "name",
    "secUri",
    "secName",
    "lang",
    "supportLen",
];

/// Column names of the links table, in order.
pub const LINK_COLUMNS: [&str; 5] = [
    "material_tag",
    "concept_tag",
    "concept_slug",
    "material_id",
    "target",
];

/// One accepted open educational resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRow {
    pub tag: u64,
    pub material_id: String,
    pub title: Option<String>,
    pub description: String,
    pub url: Option<String>,
    pub language: String,
    pub creation_date: Option<String>,
    pub retrieved_date: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub extension: Option<String>,
    pub mimetype: Option<String>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub provider_domain: Option<String>,
    pub license: Option<String>,
}

/// One accepted concept, enriched from the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRow {
    pub tag: u64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub text: String,
    pub page_length: usize,
    pub uri: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "secUri")]
    pub sec_uri: Option<String>,
    #[serde(rename = "secName")]
    pub sec_name: String,
    pub lang: Option<String>,
    #[serde(rename = "supportLen")]
    pub support_len: Option<serde_json::Number>,
}

/// One material → concept edge. `target` is the catalog's relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub material_tag: u64,
    pub concept_tag: u64,
    pub concept_slug: String,
    pub material_id: String,
    pub target: f64,
}
