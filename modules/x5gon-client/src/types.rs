use serde::{Deserialize, Deserializer};

// --- Page envelope ---

/// One page of `/oer_materials`.
///
/// Materials are kept as raw JSON so that one malformed entry can be
/// skipped by the caller without losing the rest of the page or its cursor.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    pub oer_materials: Vec<serde_json::Value>,
    pub links: PageLinks,
}

/// Pagination links. `next` is absent or null on the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

// --- Material ---

/// A single catalog entry, as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMaterial {
    #[serde(deserialize_with = "id_string")]
    pub material_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub language: Option<String>,
    pub creation_date: Option<String>,
    pub retrieved_date: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub extension: Option<String>,
    pub mimetype: Option<String>,
    pub provider: Option<Provider>,
    pub license: Option<String>,
    /// Wikipedia concepts mentioned in the material.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub wikipedia: Vec<ConceptMention>,
}

impl RawMaterial {
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub provider_domain: Option<String>,
}

/// A concept annotation attached to a material by the catalog's wikifier.
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptMention {
    #[serde(rename = "secName")]
    pub sec_name: Option<String>,
    #[serde(rename = "secUri")]
    pub sec_uri: Option<String>,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub lang: Option<String>,
    #[serde(rename = "supportLen")]
    pub support_len: Option<serde_json::Number>,
    #[serde(rename = "pageRank", default)]
    pub page_rank: Option<f64>,
}

impl ConceptMention {
    /// The section name, if it is present and non-blank.
    pub fn section_name(&self) -> Option<&str> {
        self.sec_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// The catalog returns numeric ids, but nothing downstream does arithmetic on
// them, so they are carried as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Str(String),
}

impl From<IdRepr> for String {
    fn from(id: IdRepr) -> Self {
        match id {
            IdRepr::Int(n) => n.to_string(),
            IdRepr::Str(s) => s,
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    IdRepr::deserialize(d).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<IdRepr>::deserialize(d)?.map(String::from))
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}
