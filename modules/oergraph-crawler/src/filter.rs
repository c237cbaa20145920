use oergraph_common::Config;
use x5gon_client::RawMaterial;

use crate::enrichment::EnrichedConcept;

/// Acceptance predicates for materials and enriched concepts. Lengths are
/// counted in characters and must strictly exceed the minimum.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub target_language: String,
    pub min_description_chars: usize,
    pub min_concept_text_chars: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            min_description_chars: 50,
            min_concept_text_chars: 50,
        }
    }
}

impl RecordFilter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_language: config.target_language.clone(),
            min_description_chars: config.min_description_chars,
            min_concept_text_chars: config.min_concept_text_chars,
        }
    }

    pub fn accept_material(&self, material: &RawMaterial) -> bool {
        let long_enough = material
            .description
            .as_deref()
            .is_some_and(|d| d.chars().count() > self.min_description_chars);
        long_enough && material.language.as_deref() == Some(self.target_language.as_str())
    }

    pub fn accept_concept(&self, concept: &EnrichedConcept) -> bool {
        concept.text.chars().count() > self.min_concept_text_chars
    }
}
