//! Offline consistency check of a data directory.
//!
//! Reads back the three tables and reports every broken cross-reference:
//! tag gaps, duplicate slugs and links that point at missing rows.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use oergraph_common::OerGraphError;
use serde::Deserialize;
use tracing::info;

use crate::sink::{CONCEPTS_FILE, LINKS_FILE, MATERIALS_FILE};

#[derive(Deserialize)]
struct MaterialKey {
    tag: u64,
}

#[derive(Deserialize)]
struct ConceptKey {
    tag: u64,
    slug: String,
}

#[derive(Deserialize)]
struct LinkKey {
    material_tag: u64,
    concept_tag: u64,
    concept_slug: String,
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub materials: usize,
    pub concepts: usize,
    pub links: usize,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Data Check ===")?;
        writeln!(f, "Materials: {}", self.materials)?;
        writeln!(f, "Concepts:  {}", self.concepts)?;
        writeln!(f, "Links:     {}", self.links)?;
        if self.is_clean() {
            return write!(f, "No problems found");
        }
        writeln!(f, "\nProblems ({}):", self.problems.len())?;
        for problem in &self.problems {
            writeln!(f, "  - {problem}")?;
        }
        Ok(())
    }
}

/// Check the tables under `data_dir`.
pub fn verify_data_dir(data_dir: &Path) -> Result<VerifyReport, OerGraphError> {
    let materials: Vec<MaterialKey> = read_table(&data_dir.join(MATERIALS_FILE))?;
    let concepts: Vec<ConceptKey> = read_table(&data_dir.join(CONCEPTS_FILE))?;
    let links: Vec<LinkKey> = read_table(&data_dir.join(LINKS_FILE))?;

    let mut report = VerifyReport {
        materials: materials.len(),
        concepts: concepts.len(),
        links: links.len(),
        problems: Vec::new(),
    };

    for (expected, row) in materials.iter().enumerate() {
        if row.tag != expected as u64 {
            report.problems.push(format!(
                "materials row {} has tag {}, expected {expected}",
                expected + 1,
                row.tag
            ));
            break;
        }
    }
    let material_tags: HashSet<u64> = materials.iter().map(|m| m.tag).collect();

    // Concepts accumulate across runs but tags keep counting, so the table is
    // still 0, 1, 2, … from the top.
    for (expected, row) in concepts.iter().enumerate() {
        if row.tag != expected as u64 {
            report.problems.push(format!(
                "concepts row {} has tag {}, expected {expected}",
                expected + 1,
                row.tag
            ));
            break;
        }
    }
    let mut slug_by_tag: HashMap<u64, &str> = HashMap::with_capacity(concepts.len());
    let mut seen_slugs: HashSet<&str> = HashSet::with_capacity(concepts.len());
    for row in &concepts {
        if !seen_slugs.insert(row.slug.as_str()) {
            report
                .problems
                .push(format!("slug {:?} appears more than once", row.slug));
        }
        slug_by_tag.insert(row.tag, row.slug.as_str());
    }

    for (i, link) in links.iter().enumerate() {
        let line = i + 1;
        if !material_tags.contains(&link.material_tag) {
            report.problems.push(format!(
                "link {line} references missing material tag {}",
                link.material_tag
            ));
        }
        match slug_by_tag.get(&link.concept_tag) {
            None => report.problems.push(format!(
                "link {line} references missing concept tag {}",
                link.concept_tag
            )),
            Some(slug) if *slug != link.concept_slug => report.problems.push(format!(
                "link {line} names slug {:?} but concept {} is {:?}",
                link.concept_slug, link.concept_tag, slug
            )),
            Some(_) => {}
        }
    }

    info!(
        materials = report.materials,
        concepts = report.concepts,
        links = report.links,
        problems = report.problems.len(),
        "Data directory checked"
    );
    Ok(report)
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, OerGraphError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
