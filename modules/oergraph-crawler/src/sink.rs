//! Append-only output tables.
//!
//! Each write appends exactly one row and flushes it before returning, so
//! a material row always reaches disk before any link that references it
//! and a crash leaves every table loadable.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use oergraph_common::{
    ConceptRow, LinkRow, MaterialRow, OerGraphError, CONCEPT_COLUMNS, LINK_COLUMNS,
    MATERIAL_COLUMNS,
};
use tracing::info;

pub const MATERIALS_FILE: &str = "materials.csv";
pub const CONCEPTS_FILE: &str = "concepts.csv";
pub const LINKS_FILE: &str = "links.csv";
pub const DEDUP_FILE: &str = "concepts.json";

pub trait RecordSink: Send {
    fn write_material(&mut self, row: &MaterialRow) -> Result<(), OerGraphError>;
    fn write_concept(&mut self, row: &ConceptRow) -> Result<(), OerGraphError>;
    fn write_link(&mut self, row: &LinkRow) -> Result<(), OerGraphError>;
}

/// The three CSV tables under one data directory.
///
/// A fresh run truncates materials and links, which describe a single run.
/// Concepts accumulate across runs, matching the dedup store: the file is
/// appended to and the header is written only when it is new. A resumed run
/// appends to all three tables and continues material tags after the last
/// row on disk.
pub struct CsvSinks {
    materials: csv::Writer<File>,
    concepts: csv::Writer<File>,
    links: csv::Writer<File>,
    next_material_tag: u64,
}

impl CsvSinks {
    /// Open for a fresh run.
    pub fn open(data_dir: &Path) -> Result<Self, OerGraphError> {
        fs::create_dir_all(data_dir)?;

        let materials = truncated(&data_dir.join(MATERIALS_FILE), &MATERIAL_COLUMNS)?;
        let links = truncated(&data_dir.join(LINKS_FILE), &LINK_COLUMNS)?;
        let concepts = appended(&data_dir.join(CONCEPTS_FILE), &CONCEPT_COLUMNS)?;

        info!(data_dir = %data_dir.display(), "Output tables opened");
        Ok(Self {
            materials,
            concepts,
            links,
            next_material_tag: 0,
        })
    }

    /// Open for a run that picks up where an earlier one stopped. Rows
    /// already flushed are kept.
    pub fn resume(data_dir: &Path) -> Result<Self, OerGraphError> {
        fs::create_dir_all(data_dir)?;

        let materials_path = data_dir.join(MATERIALS_FILE);
        let next_material_tag = next_tag_in(&materials_path)?;

        let materials = appended(&materials_path, &MATERIAL_COLUMNS)?;
        let links = appended(&data_dir.join(LINKS_FILE), &LINK_COLUMNS)?;
        let concepts = appended(&data_dir.join(CONCEPTS_FILE), &CONCEPT_COLUMNS)?;

        info!(
            data_dir = %data_dir.display(),
            next_material_tag,
            "Output tables reopened for resume"
        );
        Ok(Self {
            materials,
            concepts,
            links,
            next_material_tag,
        })
    }

    /// First material tag not used by a row on disk.
    pub fn next_material_tag(&self) -> u64 {
        self.next_material_tag
    }
}

impl RecordSink for CsvSinks {
    fn write_material(&mut self, row: &MaterialRow) -> Result<(), OerGraphError> {
        write_row(&mut self.materials, row)
    }

    fn write_concept(&mut self, row: &ConceptRow) -> Result<(), OerGraphError> {
        write_row(&mut self.concepts, row)
    }

    fn write_link(&mut self, row: &LinkRow) -> Result<(), OerGraphError> {
        write_row(&mut self.links, row)
    }
}

fn writer_for(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new().has_headers(false).from_writer(file)
}

fn truncated(path: &Path, columns: &[&str]) -> Result<csv::Writer<File>, OerGraphError> {
    let mut writer = writer_for(File::create(path)?);
    writer.write_record(columns)?;
    writer.flush()?;
    Ok(writer)
}

fn appended(path: &Path, columns: &[&str]) -> Result<csv::Writer<File>, OerGraphError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;
    let mut writer = writer_for(file);
    if is_new {
        writer.write_record(columns)?;
        writer.flush()?;
    }
    Ok(writer)
}

/// One past the highest `tag` in the table at `path`; zero if the table is
/// absent or has no rows.
fn next_tag_in(path: &Path) -> Result<u64, OerGraphError> {
    #[derive(serde::Deserialize)]
    struct Tagged {
        tag: u64,
    }

    if !path.exists() {
        return Ok(0);
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut next = 0;
    for row in reader.deserialize::<Tagged>() {
        next = next.max(row?.tag + 1);
    }
    Ok(next)
}

fn write_row<T: serde::Serialize>(
    writer: &mut csv::Writer<File>,
    row: &T,
) -> Result<(), OerGraphError> {
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
