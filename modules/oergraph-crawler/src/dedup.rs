//! Cross-run concept dedup cache.
//!
//! Every slug that has been accepted is remembered together with the concept
//! tag it was written under. Once a slug is in the cache the knowledge base
//! is never queried for it again, and later links reuse the stored tag.
//!
//! The backing store sits behind [`SeenStore`]; the crawler only talks to
//! [`DedupCache`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use oergraph_common::OerGraphError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A persisted entry. Stores written before tags were recorded hold bare
/// slug strings; those load as [`StoredEntry::Legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Tagged { slug: String, tag: u64 },
    Legacy(String),
}

impl StoredEntry {
    pub fn slug(&self) -> &str {
        match self {
            StoredEntry::Tagged { slug, .. } => slug,
            StoredEntry::Legacy(slug) => slug,
        }
    }

    pub fn tag(&self) -> Option<u64> {
        match self {
            StoredEntry::Tagged { tag, .. } => Some(*tag),
            StoredEntry::Legacy(_) => None,
        }
    }
}

pub trait SeenStore: Send + Sync {
    /// Read every entry. An absent or empty store yields no entries.
    fn load(&self) -> Result<Vec<StoredEntry>, OerGraphError>;

    /// Replace the stored contents with `entries`. Must be durable when it
    /// returns.
    fn persist(&self, entries: &[StoredEntry]) -> Result<(), OerGraphError>;
}

/// JSON list on disk, rewritten through a temp file and an atomic rename so
/// a crash mid-write leaves the previous version intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeenStore for JsonFileStore {
    fn load(&self) -> Result<Vec<StoredEntry>, OerGraphError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            OerGraphError::Store(format!("{}: {e}", self.path.display()))
        })
    }

    fn persist(&self, entries: &[StoredEntry]) -> Result<(), OerGraphError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, entries)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| OerGraphError::Io(e.error))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// What the cache knows about a slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    /// Accepted under this concept tag.
    Tagged(u64),
    /// Accepted by a store that did not record tags.
    Untagged,
}

pub struct DedupCache {
    entries: HashMap<String, Option<u64>>,
    store: Box<dyn SeenStore>,
}

impl DedupCache {
    /// Load every previously seen slug from `store`.
    pub fn load(store: Box<dyn SeenStore>) -> Result<Self, OerGraphError> {
        let stored = store.load()?;
        let mut entries = HashMap::with_capacity(stored.len());
        for entry in stored {
            let tag = entry.tag();
            // Keep the tagged version if a slug appears twice.
            let slot = entries.entry(entry.slug().to_string()).or_insert(tag);
            if slot.is_none() {
                *slot = tag;
            }
        }
        info!(slugs = entries.len(), "Dedup cache loaded");
        Ok(Self { entries, store })
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub fn lookup(&self, slug: &str) -> Option<Seen> {
        self.entries.get(slug).map(|tag| match tag {
            Some(t) => Seen::Tagged(*t),
            None => Seen::Untagged,
        })
    }

    /// Record `slug` under `tag` and flush the store. Returns `false`
    /// without touching the store if the slug was already present.
    pub fn add(&mut self, slug: &str, tag: u64) -> Result<bool, OerGraphError> {
        if self.entries.contains_key(slug) {
            return Ok(false);
        }
        self.entries.insert(slug.to_string(), Some(tag));
        if let Err(e) = self.persist() {
            self.entries.remove(slug);
            return Err(e);
        }
        debug!(slug, tag, "Slug added to dedup cache");
        Ok(true)
    }

    /// Write the whole cache to the store, ordered by tag.
    pub fn persist(&self) -> Result<(), OerGraphError> {
        let mut entries: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(slug, tag)| match tag {
                Some(tag) => StoredEntry::Tagged {
                    slug: slug.clone(),
                    tag: *tag,
                },
                None => StoredEntry::Legacy(slug.clone()),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.tag()
                .map_or(0, |t| t + 1)
                .cmp(&b.tag().map_or(0, |t| t + 1))
                .then_with(|| a.slug().cmp(b.slug()))
        });
        self.store.persist(&entries)
    }

    /// First concept tag not used by any stored entry.
    pub fn next_free_tag(&self) -> u64 {
        self.entries
            .values()
            .filter_map(|t| *t)
            .max()
            .map_or(0, |max| max + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
