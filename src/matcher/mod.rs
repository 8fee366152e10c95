//! Fuzzy name matching
//!
//! Maps raw OCR output to the closest canonical name from a reference list.
//! Scores are a normalized edit-distance ratio on a 0-100 scale; a match is
//! only returned at or above the threshold, with ties broken by first
//! occurrence in the list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use strsim::normalized_levenshtein;
use thiserror::Error;
use tracing::debug;

/// Default minimum similarity (0-100) for accepting a match.
pub const DEFAULT_THRESHOLD: f32 = 70.0;

/// Similarity between two strings on a 0-100 scale.
pub fn similarity(a: &str, b: &str) -> f32 {
    (normalized_levenshtein(a, b) * 100.0) as f32
}

/// Best canonical match for `input` from `reference`, or `None` if the best
/// score falls below `threshold`. Empty input or an empty reference list
/// returns `None` immediately.
pub fn best_match<'a>(input: &str, reference: &'a [String], threshold: f32) -> Option<&'a str> {
    if input.is_empty() || reference.is_empty() {
        return None;
    }

    let mut best: Option<(&str, f32)> = None;
    for candidate in reference {
        let score = similarity(input, candidate);
        // Strict comparison keeps the first occurrence on ties.
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    let (name, score) = best?;
    debug!(input, name, score, "fuzzy match candidate");
    (score >= threshold).then_some(name)
}

/// Failure to resolve a reference list for a matching domain.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("unknown reference domain: {0}")]
    UnknownDomain(String),
    #[error("missing reference list: {0}")]
    MissingList(PathBuf),
    #[error("failed to read reference list {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supported matching domains and their list files.
const DOMAIN_FILES: &[(&str, &str)] = &[
    ("Pokemon Name", "pokemon_name.txt"),
    ("YuGiOh", "yugioh.txt"),
    ("MTG", "mtg.txt"),
];

/// Canonical name lists, one newline-delimited file per matching domain,
/// loaded fully into memory on demand.
#[derive(Debug)]
pub struct ReferenceLibrary {
    root: PathBuf,
    lists: HashMap<String, Vec<String>>,
}

impl ReferenceLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lists: HashMap::new(),
        }
    }

    /// Domain keys this library recognizes.
    pub fn domains() -> impl Iterator<Item = &'static str> {
        DOMAIN_FILES.iter().map(|(domain, _)| *domain)
    }

    /// Load (and cache) the list for a domain. Blank lines are skipped and
    /// entries trimmed; list order is preserved for stable tie-breaking.
    pub fn load(&mut self, domain: &str) -> Result<&[String], ReferenceError> {
        if !self.lists.contains_key(domain) {
            let filename = DOMAIN_FILES
                .iter()
                .find(|(d, _)| *d == domain)
                .map(|(_, f)| *f)
                .ok_or_else(|| ReferenceError::UnknownDomain(domain.to_string()))?;

            let path = self.root.join(filename);
            if !path.exists() {
                return Err(ReferenceError::MissingList(path));
            }

            let entries = read_list(&path)?;
            debug!(domain, count = entries.len(), "reference list loaded");
            self.lists.insert(domain.to_string(), entries);
        }
        Ok(&self.lists[domain])
    }
}

fn read_list(path: &Path) -> Result<Vec<String>, ReferenceError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReferenceError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
