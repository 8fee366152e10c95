//! Filename derivation
//!
//! Turns recognized card text into a filesystem-safe base name and resolves
//! collisions against the destination directory. Collision checks inspect
//! live directory state, so the caller must be the directory's only writer.

use std::path::{Path, PathBuf};

/// Sanitize recognized text into a candidate base filename.
///
/// Strips surrounding whitespace, drops every character that is not
/// alphanumeric, underscore, hyphen, or whitespace, then collapses whitespace
/// runs to single underscores. May return an empty string.
pub fn sanitize_name(raw: &str) -> String {
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Deterministic fallback name for images whose primary text sanitizes to
/// nothing. `position` is 1-based batch order.
pub fn fallback_name(position: usize) -> String {
    format!("SCAN_{position}")
}

/// First unused destination path for `base` + `ext` in `dir`, appending
/// `_1`, `_2`, ... until the name is free. `ext` includes the leading dot or
/// is empty.
pub fn resolve_collision(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{base}{ext}"));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{suffix}{ext}"));
        suffix += 1;
    }
    candidate
}
