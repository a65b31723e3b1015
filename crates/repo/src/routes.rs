// SPDX-License-Identifier: MIT

//! Large-object routing.
//!
//! The size threshold that decides what gets routed lives here, decoupled
//! from the version-control mechanism: routes are plain lines in the
//! attributes file, `<pattern> filter=<name> -crlf`, and logically form a
//! set even though the file is append-only.

use std::collections::BTreeSet;
use std::fs::{OpenOptions, ReadDir};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lazy one-pass scan for regular files exceeding a size threshold.
///
/// Directory traversal order, not restartable. Unreadable directories are
/// skipped with a warning; symlinks are not followed; a missing root
/// yields nothing.
pub struct LargeFileScan {
    dirs: Vec<PathBuf>,
    entries: Option<ReadDir>,
    ignore: BTreeSet<String>,
    threshold_bytes: u64,
}

impl LargeFileScan {
    pub fn new(
        root: &Path,
        ignore: impl IntoIterator<Item = String>,
        threshold_bytes: u64,
    ) -> Self {
        Self {
            dirs: vec![root.to_path_buf()],
            entries: None,
            ignore: ignore.into_iter().collect(),
            threshold_bytes,
        }
    }
}

impl Iterator for LargeFileScan {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(iter) = &mut self.entries {
                for entry in iter.by_ref().flatten() {
                    let path = entry.path();
                    let Ok(file_type) = entry.file_type() else { continue };
                    if file_type.is_dir() {
                        self.dirs.push(path);
                        continue;
                    }
                    if !file_type.is_file() {
                        continue;
                    }
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        if self.ignore.contains(name) {
                            continue;
                        }
                    }
                    match entry.metadata() {
                        Ok(meta) if meta.len() > self.threshold_bytes => return Some(path),
                        _ => continue,
                    }
                }
                self.entries = None;
            }

            let dir = self.dirs.pop()?;
            match std::fs::read_dir(&dir) {
                Ok(read_dir) => self.entries = Some(read_dir),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                }
            }
        }
    }
}

/// Parse the patterns already routed through the large-object filter.
///
/// A missing attributes file reads as the empty set.
pub fn current_routes(attributes_path: &Path) -> std::io::Result<BTreeSet<String>> {
    let raw = match std::fs::read_to_string(attributes_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };
    let mut routes = BTreeSet::new();
    for line in raw.lines() {
        if let Some(idx) = line.find(" filter=") {
            let pattern = line[..idx].trim();
            if !pattern.is_empty() {
                routes.insert(pattern.to_string());
            }
        }
    }
    Ok(routes)
}

/// Append one routing line per pattern not already present.
///
/// Idempotent: patterns already in the file are skipped, so two identical
/// calls leave the same set behind. Returns the number of lines added.
pub fn append_routes(
    attributes_path: &Path,
    patterns: &BTreeSet<String>,
    filter: &str,
) -> std::io::Result<usize> {
    let existing = current_routes(attributes_path)?;
    let new_patterns: Vec<&String> = patterns.iter().filter(|p| !existing.contains(*p)).collect();
    if new_patterns.is_empty() {
        return Ok(0);
    }

    let mut file = OpenOptions::new().create(true).append(true).open(attributes_path)?;
    for pattern in &new_patterns {
        writeln!(file, "{pattern} filter={filter} -crlf")?;
    }
    Ok(new_patterns.len())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
