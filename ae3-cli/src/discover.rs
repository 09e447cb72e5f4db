//! Batch input discovery
//!
//! Each command-line input is either an `.ae3` file or a directory whose
//! `.ae3` entries are processed in sorted order. Anything else is skipped
//! with a warning rather than aborting the batch.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// True if `path` has the `.ae3` extension (case-insensitive)
fn is_ae3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ae3"))
        .unwrap_or(false)
}

/// Collect all `.ae3` files named by the given inputs
pub fn collect_ae3_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {:?}", input))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_ae3(p))
                .collect();
            found.sort();
            if found.is_empty() {
                log::warn!("No .ae3 files in directory {:?}", input);
            }
            files.extend(found);
        } else if input.is_file() && is_ae3(input) {
            files.push(input.clone());
        } else {
            log::warn!("Skipping {:?} (not an .ae3 file or directory)", input);
        }
    }

    Ok(files)
}
