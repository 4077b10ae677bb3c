//! Discovery of the input files of a pipeline stage

use crate::Result;
use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// List the files of `dir` that have a certain extension
///
/// Subdirectories are not explored. Paths are sorted so that stages process
/// documents in a reproducible order.
pub fn list_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let context = || format!("listing input files in {}", dir.display());
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir).with_context(context)? {
        let path = entry.with_context(context)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            inputs.push(path);
        }
    }
    inputs.sort_unstable();
    log::debug!("Found {} .{extension} files in {}", inputs.len(), dir.display());
    Ok(inputs)
}

/// Document identifier of an input file, i.e. its name without extension
pub fn document_id(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))
}

/// Create an output directory if it doesn't exist yet
pub fn create_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))
}
