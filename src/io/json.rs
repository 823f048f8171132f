//! Neighborhood JSON files.
//!
//! A fetched [`Neighborhood3D`] is saved in the same shape the host receives,
//! so it can be replayed offline.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::massing::building::Neighborhood3D;

/// Writes a neighborhood to a JSON file.
pub fn write_neighborhood(path: &Path, neighborhood: &Neighborhood3D) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, neighborhood)
        .with_context(|| format!("Failed to serialize neighborhood to: {}", path.display()))?;

    Ok(())
}

/// Reads a neighborhood from a JSON file.
///
/// Footprints are validated on load, a degenerate ring fails the whole file.
pub fn read_neighborhood(path: &Path) -> Result<Neighborhood3D> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let neighborhood: Neighborhood3D = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize neighborhood from: {}", path.display()))?;

    Ok(neighborhood)
}

/// Writes any serializable value (analysis results, reports) as pretty JSON.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to serialize to: {}", path.display()))?;
    Ok(())
}
