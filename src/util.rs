use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};

use crate::model::Chunk;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn write_chunk_checkpoint(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create checkpoint file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for chunk in chunks {
        let line = serde_json::to_string(chunk)
            .with_context(|| format!("failed to serialize chunk {}", chunk.id))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .with_context(|| format!("failed to write checkpoint: {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush checkpoint: {}", path.display()))?;

    Ok(())
}

pub fn read_chunk_checkpoint(path: &Path) -> Result<Vec<Chunk>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read checkpoint: {}", path.display()))?;

    let mut chunks = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line).with_context(|| {
            format!("malformed checkpoint line {} in {}", index + 1, path.display())
        })?;
        chunks.push(chunk);
    }

    Ok(chunks)
}
