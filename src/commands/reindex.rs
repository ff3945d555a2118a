use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReindexArgs;
use crate::clients::Services;
use crate::commands::{analyze_and_chunk, ensure_document_metadata, find_blob};
use crate::config::AppConfig;
use crate::indexer::IndexWriter;
use crate::util::read_chunk_checkpoint;

pub fn run(args: ReindexArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let entry = find_blob(&services, &args.blob)?;
    let (doc_id, original_name) = ensure_document_metadata(&services, &entry)?;

    let chunks = match &args.from_checkpoint {
        Some(path) => {
            let chunks = read_chunk_checkpoint(path)?;
            anyhow::ensure!(
                chunks.iter().all(|chunk| chunk.doc_id == doc_id),
                "checkpoint {} does not match doc id {doc_id}",
                path.display()
            );
            chunks
        }
        None => analyze_and_chunk(&services, &entry.name, &doc_id, &original_name, args.max_chars)?,
    };
    info!(blob = %entry.name, doc_id = %doc_id, chunks = chunks.len(), "rebuilt chunks");

    let writer = IndexWriter::new(&services.search, &services.openai);
    writer.ensure_index()?;

    let removed = writer
        .delete_for_document(&doc_id)
        .with_context(|| format!("failed to clear old chunks for {doc_id}"))?;
    info!(removed, "old chunks deleted");

    let report = writer.upsert(&chunks)?;
    println!(
        "Reindexed {} as {} chunks (doc_id {doc_id}, {} replaced)",
        entry.name, report.succeeded, removed
    );

    Ok(())
}
