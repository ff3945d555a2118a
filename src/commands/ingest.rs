use std::fs;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::IngestArgs;
use crate::clients::Services;
use crate::commands::{analyze_and_chunk, base_metadata};
use crate::config::AppConfig;
use crate::indexer::IndexWriter;
use crate::util::{ensure_directory, write_chunk_checkpoint};

pub fn run(args: IngestArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let filename = match args.file.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.to_string(),
        None => bail!("{} has no usable file name", args.file.display()),
    };
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let doc_id = Uuid::new_v4().to_string();
    info!(file = %filename, doc_id = %doc_id, size = bytes.len(), "uploading contract");
    services
        .storage
        .upload(&filename, bytes, &base_metadata(&doc_id, &filename))
        .with_context(|| format!("upload failed for {filename}"))?;

    let chunks = analyze_and_chunk(&services, &filename, &doc_id, &filename, args.max_chars)?;
    info!(chunks = chunks.len(), "layout analysis complete");

    ensure_directory(&args.processed_dir)?;
    let checkpoint = args.processed_dir.join(format!("{doc_id}.jsonl"));
    write_chunk_checkpoint(&checkpoint, &chunks)?;
    info!(path = %checkpoint.display(), "chunk checkpoint written");

    let writer = IndexWriter::new(&services.search, &services.openai);
    writer.ensure_index()?;
    let report = writer.upsert(&chunks)?;

    if report.failed_ids.is_empty() {
        println!("Indexed {} chunks from {filename} (doc_id {doc_id})", report.succeeded);
    } else {
        warn!(failed = report.failed_ids.len(), "some chunks were not indexed");
        println!(
            "Indexed {} chunks from {filename} (doc_id {doc_id}); {} failed: {}",
            report.succeeded,
            report.failed_ids.len(),
            report.failed_ids.join(", ")
        );
    }

    Ok(())
}
