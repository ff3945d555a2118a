use anyhow::{Context, Result};
use chrono::DateTime;
use tracing::info;

use crate::clients::Services;
use crate::commands::{DOC_ID_META, ORIGINAL_NAME_META};
use crate::config::AppConfig;
use crate::model::DocumentStatus;

pub fn run() -> Result<()> {
    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let entries = services.storage.list().context("failed to list container")?;
    info!(blobs = entries.len(), "container listed");

    let mut statuses = Vec::with_capacity(entries.len());
    for entry in entries {
        let doc_id = entry.metadata.get(DOC_ID_META).cloned();
        let indexed_chunks = match &doc_id {
            Some(doc_id) => services.search.count_matching(
                &crate::clients::search::doc_id_filter(doc_id),
            )?,
            None => 0,
        };

        statuses.push(DocumentStatus {
            filename: entry
                .metadata
                .get(ORIGINAL_NAME_META)
                .cloned()
                .unwrap_or_else(|| entry.name.clone()),
            blob_name: entry.name,
            doc_id,
            last_modified: entry.last_modified,
            size: entry.size,
            indexed_chunks,
            status: if indexed_chunks > 0 { "Indexed" } else { "Uploaded" }.to_string(),
        });
    }

    statuses.sort_by_key(|status| {
        std::cmp::Reverse(
            status
                .last_modified
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
                .map(|parsed| parsed.timestamp())
                .unwrap_or(0),
        )
    });

    if statuses.is_empty() {
        println!("No documents uploaded.");
        return Ok(());
    }

    for status in &statuses {
        println!(
            "{:<40} {:>9} chunks  {:<9} {}  {}",
            status.filename,
            status.indexed_chunks,
            status.status,
            status.last_modified.as_deref().unwrap_or("-"),
            status.doc_id.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
