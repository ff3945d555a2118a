pub mod ask;
pub mod ingest;
pub mod reindex;
pub mod remove;
pub mod reset;
pub mod status;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use crate::clients::Services;
use crate::clients::storage::BlobEntry;
use crate::model::Chunk;

const READ_URL_EXPIRY: Duration = Duration::from_secs(3600);

pub const DOC_ID_META: &str = "doc_id";
pub const ORIGINAL_NAME_META: &str = "original_name";

fn find_blob(services: &Services, name: &str) -> Result<BlobEntry> {
    let entries = services.storage.list().context("failed to list container")?;
    match entries.into_iter().find(|entry| entry.name == name) {
        Some(entry) => Ok(entry),
        None => bail!("blob {name} not found in container"),
    }
}

fn ensure_document_metadata(services: &Services, entry: &BlobEntry) -> Result<(String, String)> {
    let existing_id = entry.metadata.get(DOC_ID_META).cloned();
    let existing_name = entry.metadata.get(ORIGINAL_NAME_META).cloned();

    if let (Some(doc_id), Some(original_name)) = (existing_id.clone(), existing_name.clone()) {
        return Ok((doc_id, original_name));
    }

    let doc_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let original_name = existing_name.unwrap_or_else(|| entry.name.clone());

    let mut metadata = entry.metadata.clone();
    metadata.insert(DOC_ID_META.to_string(), doc_id.clone());
    metadata.insert(ORIGINAL_NAME_META.to_string(), original_name.clone());
    services
        .storage
        .set_metadata(&entry.name, &metadata)
        .with_context(|| format!("failed to set metadata on {}", entry.name))?;

    Ok((doc_id, original_name))
}

fn analyze_and_chunk(
    services: &Services,
    blob_name: &str,
    doc_id: &str,
    original_name: &str,
    max_chars: usize,
) -> Result<Vec<Chunk>> {
    let read_url = services
        .storage
        .issue_read_url(blob_name, READ_URL_EXPIRY)
        .with_context(|| format!("failed to issue read URL for {blob_name}"))?;
    let structural = services
        .analysis
        .analyze_url(&read_url)
        .with_context(|| format!("layout analysis failed for {blob_name}"))?;

    Ok(crate::chunker::build(&structural, doc_id, original_name, max_chars))
}

fn base_metadata(doc_id: &str, original_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (DOC_ID_META.to_string(), doc_id.to_string()),
        (ORIGINAL_NAME_META.to_string(), original_name.to_string()),
        ("uploaded_at".to_string(), crate::util::now_utc_string()),
    ])
}
