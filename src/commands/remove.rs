use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RemoveArgs;
use crate::clients::Services;
use crate::commands::{DOC_ID_META, find_blob};
use crate::config::AppConfig;
use crate::indexer::IndexWriter;

pub fn run(args: RemoveArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let entry = find_blob(&services, &args.blob)?;

    let removed = match entry.metadata.get(DOC_ID_META) {
        Some(doc_id) => {
            let writer = IndexWriter::new(&services.search, &services.openai);
            let removed = writer
                .delete_for_document(doc_id)
                .with_context(|| format!("failed to delete indexed chunks for {doc_id}"))?;
            info!(doc_id = %doc_id, removed, "indexed chunks deleted");
            removed
        }
        None => {
            warn!(blob = %entry.name, "blob carries no doc id, nothing indexed to delete");
            0
        }
    };

    services
        .storage
        .delete(&entry.name)
        .with_context(|| format!("failed to delete blob {}", entry.name))?;

    println!("Removed {} ({} indexed chunks deleted)", entry.name, removed);
    Ok(())
}
