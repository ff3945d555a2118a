use serde_json::{Value, json};
use tracing::{info, warn};

use crate::clients::{SearchStoreClient, TextEmbedder};
use crate::clients::search::{IndexingStatus, doc_id_filter};
use crate::error::UpstreamError;
use crate::model::{Chunk, UpsertReport};

pub struct IndexWriter<'a> {
    search: &'a SearchStoreClient,
    embedder: &'a dyn TextEmbedder,
}

impl<'a> IndexWriter<'a> {
    pub fn new(search: &'a SearchStoreClient, embedder: &'a dyn TextEmbedder) -> Self {
        Self { search, embedder }
    }

    pub fn ensure_index(&self) -> Result<(), UpstreamError> {
        self.search.ensure_index()
    }

    pub fn upsert(&self, chunks: &[Chunk]) -> Result<UpsertReport, UpstreamError> {
        let (actions, mut failed_ids) = embed_chunks(self.embedder, chunks);
        for id in &failed_ids {
            warn!(chunk_id = %id, "embedding failed, chunk skipped");
        }

        let submitted = actions.len();
        let statuses = self.search.apply_actions(actions)?;
        let mut rejected = 0usize;
        for status in statuses {
            if !status.status {
                rejected += 1;
                warn!(
                    chunk_id = %status.key,
                    error = %status.error_message.as_deref().unwrap_or("unknown"),
                    "index store rejected chunk"
                );
                failed_ids.push(status.key);
            }
        }

        let report = UpsertReport {
            succeeded: submitted - rejected,
            failed_ids,
        };
        info!(
            succeeded = report.succeeded,
            failed = report.failed_ids.len(),
            "chunk upsert finished"
        );
        Ok(report)
    }

    pub fn delete_for_document(&self, doc_id: &str) -> Result<usize, UpstreamError> {
        let filter = doc_id_filter(doc_id);
        self.delete_matching(Some(&filter))
    }

    pub fn delete_all(&self) -> Result<usize, UpstreamError> {
        self.delete_matching(None)
    }

    pub fn count_for_document(&self, doc_id: &str) -> Result<usize, UpstreamError> {
        self.search.count_matching(&doc_id_filter(doc_id))
    }

    fn delete_matching(&self, filter: Option<&str>) -> Result<usize, UpstreamError> {
        let mut deleted = 0usize;
        loop {
            let ids = self.search.ids_matching(filter)?;
            if ids.is_empty() {
                return Ok(deleted);
            }

            let requested = ids.len();
            let actions = ids
                .into_iter()
                .map(|id| json!({ "@search.action": "delete", "id": id }))
                .collect();
            let statuses = self.search.apply_actions(actions)?;
            deleted += confirm_delete_progress(requested, &statuses)?;
        }
    }
}

fn confirm_delete_progress(
    requested: usize,
    statuses: &[IndexingStatus],
) -> Result<usize, UpstreamError> {
    let failed = statuses.iter().filter(|status| !status.status).count();
    if failed >= requested {
        return Err(UpstreamError::search(
            "delete",
            format!("store rejected all {requested} deletes in a page"),
        ));
    }
    Ok(requested - failed)
}

pub fn embed_chunks(
    embedder: &dyn TextEmbedder,
    chunks: &[Chunk],
) -> (Vec<Value>, Vec<String>) {
    let mut actions = Vec::with_capacity(chunks.len());
    let mut failed_ids = Vec::new();

    for chunk in chunks {
        match embedder.embed(&chunk.content) {
            Ok(embedding) => actions.push(json!({
                "@search.action": "mergeOrUpload",
                "id": chunk.id,
                "doc_id": chunk.doc_id,
                "filename": chunk.source_file,
                "content": chunk.content,
                "page_number": chunk.page_number,
                "section_title": chunk.section_title,
                "embedding": embedding,
            })),
            Err(_) => failed_ids.push(chunk.id.clone()),
        }
    }

    (actions, failed_ids)
}
