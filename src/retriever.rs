use tracing::info;

use crate::clients::{SearchStoreClient, TextEmbedder};
use crate::error::UpstreamError;
use crate::model::SearchHit;

pub struct HybridRetriever<'a> {
    search: &'a SearchStoreClient,
    embedder: &'a dyn TextEmbedder,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(search: &'a SearchStoreClient, embedder: &'a dyn TextEmbedder) -> Self {
        Self { search, embedder }
    }

    pub fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<SearchHit>, UpstreamError> {
        let query_vector = self.embedder.embed(question)?;
        let hits = self.search.hybrid_search(question, &query_vector, top_k, filter)?;
        info!(hits = hits.len(), top_k, "retrieval finished");
        Ok(hits)
    }
}
