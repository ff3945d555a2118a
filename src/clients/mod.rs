pub mod analysis;
pub mod openai;
pub mod search;
pub mod storage;

pub use analysis::AnalysisClient;
pub use openai::{ChatProvider, OpenAiClient, TextEmbedder};
pub use search::SearchStoreClient;
pub use storage::BlobStoreClient;

use anyhow::Result;

use crate::config::AppConfig;

pub struct Services {
    pub analysis: AnalysisClient,
    pub storage: BlobStoreClient,
    pub search: SearchStoreClient,
    pub openai: OpenAiClient,
}

impl Services {
    pub fn connect(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            analysis: AnalysisClient::new(&config.analysis, config.http_timeout)?,
            storage: BlobStoreClient::new(&config.storage, config.http_timeout)?,
            search: SearchStoreClient::new(&config.search, config.http_timeout)?,
            openai: OpenAiClient::new(&config.openai, config.http_timeout)?,
        })
    }
}
