use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2500;
pub const DEFAULT_ANALYSIS_MODEL: &str = "prebuilt-layout";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub openai: OpenAiConfig,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub account: String,
    pub account_key: String,
    pub container: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub embedding_dim: usize,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub embed_deployment: String,
    pub chat_deployment: String,
    pub api_version: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let storage_account = required_env("LEASERAG_STORAGE_ACCOUNT")?;
        let storage_endpoint = env::var("LEASERAG_STORAGE_ENDPOINT")
            .unwrap_or_else(|_| format!("https://{storage_account}.blob.core.windows.net"));

        Ok(Self {
            analysis: AnalysisConfig {
                endpoint: required_env("LEASERAG_ANALYSIS_ENDPOINT")?,
                api_key: required_env("LEASERAG_ANALYSIS_KEY")?,
                model_id: env::var("LEASERAG_ANALYSIS_MODEL")
                    .unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string()),
            },
            storage: StorageConfig {
                account: storage_account,
                account_key: required_env("LEASERAG_STORAGE_KEY")?,
                container: env::var("LEASERAG_STORAGE_CONTAINER")
                    .unwrap_or_else(|_| "raw-pdfs".to_string()),
                endpoint: storage_endpoint,
            },
            search: SearchConfig {
                endpoint: required_env("LEASERAG_SEARCH_ENDPOINT")?,
                api_key: required_env("LEASERAG_SEARCH_KEY")?,
                index_name: env::var("LEASERAG_SEARCH_INDEX")
                    .unwrap_or_else(|_| "lease-chunks".to_string()),
                embedding_dim: optional_env_usize("LEASERAG_EMBEDDING_DIM")?
                    .unwrap_or(DEFAULT_EMBEDDING_DIM),
            },
            openai: OpenAiConfig {
                endpoint: required_env("LEASERAG_OPENAI_ENDPOINT")?,
                api_key: required_env("LEASERAG_OPENAI_KEY")?,
                embed_deployment: env::var("LEASERAG_OPENAI_EMBED_DEPLOYMENT")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                chat_deployment: env::var("LEASERAG_OPENAI_CHAT_DEPLOYMENT")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                api_version: env::var("LEASERAG_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| "2024-02-01".to_string()),
            },
            http_timeout: Duration::from_secs(
                optional_env_usize("LEASERAG_HTTP_TIMEOUT_SECS")?.unwrap_or(60) as u64,
            ),
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    let value =
        env::var(name).with_context(|| format!("missing required environment variable {name}"))?;
    anyhow::ensure!(
        !value.trim().is_empty(),
        "environment variable {name} is empty"
    );
    Ok(value.trim().to_string())
}

fn optional_env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(raw) => {
            let parsed = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("environment variable {name} is not a number: {raw}"))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}
