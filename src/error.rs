use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("document analysis failed during {operation}: {detail}")]
    Analysis { operation: String, detail: String },

    #[error("blob storage failed during {operation}: {detail}")]
    Storage { operation: String, detail: String },

    #[error("search store failed during {operation}: {detail}")]
    Search { operation: String, detail: String },

    #[error("embedding service failed: {detail}")]
    Embedding { detail: String },

    #[error("chat completion failed: {detail}")]
    Chat { detail: String },
}

impl UpstreamError {
    pub fn analysis(operation: &str, detail: impl ToString) -> Self {
        Self::Analysis {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn storage(operation: &str, detail: impl ToString) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn search(operation: &str, detail: impl ToString) -> Self {
        Self::Search {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn embedding(detail: impl ToString) -> Self {
        Self::Embedding {
            detail: detail.to_string(),
        }
    }

    pub fn chat(detail: impl ToString) -> Self {
        Self::Chat {
            detail: detail.to_string(),
        }
    }
}
