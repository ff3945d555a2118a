use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::UpstreamError;
use crate::model::ChatTurn;

pub trait TextEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError>;
}

pub trait ChatProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError>;
}

pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    embed_deployment: String,
    chat_deployment: String,
    api_version: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build OpenAI HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            embed_deployment: config.embed_deployment.clone(),
            chat_deployment: config.chat_deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }
}

impl TextEmbedder for OpenAiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        let url = self.deployment_url(&self.embed_deployment, "embeddings");
        let request = EmbeddingRequest { input: text };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(UpstreamError::embedding)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::embedding(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response.json().map_err(UpstreamError::embedding)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| UpstreamError::embedding("empty embedding response"))
    }
}

impl ChatProvider for OpenAiClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let url = self.deployment_url(&self.chat_deployment, "chat/completions");
        let request = ChatRequest {
            messages: vec![
                ChatTurn { role: "system".to_string(), content: system.to_string() },
                ChatTurn { role: "user".to_string(), content: user.to_string() },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(UpstreamError::chat)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::chat(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response.json().map_err(UpstreamError::chat)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::chat("completion returned no choices"))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatTurn>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}
