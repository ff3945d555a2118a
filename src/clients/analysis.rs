use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::UpstreamError;
use crate::model::{
    AnalyzedPage, AnalyzedParagraph, AnalyzedTable, KeyValueField, StructuralResult, TableCell,
};

const ANALYSIS_API_VERSION: &str = "2024-02-29-preview";
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: usize = 150;

pub struct AnalysisClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model_id: String,
}

impl AnalysisClient {
    pub fn new(config: &AnalysisConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build analysis HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
        })
    }

    pub fn analyze_url(&self, document_url: &str) -> Result<StructuralResult, UpstreamError> {
        let submit_url = format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={ANALYSIS_API_VERSION}",
            self.endpoint, self.model_id
        );

        let response = self
            .client
            .post(&submit_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&json!({ "urlSource": document_url }))
            .send()
            .map_err(|err| UpstreamError::analysis("submit", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::analysis("submit", format!("{status}: {body}")));
        }

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .ok_or_else(|| UpstreamError::analysis("submit", "missing operation-location header"))?;

        let raw = self.poll_operation(&operation_url)?;
        Ok(structural_result_from_value(&raw["analyzeResult"]))
    }

    fn poll_operation(&self, operation_url: &str) -> Result<Value, UpstreamError> {
        for attempt in 0..MAX_POLLS {
            let response = self
                .client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .map_err(|err| UpstreamError::analysis("poll", err))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().unwrap_or_default();
                return Err(UpstreamError::analysis("poll", format!("{status}: {body}")));
            }

            let value: Value = response
                .json()
                .map_err(|err| UpstreamError::analysis("poll", err))?;
            match value["status"].as_str().unwrap_or_default() {
                "succeeded" => return Ok(value),
                "failed" => {
                    return Err(UpstreamError::analysis("poll", value["error"].to_string()));
                }
                status => {
                    debug!(attempt, status, "analysis operation still running");
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }

        Err(UpstreamError::analysis("poll", "operation did not complete in time"))
    }
}

pub fn structural_result_from_value(value: &Value) -> StructuralResult {
    StructuralResult {
        pages: parse_pages(value),
        paragraphs: parse_paragraphs(value),
        tables: parse_tables(value),
        key_values: parse_key_values(value),
    }
}

fn parse_pages(value: &Value) -> Vec<AnalyzedPage> {
    let Some(pages) = value["pages"].as_array() else {
        return Vec::new();
    };

    pages
        .iter()
        .filter_map(|page| {
            let page_number = page["pageNumber"].as_u64()? as u32;
            let lines = page["lines"]
                .as_array()
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|line| line["content"].as_str().map(ToOwned::to_owned))
                        .collect()
                })
                .unwrap_or_default();

            Some(AnalyzedPage { page_number, lines })
        })
        .collect()
}

fn parse_paragraphs(value: &Value) -> Vec<AnalyzedParagraph> {
    let Some(paragraphs) = value["paragraphs"].as_array() else {
        return Vec::new();
    };

    paragraphs
        .iter()
        .filter_map(|paragraph| {
            let text = paragraph["content"].as_str()?.to_string();
            Some(AnalyzedParagraph {
                role: paragraph["role"].as_str().unwrap_or("body").to_string(),
                text,
                page: first_region_page(&paragraph["boundingRegions"]),
            })
        })
        .collect()
}

fn parse_tables(value: &Value) -> Vec<AnalyzedTable> {
    let Some(tables) = value["tables"].as_array() else {
        return Vec::new();
    };

    tables
        .iter()
        .map(|table| {
            let cells = table["cells"]
                .as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .filter_map(|cell| {
                            Some(TableCell {
                                row: cell["rowIndex"].as_u64()? as u32,
                                column: cell["columnIndex"].as_u64()? as u32,
                                text: cell["content"].as_str().unwrap_or_default().to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            AnalyzedTable {
                cells,
                page: first_region_page(&table["boundingRegions"]),
            }
        })
        .collect()
}

fn parse_key_values(value: &Value) -> Vec<KeyValueField> {
    let Some(pairs) = value["keyValuePairs"].as_array() else {
        return Vec::new();
    };

    pairs
        .iter()
        .filter_map(|pair| {
            let key = pair["key"]["content"].as_str()?.to_string();
            Some(KeyValueField {
                key,
                value: pair["value"]["content"].as_str().map(ToOwned::to_owned),
                page: first_region_page(&pair["key"]["boundingRegions"]),
            })
        })
        .collect()
}

fn first_region_page(regions: &Value) -> Option<u32> {
    regions
        .as_array()
        .and_then(|regions| regions.first())
        .and_then(|region| region["pageNumber"].as_u64())
        .map(|page| page as u32)
}
