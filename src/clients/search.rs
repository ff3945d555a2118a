use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::config::SearchConfig;
use crate::error::UpstreamError;
use crate::model::SearchHit;

const API_VERSION: &str = "2023-11-01";

pub const RESULT_PAGE_CAP: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexingStatus {
    pub key: String,
    pub status: bool,
    #[serde(default)]
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

pub struct SearchStoreClient {
    client: Client,
    endpoint: String,
    api_key: String,
    index_name: String,
    embedding_dim: usize,
}

impl SearchStoreClient {
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build search HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            embedding_dim: config.embedding_dim,
        })
    }

    pub fn ensure_index(&self) -> Result<(), UpstreamError> {
        let url = format!(
            "{}/indexes/{}?api-version={API_VERSION}",
            self.endpoint, self.index_name
        );

        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .map_err(|err| UpstreamError::search("ensure_index", err))?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::search("ensure_index", format!("{status}: {body}")));
        }

        info!(index = %self.index_name, "creating search index");
        let definition = index_definition(&self.index_name, self.embedding_dim);
        let response = self
            .client
            .put(&url)
            .header("api-key", &self.api_key)
            .json(&definition)
            .send()
            .map_err(|err| UpstreamError::search("create_index", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::search("create_index", format!("{status}: {body}")));
        }

        Ok(())
    }

    pub fn apply_actions(&self, actions: Vec<Value>) -> Result<Vec<IndexingStatus>, UpstreamError> {
        if actions.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/indexes/{}/docs/index?api-version={API_VERSION}",
            self.endpoint, self.index_name
        );
        let body = json!({ "value": actions });

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|err| UpstreamError::search("apply_actions", err))?;

        if !response.status().is_success() && response.status() != StatusCode::MULTI_STATUS {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::search("apply_actions", format!("{status}: {body}")));
        }

        let parsed: ActionResponse = response
            .json()
            .map_err(|err| UpstreamError::search("apply_actions", err))?;
        Ok(parsed.value)
    }

    pub fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<SearchHit>, UpstreamError> {
        let mut body = json!({
            "search": query_text,
            "top": top_k,
            "vectorQueries": [{
                "kind": "vector",
                "vector": query_vector,
                "fields": "embedding",
                "k": top_k,
            }],
        });
        if let Some(filter) = filter {
            body["filter"] = Value::String(filter.to_string());
        }

        let value = self.search_request(&body, "hybrid_search")?;
        Ok(parse_search_hits(&value))
    }

    pub fn ids_matching(&self, filter: Option<&str>) -> Result<Vec<String>, UpstreamError> {
        let mut body = json!({
            "search": "*",
            "select": "id",
            "top": RESULT_PAGE_CAP,
        });
        if let Some(filter) = filter {
            body["filter"] = Value::String(filter.to_string());
        }

        let value = self.search_request(&body, "ids_matching")?;
        Ok(parse_ids(&value))
    }

    pub fn count_matching(&self, filter: &str) -> Result<usize, UpstreamError> {
        let body = json!({
            "search": "*",
            "filter": filter,
            "count": true,
            "top": 0,
        });

        let value = self.search_request(&body, "count_matching")?;
        Ok(value["@odata.count"].as_u64().unwrap_or(0) as usize)
    }

    fn search_request(&self, body: &Value, operation: &str) -> Result<Value, UpstreamError> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={API_VERSION}",
            self.endpoint, self.index_name
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .map_err(|err| UpstreamError::search(operation, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::search(operation, format!("{status}: {body}")));
        }

        response
            .json()
            .map_err(|err| UpstreamError::search(operation, err))
    }
}

pub fn doc_id_filter(doc_id: &str) -> String {
    format!("doc_id eq '{}'", doc_id.replace('\'', "''"))
}

pub fn parse_search_hits(value: &Value) -> Vec<SearchHit> {
    let Some(entries) = value["value"].as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            Some(SearchHit {
                id: entry["id"].as_str()?.to_string(),
                content: entry["content"].as_str().unwrap_or_default().to_string(),
                page_number: entry["page_number"].as_u64().map(|page| page as u32),
                filename: entry["filename"].as_str().unwrap_or_default().to_string(),
                score: entry["@search.score"].as_f64().unwrap_or(0.0),
            })
        })
        .collect()
}

fn parse_ids(value: &Value) -> Vec<String> {
    let Some(entries) = value["value"].as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| entry["id"].as_str().map(ToOwned::to_owned))
        .collect()
}

fn index_definition(name: &str, embedding_dim: usize) -> Value {
    let simple_string = |field: &str| {
        json!({ "name": field, "type": "Edm.String", "filterable": true })
    };
    let simple_double = |field: &str| {
        json!({ "name": field, "type": "Edm.Double", "filterable": true })
    };

    json!({
        "name": name,
        "fields": [
            { "name": "id", "type": "Edm.String", "key": true },
            { "name": "content", "type": "Edm.String", "searchable": true },
            simple_string("filename"),
            simple_string("doc_id"),
            { "name": "page_number", "type": "Edm.Int32", "filterable": true },
            { "name": "section_title", "type": "Edm.String", "searchable": true },
            {
                "name": "tags",
                "type": "Collection(Edm.String)",
                "filterable": true,
                "facetable": true,
            },
            simple_string("contract_id"),
            simple_string("tenant_name"),
            simple_string("owner_name"),
            simple_string("property_location"),
            simple_double("gla"),
            simple_double("lease_amount"),
            simple_double("rent_per_sqft"),
            simple_string("start_date"),
            simple_string("end_date"),
            {
                "name": "embedding",
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "dimensions": embedding_dim,
                "vectorSearchProfile": "chunk-vector-profile",
            },
        ],
        "vectorSearch": {
            "algorithms": [{ "name": "chunk-hnsw", "kind": "hnsw" }],
            "profiles": [{ "name": "chunk-vector-profile", "algorithm": "chunk-hnsw" }],
        },
    })
}

#[derive(Deserialize)]
struct ActionResponse {
    value: Vec<IndexingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_filter_escapes_embedded_quotes() {
        assert_eq!(doc_id_filter("abc"), "doc_id eq 'abc'");
        assert_eq!(doc_id_filter("o'brien"), "doc_id eq 'o''brien'");
    }

    #[test]
    fn parse_search_hits_reads_native_score_and_fields() {
        let body = json!({
            "value": [
                {
                    "id": "doc-1-p2-c0",
                    "content": "PAGE 2\nRent is due monthly.",
                    "page_number": 2,
                    "filename": "lease.pdf",
                    "@search.score": 12.25,
                },
                {
                    "id": "doc-1-p3-c0",
                    "content": "PAGE 3",
                    "page_number": null,
                    "filename": "lease.pdf",
                    "@search.score": 3.5,
                },
            ],
        });

        let hits = parse_search_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc-1-p2-c0");
        assert_eq!(hits[0].page_number, Some(2));
        assert_eq!(hits[0].score, 12.25);
        assert_eq!(hits[1].page_number, None);
    }

    #[test]
    fn parse_search_hits_on_malformed_body_is_empty() {
        assert!(parse_search_hits(&json!({ "odd": true })).is_empty());
    }

    #[test]
    fn index_definition_carries_vector_profile_and_domain_fields() {
        let definition = index_definition("lease-chunks", 1536);
        let fields = definition["fields"].as_array().expect("fields array");

        let embedding = fields
            .iter()
            .find(|field| field["name"] == "embedding")
            .expect("embedding field");
        assert_eq!(embedding["dimensions"], 1536);
        assert_eq!(embedding["vectorSearchProfile"], "chunk-vector-profile");

        for name in ["tenant_name", "lease_amount", "contract_id", "tags"] {
            assert!(fields.iter().any(|field| field["name"] == name), "{name} missing");
        }
    }
}
