use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use regex::Regex;
use reqwest::blocking::Client;
use sha2::Sha256;

use crate::config::StorageConfig;
use crate::error::UpstreamError;

const STORAGE_API_VERSION: &str = "2021-08-06";

#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub name: String,
    pub size: Option<u64>,
    pub last_modified: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

pub struct BlobStoreClient {
    client: Client,
    endpoint: String,
    account: String,
    container: String,
    key: Vec<u8>,
}

impl BlobStoreClient {
    pub fn new(config: &StorageConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build storage HTTP client")?;
        let key = BASE64
            .decode(config.account_key.trim())
            .context("storage account key is not valid base64")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            account: config.account.clone(),
            container: config.container.clone(),
            key,
        })
    }

    pub fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), UpstreamError> {
        let mut ms_headers = self.base_headers();
        ms_headers.insert("x-ms-blob-type".to_string(), "BlockBlob".to_string());
        for (key, value) in metadata {
            ms_headers.insert(format!("x-ms-meta-{key}"), value.clone());
        }

        let path = format!("{}/{}", self.container, name);
        let url = format!("{}/{}", self.endpoint, path);
        let authorization =
            self.authorization("PUT", bytes.len(), &ms_headers, &path, &[])?;

        let mut request = self.client.put(&url).body(bytes);
        for (key, value) in &ms_headers {
            request = request.header(key, value);
        }

        let response = request
            .header("Authorization", authorization)
            .send()
            .map_err(|err| UpstreamError::storage("upload", err))?;
        check_response(response, "upload")
    }

    pub fn set_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), UpstreamError> {
        let mut ms_headers = self.base_headers();
        for (key, value) in metadata {
            ms_headers.insert(format!("x-ms-meta-{key}"), value.clone());
        }

        let path = format!("{}/{}", self.container, name);
        let query = [("comp".to_string(), "metadata".to_string())];
        let url = format!("{}/{}?comp=metadata", self.endpoint, path);
        let authorization = self.authorization("PUT", 0, &ms_headers, &path, &query)?;

        let mut request = self.client.put(&url);
        for (key, value) in &ms_headers {
            request = request.header(key, value);
        }

        let response = request
            .header("Authorization", authorization)
            .header("Content-Length", "0")
            .send()
            .map_err(|err| UpstreamError::storage("set_metadata", err))?;
        check_response(response, "set_metadata")
    }

    pub fn delete(&self, name: &str) -> Result<(), UpstreamError> {
        let ms_headers = self.base_headers();
        let path = format!("{}/{}", self.container, name);
        let url = format!("{}/{}", self.endpoint, path);
        let authorization = self.authorization("DELETE", 0, &ms_headers, &path, &[])?;

        let mut request = self.client.delete(&url);
        for (key, value) in &ms_headers {
            request = request.header(key, value);
        }

        let response = request
            .header("Authorization", authorization)
            .send()
            .map_err(|err| UpstreamError::storage("delete", err))?;
        check_response(response, "delete")
    }

    pub fn list(&self) -> Result<Vec<BlobEntry>, UpstreamError> {
        let ms_headers = self.base_headers();
        let query = [
            ("comp".to_string(), "list".to_string()),
            ("include".to_string(), "metadata".to_string()),
            ("restype".to_string(), "container".to_string()),
        ];
        let url = format!(
            "{}/{}?restype=container&comp=list&include=metadata",
            self.endpoint, self.container
        );
        let authorization =
            self.authorization("GET", 0, &ms_headers, &self.container, &query)?;

        let mut request = self.client.get(&url);
        for (key, value) in &ms_headers {
            request = request.header(key, value);
        }

        let response = request
            .header("Authorization", authorization)
            .send()
            .map_err(|err| UpstreamError::storage("list", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::storage("list", format!("{status}: {body}")));
        }

        let body = response
            .text()
            .map_err(|err| UpstreamError::storage("list", err))?;
        Ok(parse_blob_listing(&body))
    }

    pub fn issue_read_url(&self, name: &str, expiry: Duration) -> Result<String, UpstreamError> {
        let now = Utc::now();
        self.issue_read_url_at(name, now, now + expiry)
    }

    fn issue_read_url_at(
        &self,
        name: &str,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<String, UpstreamError> {
        let start = format_sas_time(start - chrono::Duration::minutes(5));
        let expiry = format_sas_time(expiry);
        let resource = format!("/blob/{}/{}/{}", self.account, self.container, name);

        let string_to_sign = sas_string_to_sign(&start, &expiry, &resource);
        let signature = self.sign(&string_to_sign)?;

        Ok(format!(
            "{}/{}/{}?sv={STORAGE_API_VERSION}&st={}&se={}&sr=b&sp=r&spr=https&sig={}",
            self.endpoint,
            self.container,
            name,
            start,
            expiry,
            percent_encode_query(&signature),
        ))
    }

    fn base_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "x-ms-date".to_string(),
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        );
        headers.insert("x-ms-version".to_string(), STORAGE_API_VERSION.to_string());
        headers
    }

    fn authorization(
        &self,
        method: &str,
        content_length: usize,
        ms_headers: &BTreeMap<String, String>,
        resource_path: &str,
        query: &[(String, String)],
    ) -> Result<String, UpstreamError> {
        let string_to_sign = shared_key_string_to_sign(
            method,
            content_length,
            ms_headers,
            &self.account,
            resource_path,
            query,
        );
        let signature = self.sign(&string_to_sign)?;
        Ok(format!("SharedKey {}:{}", self.account, signature))
    }

    fn sign(&self, payload: &str) -> Result<String, UpstreamError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|err| UpstreamError::storage("sign", err))?;
        mac.update(payload.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

fn shared_key_string_to_sign(
    method: &str,
    content_length: usize,
    ms_headers: &BTreeMap<String, String>,
    account: &str,
    resource_path: &str,
    query: &[(String, String)],
) -> String {
    let length_slot = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let canonical_headers = ms_headers
        .iter()
        .map(|(key, value)| format!("{}:{}\n", key.to_ascii_lowercase(), value.trim()))
        .collect::<String>();

    let mut canonical_resource = format!("/{account}/{resource_path}");
    let mut sorted_query = query.to_vec();
    sorted_query.sort();
    for (key, value) in &sorted_query {
        canonical_resource.push_str(&format!("\n{key}:{value}"));
    }

    format!(
        "{method}\n\n\n{length_slot}\n\n\n\n\n\n\n\n\n{canonical_headers}{canonical_resource}"
    )
}

fn sas_string_to_sign(start: &str, expiry: &str, canonical_resource: &str) -> String {
    format!(
        "r\n{start}\n{expiry}\n{canonical_resource}\n\n\nhttps\n{STORAGE_API_VERSION}\nb\n\n\n\n\n\n\n"
    )
}

fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn percent_encode_query(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

fn blob_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<Blob>(.*?)</Blob>").expect("blob regex compiles"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)>([^<]*)</").expect("tag regex compiles"))
}

fn metadata_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<Metadata>(.*?)</Metadata>").expect("metadata regex compiles"))
}

fn parse_blob_listing(xml: &str) -> Vec<BlobEntry> {
    let mut entries = Vec::new();

    for block in blob_block_regex().captures_iter(xml) {
        let body = &block[1];

        let mut name = None;
        let mut size = None;
        let mut last_modified = None;

        let metadata_body = metadata_block_regex()
            .captures(body)
            .map(|captures| captures[1].to_string());
        let scan_body = metadata_block_regex().replace(body, "");

        for tag in tag_regex().captures_iter(&scan_body) {
            match &tag[1] {
                "Name" => name = Some(tag[2].to_string()),
                "Content-Length" => size = tag[2].parse::<u64>().ok(),
                "Last-Modified" => last_modified = Some(tag[2].to_string()),
                _ => {}
            }
        }

        let mut metadata = BTreeMap::new();
        if let Some(metadata_body) = metadata_body {
            for tag in tag_regex().captures_iter(&metadata_body) {
                metadata.insert(tag[1].to_string(), tag[2].to_string());
            }
        }

        if let Some(name) = name {
            entries.push(BlobEntry {
                name,
                size,
                last_modified,
                metadata,
            });
        }
    }

    entries
}

fn check_response(
    response: reqwest::blocking::Response,
    operation: &'static str,
) -> Result<(), UpstreamError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().unwrap_or_default();
    Err(UpstreamError::storage(operation, format!("{status}: {body}")))
}
