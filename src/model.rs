use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralResult {
    pub pages: Vec<AnalyzedPage>,
    pub paragraphs: Vec<AnalyzedParagraph>,
    pub tables: Vec<AnalyzedTable>,
    pub key_values: Vec<KeyValueField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedPage {
    pub page_number: u32,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedParagraph {
    pub role: String,
    pub text: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedTable {
    pub cells: Vec<TableCell>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    pub row: u32,
    pub column: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueField {
    pub key: String,
    pub value: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub source_file: String,
    pub page_number: Option<u32>,
    pub content: String,
    pub section_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub filename: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub ordinal: usize,
    pub filename: String,
    pub page_number: Option<u32>,
    pub chunk_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpsertReport {
    pub succeeded: usize,
    pub failed_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub doc_id: Option<String>,
    pub blob_name: String,
    pub filename: String,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
    pub indexed_chunks: usize,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips_through_jsonl_line() {
        let chunk = Chunk {
            id: "3f2c-p4-c1".to_string(),
            doc_id: "3f2c".to_string(),
            source_file: "lease_2024.pdf".to_string(),
            page_number: Some(4),
            content: "PAGE 4\nAnnual rent AED 120,000".to_string(),
            section_title: "Page 4".to_string(),
        };

        let line = serde_json::to_string(&chunk).expect("chunk serializes");
        assert!(!line.contains('\n'));

        let restored: Chunk = serde_json::from_str(&line).expect("chunk parses");
        assert_eq!(restored, chunk);
    }

    #[test]
    fn chunk_with_unresolved_page_serializes_null_page() {
        let chunk = Chunk {
            id: "3f2c-pnull-c0".to_string(),
            doc_id: "3f2c".to_string(),
            source_file: "lease.pdf".to_string(),
            page_number: None,
            content: "unanchored".to_string(),
            section_title: "Page ?".to_string(),
        };

        let value = serde_json::to_value(&chunk).expect("chunk serializes");
        assert!(value["page_number"].is_null());
    }
}
