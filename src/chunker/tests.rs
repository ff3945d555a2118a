use super::split::split_block_text;
use super::*;
use crate::model::{
    AnalyzedPage, AnalyzedParagraph, AnalyzedTable, KeyValueField, StructuralResult, TableCell,
};

fn page(number: u32, lines: &[&str]) -> AnalyzedPage {
    AnalyzedPage {
        page_number: number,
        lines: lines.iter().map(|line| line.to_string()).collect(),
    }
}

fn two_by_two_table(page: Option<u32>) -> AnalyzedTable {
    AnalyzedTable {
        cells: vec![
            TableCell { row: 0, column: 0, text: "A".to_string() },
            TableCell { row: 0, column: 1, text: "B".to_string() },
            TableCell { row: 1, column: 0, text: "C".to_string() },
            TableCell { row: 1, column: 1, text: "D".to_string() },
        ],
        page,
    }
}

#[test]
fn single_short_page_emits_one_chunk_with_stable_id() {
    let result = StructuralResult {
        pages: vec![page(1, &["This lease covers unit 4B for two years."])],
        ..StructuralResult::default()
    };

    let chunks = build(&result, "doc-7", "lease.pdf", 2500);

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].id.ends_with("-p1-c0"));
    assert_eq!(chunks[0].doc_id, "doc-7");
    assert_eq!(chunks[0].source_file, "lease.pdf");
    assert_eq!(chunks[0].page_number, Some(1));
    assert_eq!(chunks[0].section_title, "Page 1");
    assert!(chunks[0].content.starts_with("PAGE 1\n"));
}

#[test]
fn table_renders_rows_with_column_separator() {
    let result = StructuralResult {
        pages: vec![page(1, &["Rent schedule"])],
        tables: vec![two_by_two_table(Some(1))],
        ..StructuralResult::default()
    };

    let chunks = build(&result, "doc-1", "lease.pdf", 2500);

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].content.contains("TABLE:\nA | B\nC | D"));
}

#[test]
fn table_cells_are_ordered_by_row_then_column() {
    let table = AnalyzedTable {
        cells: vec![
            TableCell { row: 1, column: 1, text: "D".to_string() },
            TableCell { row: 0, column: 1, text: "B".to_string() },
            TableCell { row: 1, column: 0, text: "C".to_string() },
            TableCell { row: 0, column: 0, text: "A".to_string() },
        ],
        page: Some(1),
    };

    assert_eq!(render_table(&table), "TABLE:\nA | B\nC | D");
}

#[test]
fn overlay_sections_appear_in_fixed_order() {
    let result = StructuralResult {
        pages: vec![page(2, &["Base line text"])],
        paragraphs: vec![AnalyzedParagraph {
            role: "body".to_string(),
            text: "The tenant shall maintain the premises.".to_string(),
            page: Some(2),
        }],
        tables: vec![two_by_two_table(Some(2))],
        key_values: vec![KeyValueField {
            key: "Tenant".to_string(),
            value: Some("Acme LLC".to_string()),
            page: Some(2),
        }],
    };

    let blocks = assemble_page_blocks(&result);
    assert_eq!(blocks.len(), 1);

    let text = &blocks[0].text;
    let paragraphs_at = text.find("PARAGRAPHS:").expect("paragraph section");
    let table_at = text.find("TABLE:").expect("table section");
    let kv_at = text.find("KEY-VALUE PAIRS:").expect("key-value section");
    assert!(text.starts_with("PAGE 2\nBase line text"));
    assert!(paragraphs_at < table_at && table_at < kv_at);
    assert!(text.contains("Tenant: Acme LLC"));
}

#[test]
fn empty_overlay_sections_are_omitted() {
    let result = StructuralResult {
        pages: vec![page(1, &["Only base text here"])],
        ..StructuralResult::default()
    };

    let blocks = assemble_page_blocks(&result);
    assert!(!blocks[0].text.contains("PARAGRAPHS:"));
    assert!(!blocks[0].text.contains("TABLE:"));
    assert!(!blocks[0].text.contains("KEY-VALUE PAIRS:"));
}

#[test]
fn page_without_lines_still_produces_block_with_overlays() {
    let result = StructuralResult {
        pages: vec![page(3, &[])],
        key_values: vec![KeyValueField {
            key: "Contract ID".to_string(),
            value: Some("C-1189".to_string()),
            page: Some(3),
        }],
        ..StructuralResult::default()
    };

    let chunks = build(&result, "doc-2", "lease.pdf", 2500);

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].content.starts_with("PAGE 3"));
    assert!(chunks[0].content.contains("KEY-VALUE PAIRS:\nContract ID: C-1189"));
}

#[test]
fn zero_pages_yield_zero_chunks() {
    let chunks = build(&StructuralResult::default(), "doc-3", "lease.pdf", 2500);
    assert!(chunks.is_empty());
}

#[test]
fn pageless_structural_items_are_excluded() {
    let result = StructuralResult {
        pages: vec![page(1, &["Base"])],
        paragraphs: vec![AnalyzedParagraph {
            role: "body".to_string(),
            text: "floating paragraph".to_string(),
            page: None,
        }],
        tables: vec![two_by_two_table(None)],
        key_values: vec![KeyValueField {
            key: "Orphan".to_string(),
            value: Some("value".to_string()),
            page: None,
        }],
    };

    let chunks = build(&result, "doc-4", "lease.pdf", 2500);

    assert_eq!(chunks.len(), 1);
    assert!(!chunks[0].content.contains("floating paragraph"));
    assert!(!chunks[0].content.contains("TABLE:"));
    assert!(!chunks[0].content.contains("Orphan"));
}

#[test]
fn blocks_are_emitted_in_ascending_page_order() {
    let result = StructuralResult {
        pages: vec![page(3, &["third"]), page(1, &["first"]), page(2, &["second"])],
        ..StructuralResult::default()
    };

    let chunks = build(&result, "doc-5", "lease.pdf", 2500);

    let pages = chunks
        .iter()
        .map(|chunk| chunk.page_number.unwrap())
        .collect::<Vec<u32>>();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[test]
fn duplicate_page_numbers_collapse_to_one_block() {
    let result = StructuralResult {
        pages: vec![page(1, &["early scan of page one"]), page(1, &["final scan of page one"])],
        ..StructuralResult::default()
    };

    let chunks = build(&result, "doc-x", "lease.pdf", 2500);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "doc-x-p1-c0");
    assert!(chunks[0].content.contains("final scan of page one"));
    assert!(!chunks[0].content.contains("early scan"));

    let mut ids = chunks.iter().map(|chunk| chunk.id.clone()).collect::<Vec<String>>();
    ids.dedup();
    assert_eq!(ids.len(), chunks.len());
}

#[test]
fn build_is_idempotent() {
    let result = StructuralResult {
        pages: vec![page(1, &["alpha", "beta"]), page(2, &["gamma"])],
        tables: vec![two_by_two_table(Some(1))],
        ..StructuralResult::default()
    };

    let first = build(&result, "doc-6", "lease.pdf", 40);
    let second = build(&result, "doc-6", "lease.pdf", 40);

    assert_eq!(first, second);
}

#[test]
fn every_chunk_respects_the_character_bound() {
    let long_lines = (0..120)
        .map(|index| format!("Clause {index} obliges the tenant to act in good faith."))
        .collect::<Vec<String>>();
    let result = StructuralResult {
        pages: vec![AnalyzedPage { page_number: 1, lines: long_lines }],
        ..StructuralResult::default()
    };

    for max_chars in [80, 250, 2500] {
        let chunks = build(&result, "doc-8", "lease.pdf", max_chars);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|chunk| chunk.content.chars().count() <= max_chars));
    }
}

#[test]
fn block_exactly_at_limit_stays_one_chunk_and_one_over_splits() {
    let result = StructuralResult {
        pages: vec![page(1, &["aaaa bbbb cccc dddd eeee", "ffff gggg hhhh"])],
        ..StructuralResult::default()
    };

    let full = build(&result, "doc-9", "lease.pdf", 10_000);
    assert_eq!(full.len(), 1);
    let exact = full[0].content.chars().count();

    assert_eq!(build(&result, "doc-9", "lease.pdf", exact).len(), 1);
    assert_eq!(build(&result, "doc-9", "lease.pdf", exact - 1).len(), 2);
}

#[test]
fn split_prefers_the_last_newline_inside_the_window() {
    let parts = split_block_text("aaa\nbbb", 5);
    assert_eq!(parts, vec!["aaa".to_string(), "\nbbb".to_string()]);
}

#[test]
fn split_hard_cuts_when_no_newline_in_window() {
    let parts = split_block_text("abcdefgh", 3);
    assert_eq!(parts, vec!["abc".to_string(), "def".to_string(), "gh".to_string()]);
}

#[test]
fn split_collapses_runs_of_blank_lines() {
    let parts = split_block_text("alpha\n\n\n\nbeta", 100);
    assert_eq!(parts, vec!["alpha\n\nbeta".to_string()]);
}

#[test]
fn split_makes_progress_on_leading_newline() {
    let text = format!("\n{}", "a".repeat(9));
    let parts = split_block_text(&text, 4);
    assert!(parts.len() >= 2);
    assert!(parts.iter().all(|part| part.chars().count() <= 4));
    assert_eq!(parts.concat(), text);
}

#[test]
fn key_value_with_missing_value_renders_bare_key() {
    let field = KeyValueField {
        key: "Signed".to_string(),
        value: None,
        page: Some(1),
    };
    assert_eq!(render_key_value(&field), "Signed: ");
}
