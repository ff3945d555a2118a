use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Chunk, StructuralResult};

mod render;
mod split;
#[cfg(test)]
mod tests;

use render::*;
use split::split_block_text;

#[derive(Debug, Clone)]
pub struct PageBlock {
    pub page_number: u32,
    pub text: String,
}

pub fn build(
    result: &StructuralResult,
    doc_id: &str,
    source_file: &str,
    max_chars: usize,
) -> Vec<Chunk> {
    let blocks = assemble_page_blocks(result);

    let mut chunks = Vec::new();
    for block in &blocks {
        let parts = split_block_text(&block.text, max_chars);
        for (index, part) in parts.into_iter().enumerate() {
            chunks.push(Chunk {
                id: format!("{doc_id}-p{}-c{index}", block.page_number),
                doc_id: doc_id.to_string(),
                source_file: source_file.to_string(),
                page_number: Some(block.page_number),
                content: part,
                section_title: format!("Page {}", block.page_number),
            });
        }
    }

    chunks
}

pub fn assemble_page_blocks(result: &StructuralResult) -> Vec<PageBlock> {
    let paragraphs = group_paragraphs_by_page(&result.paragraphs);
    let tables = group_rendered_tables_by_page(&result.tables);
    let key_values = group_rendered_key_values_by_page(&result.key_values);

    let dropped = count_pageless_items(result);
    if dropped > 0 {
        debug!(dropped, "structural items without a resolvable page were skipped");
    }

    let mut base_texts = BTreeMap::<u32, String>::new();
    for page in &result.pages {
        let base_text = page
            .lines
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<&str>>()
            .join("\n");
        base_texts.insert(page.page_number, base_text);
    }

    let mut blocks = Vec::with_capacity(base_texts.len());
    for (page_number, base_text) in &base_texts {
        let mut block = format!("PAGE {page_number}\n{}", base_text.trim());

        if let Some(section) = paragraphs.get(page_number) {
            block.push_str("\n\nPARAGRAPHS:\n");
            block.push_str(section);
        }
        if let Some(section) = tables.get(page_number) {
            block.push_str("\n\n");
            block.push_str(section);
        }
        if let Some(section) = key_values.get(page_number) {
            block.push_str("\n\nKEY-VALUE PAIRS:\n");
            block.push_str(section);
        }

        blocks.push(PageBlock {
            page_number: *page_number,
            text: block.trim().to_string(),
        });
    }

    blocks
}

fn count_pageless_items(result: &StructuralResult) -> usize {
    result
        .paragraphs
        .iter()
        .filter(|paragraph| paragraph.page.is_none())
        .count()
        + result.tables.iter().filter(|table| table.page.is_none()).count()
        + result
            .key_values
            .iter()
            .filter(|field| field.page.is_none())
            .count()
}
