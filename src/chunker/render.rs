use std::collections::BTreeMap;

use crate::model::{AnalyzedParagraph, AnalyzedTable, KeyValueField};

pub(super) fn group_paragraphs_by_page(
    paragraphs: &[AnalyzedParagraph],
) -> BTreeMap<u32, String> {
    let mut grouped = BTreeMap::<u32, Vec<&str>>::new();
    for paragraph in paragraphs {
        if let Some(page) = paragraph.page {
            grouped.entry(page).or_default().push(paragraph.text.as_str());
        }
    }

    join_non_blank(grouped)
}

pub(super) fn group_rendered_tables_by_page(tables: &[AnalyzedTable]) -> BTreeMap<u32, String> {
    let mut grouped = BTreeMap::<u32, Vec<String>>::new();
    for table in tables {
        if let Some(page) = table.page {
            grouped.entry(page).or_default().push(render_table(table));
        }
    }

    grouped
        .into_iter()
        .map(|(page, snippets)| (page, snippets.join("\n")))
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
}

pub(super) fn group_rendered_key_values_by_page(
    key_values: &[KeyValueField],
) -> BTreeMap<u32, String> {
    let mut grouped = BTreeMap::<u32, Vec<String>>::new();
    for field in key_values {
        if let Some(page) = field.page {
            grouped
                .entry(page)
                .or_default()
                .push(render_key_value(field));
        }
    }

    join_non_blank(grouped)
}

pub(super) fn render_table(table: &AnalyzedTable) -> String {
    let mut rows = BTreeMap::<u32, BTreeMap<u32, &str>>::new();
    for cell in &table.cells {
        rows.entry(cell.row)
            .or_default()
            .insert(cell.column, cell.text.as_str());
    }

    let mut rendered = String::from("TABLE:");
    for columns in rows.values() {
        rendered.push('\n');
        rendered.push_str(
            &columns
                .values()
                .copied()
                .collect::<Vec<&str>>()
                .join(" | "),
        );
    }

    rendered
}

pub(super) fn render_key_value(field: &KeyValueField) -> String {
    format!("{}: {}", field.key, field.value.as_deref().unwrap_or_default())
}

fn join_non_blank<S: AsRef<str>>(grouped: BTreeMap<u32, Vec<S>>) -> BTreeMap<u32, String> {
    grouped
        .into_iter()
        .map(|(page, texts)| {
            let joined = texts
                .iter()
                .map(|text| text.as_ref())
                .collect::<Vec<&str>>()
                .join("\n");
            (page, joined)
        })
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
}
