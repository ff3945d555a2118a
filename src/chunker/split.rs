use std::sync::OnceLock;

use regex::Regex;

fn blank_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank-run regex compiles"))
}

pub(super) fn split_block_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = blank_run_regex().replace_all(text, "\n\n").into_owned();

    let mut parts = Vec::new();
    let mut remaining = normalized.as_str();

    while remaining.chars().count() > max_chars {
        let window_end = byte_index_at_char(remaining, max_chars);
        let cut = match remaining[..window_end].rfind('\n') {
            Some(0) | None => window_end,
            Some(index) => index,
        };

        parts.push(remaining[..cut].to_string());
        remaining = &remaining[cut..];
    }

    parts.push(remaining.to_string());
    parts
}

fn byte_index_at_char(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}
