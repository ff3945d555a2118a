use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::answerer::GroundedAnswerer;
use crate::cli::AskArgs;
use crate::clients::Services;
use crate::config::AppConfig;
use crate::model::ChatTurn;
use crate::retriever::HybridRetriever;

pub fn run(args: AskArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let history = match &args.history_path {
        Some(path) => read_history(path)?,
        None => Vec::new(),
    };
    info!(question = %args.question, top_k = args.top_k, turns = history.len(), "asking");

    let retriever = HybridRetriever::new(&services.search, &services.openai);
    let hits = match retriever.retrieve(&args.question, args.top_k, args.filter.as_deref()) {
        Ok(hits) => hits,
        Err(err) => {
            println!("Query failed: {err}");
            return Ok(());
        }
    };

    let answerer = GroundedAnswerer::new(&services.openai);
    let answer = match answerer.answer(&args.question, &hits, &history) {
        Ok(answer) => answer,
        Err(err) => {
            println!("Query failed: {err}");
            return Ok(());
        }
    };

    println!("{}", answer.answer_text);

    if let Some(path) = &args.history_path {
        append_history(path, &args.question, &answer.answer_text)?;
    }

    Ok(())
}

fn read_history(path: &Path) -> Result<Vec<ChatTurn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read history {}", path.display()))?;
    let mut turns = Vec::new();
    for line in raw.lines().filter(|line| !line.trim().is_empty()) {
        let turn: ChatTurn = serde_json::from_str(line)
            .with_context(|| format!("malformed history line in {}", path.display()))?;
        turns.push(turn);
    }
    Ok(turns)
}

fn append_history(path: &Path, question: &str, answer: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open history {}", path.display()))?;

    for turn in [
        ChatTurn { role: "user".to_string(), content: question.to_string() },
        ChatTurn { role: "assistant".to_string(), content: answer.to_string() },
    ] {
        let line = serde_json::to_string(&turn).context("failed to serialize history turn")?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append history {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_round_trips_through_jsonl_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");

        append_history(&path, "Who is the tenant?", "Acme LLC.").unwrap();
        append_history(&path, "And the rent?", "120000 per year.").unwrap();

        let turns = read_history(&path).unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[0].content, "Who is the tenant?");
        assert_eq!(turns[3].role, "assistant");
        assert_eq!(turns[3].content, "120000 per year.");
    }

    #[test]
    fn missing_history_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let turns = read_history(&dir.path().join("absent.jsonl")).unwrap();
        assert!(turns.is_empty());
    }
}
