use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_MAX_CHUNK_CHARS;

#[derive(Parser, Debug)]
#[command(
    name = "leaserag",
    version,
    about = "Lease contract ingestion, indexing, and grounded question answering"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Reindex(ReindexArgs),
    Remove(RemoveArgs),
    Status,
    Ask(AskArgs),
    Reset(ResetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
    pub max_chars: usize,

    #[arg(long, default_value = "processed")]
    pub processed_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ReindexArgs {
    #[arg(long)]
    pub blob: String,

    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
    pub max_chars: usize,

    #[arg(long)]
    pub from_checkpoint: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[arg(long)]
    pub blob: String,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    #[arg(long)]
    pub question: String,

    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long)]
    pub filter: Option<String>,

    #[arg(long)]
    pub history_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ResetArgs {
    #[arg(long)]
    pub yes: bool,
}
