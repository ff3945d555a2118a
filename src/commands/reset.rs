use anyhow::{Result, bail};
use tracing::info;

use crate::cli::ResetArgs;
use crate::clients::Services;
use crate::config::AppConfig;
use crate::indexer::IndexWriter;

pub fn run(args: ResetArgs) -> Result<()> {
    if !args.yes {
        bail!("reset deletes every indexed chunk; pass --yes to confirm");
    }

    let config = AppConfig::from_env()?;
    let services = Services::connect(&config)?;

    let writer = IndexWriter::new(&services.search, &services.openai);
    let removed = writer.delete_all()?;
    info!(removed, "index cleared");

    println!("Deleted {removed} chunks from the index.");
    Ok(())
}
