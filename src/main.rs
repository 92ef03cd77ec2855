//! Thin entrypoint: builds or refreshes the on-disk index for a project.
//! The interactive terminal UI and streaming task loop are a separate,
//! out-of-scope surface that drives the crates in this workspace directly.

use anyhow::{Context, Result, bail};
use project_index::ProjectIndexer;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file.
    // Fails if .env file not found, not readable or invalid.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "update".to_string());
    let root: PathBuf = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let mut indexer = ProjectIndexer::new(&root);
    let stats = match command.as_str() {
        "index" => indexer.build().context("building index")?,
        "update" => indexer.update().context("updating index")?,
        other => bail!("unknown command '{other}', expected 'index' or 'update'"),
    };

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
