//! Command-line access to a persisted memory stream.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use reverie_rs::HttpEmbeddingProvider;
use reverie_rs::cli::{Cli, run};
use reverie_rs::memory::EmbeddingProvider;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reverie_rs::init_logging();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cwd")?;
    let config = cli.load_config(&cwd)?;
    let embeddings = config.embeddings.clone();
    let embedder = move || -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        let provider = HttpEmbeddingProvider::from_config(&embeddings)
            .context("failed to build embedding client")?;
        Ok(Arc::new(provider))
    };

    let mut stdout = std::io::stdout().lock();
    run(cli.command, &config, embedder, Utc::now(), &mut stdout).await
}
