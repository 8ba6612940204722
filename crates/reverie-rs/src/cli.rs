//! `reverie` command-line interface over a persisted memory stream.

use crate::assembly::{agent_memory, open_stream, save_stream};
use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::{debug, info};
use reverie_rs_config::ReverieConfig;
use reverie_rs_memory::{
    AgentMemory, EmbeddingProvider, InMemorySimilarityIndex, MemoryError, MemoryId, MemoryStream,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line options for the memory CLI.
#[derive(Debug, Parser)]
#[command(name = "reverie", version)]
pub struct Cli {
    /// Optional path to a reverie.json5 config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Snapshot file overriding memory.snapshot_path
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Embed and store an observation
    Add {
        #[arg(long)]
        text: String,
        #[arg(long)]
        importance: f64,
    },
    /// Retrieve the best memories for a query
    Query {
        #[arg(long)]
        text: String,
        /// Number of memories (defaults to memory.default_k)
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Print a single memory as JSON
    Show {
        #[arg(long)]
        id: u64,
    },
    /// List the newest memories
    Recent {
        #[arg(short, long, default_value_t = 10)]
        n: usize,
    },
}

impl Cli {
    /// Load the config named by `--config`, or the layered stack for `cwd`,
    /// then apply `--snapshot`. Relative paths resolve against `cwd` either way.
    pub fn load_config(&self, cwd: &Path) -> anyhow::Result<ReverieConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => {
                info!("loading config from {}", path.display());
                ReverieConfig::load_from_path(cwd.join(path)).context("failed to load config")?
            }
            None => {
                let layered =
                    ReverieConfig::load_layered(cwd).context("failed to load layered config")?;
                debug!("layered config loaded (layers={})", layered.layers.len());
                layered.config
            }
        };
        if let Some(snapshot) = self.snapshot.clone() {
            config.memory.snapshot_path = Some(snapshot);
        }
        config.resolve_relative_paths(cwd);
        if config.memory.snapshot_path.is_none() {
            bail!("no snapshot file: pass --snapshot or set memory.snapshot_path");
        }
        Ok(config)
    }
}

/// Run one subcommand against the configured snapshot, writing results to `out`.
///
/// `embedder` is only invoked by commands that embed text.
pub async fn run<F>(
    command: Command,
    config: &ReverieConfig,
    embedder: F,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<Arc<dyn EmbeddingProvider>>,
{
    let stream = open_stream(config, Arc::new(InMemorySimilarityIndex::new()))
        .await
        .context("failed to open memory snapshot")?;

    match command {
        Command::Add { text, importance } => {
            let memory = agent_memory(config, stream.clone(), embedder()?);
            let outcome = memory
                .remember(text, importance, now)
                .await
                .context("failed to store memory")?;
            save_stream(config, &stream).context("failed to save snapshot")?;
            writeln!(out, "stored {}", outcome.id)?;
        }
        Command::Query { text, k } => {
            let memory = agent_memory(config, stream.clone(), embedder()?);
            let k = k.unwrap_or(config.memory.default_k);
            let records = match memory.fetch(&text, now, k).await {
                Err(MemoryError::EmptyStore) => Vec::new(),
                other => other.context("failed to query memories")?,
            };
            save_stream(config, &stream).context("failed to save snapshot")?;
            write_lines(out, &AgentMemory::format_memories(&records, None))?;
        }
        Command::Show { id } => {
            let record = stream
                .get(MemoryId(id))
                .await
                .with_context(|| format!("failed to read {}", MemoryId(id)))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }
        Command::Recent { n } => {
            let records = stream.recent(n).await?;
            write_lines(out, &AgentMemory::format_memories(&records, None))?;
        }
    }
    Ok(())
}

fn write_lines(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    writeln!(out, "{text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reverie_rs_test_utils::FixedEmbedder;
    use std::fs;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("reverie").chain(args.iter().copied()))
            .expect("args")
    }

    fn embedder() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(
            FixedEmbedder::new(vec![0.0, 1.0])
                .with_vector("Klaus brewed coffee", vec![1.0, 0.0])
                .with_vector("coffee", vec![1.0, 0.0]),
        ))
    }

    fn no_embedder() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        bail!("embedder should not be built")
    }

    async fn run_to_string<F>(cli: Cli, config: &ReverieConfig, embedder: F) -> String
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn EmbeddingProvider>>,
    {
        let mut out = Vec::new();
        run(cli.command, config, embedder, Utc::now(), &mut out)
            .await
            .expect("run");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn config_file_snapshot_path_resolves_against_cwd() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("custom.json5"),
            "{ memory: { dimensions: 2, snapshot_path: \"data/memories.jsonl\" } }",
        )
        .expect("write");

        let cli = parse(&["--config", "custom.json5", "recent"]);
        let config = cli.load_config(temp.path()).expect("config");
        assert_eq!(
            config.memory.snapshot_path,
            Some(temp.path().join("data").join("memories.jsonl"))
        );

        let cli = parse(&[
            "--config",
            "custom.json5",
            "--snapshot",
            "other.jsonl",
            "recent",
        ]);
        let config = cli.load_config(temp.path()).expect("config");
        assert_eq!(
            config.memory.snapshot_path,
            Some(temp.path().join("other.jsonl"))
        );
    }

    #[test]
    fn missing_snapshot_path_is_rejected() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("custom.json5"), "{}").expect("write");
        let cli = parse(&["--config", "custom.json5", "recent"]);
        let err = cli.load_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no snapshot file"), "{err}");
    }

    #[tokio::test]
    async fn subcommands_share_the_snapshot() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("custom.json5"),
            "{ memory: { dimensions: 2, snapshot_path: \"memories.jsonl\" } }",
        )
        .expect("write");
        let load = |args: &[&str]| {
            let cli = parse(args);
            let config = cli.load_config(temp.path()).expect("config");
            (cli, config)
        };

        let (cli, config) = load(&["--config", "custom.json5", "query", "--text", "coffee"]);
        assert_eq!(run_to_string(cli, &config, embedder).await, "");

        let (cli, config) = load(&[
            "--config",
            "custom.json5",
            "add",
            "--text",
            "Klaus brewed coffee",
            "--importance",
            "6",
        ]);
        assert_eq!(run_to_string(cli, &config, embedder).await, "stored mem-1\n");
        let (cli, config) = load(&[
            "--config",
            "custom.json5",
            "add",
            "--text",
            "Maria is planning a party",
            "--importance",
            "3",
        ]);
        assert_eq!(run_to_string(cli, &config, embedder).await, "stored mem-2\n");

        let (cli, config) = load(&[
            "--config",
            "custom.json5",
            "query",
            "--text",
            "coffee",
            "-k",
            "1",
        ]);
        let output = run_to_string(cli, &config, embedder).await;
        assert!(output.ends_with("] Klaus brewed coffee\n"), "{output}");
        assert_eq!(output.lines().count(), 1);

        let (cli, config) = load(&["--config", "custom.json5", "show", "--id", "2"]);
        let output = run_to_string(cli, &config, no_embedder).await;
        let record: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(record["text"], "Maria is planning a party");
        assert_eq!(record["importance"], 3.0);

        let (cli, config) = load(&["--config", "custom.json5", "recent", "-n", "5"]);
        let output = run_to_string(cli, &config, no_embedder).await;
        assert_eq!(output.lines().count(), 2);
    }

    #[tokio::test]
    async fn show_unknown_id_fails() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("custom.json5"), "{}").expect("write");
        let cli = parse(&[
            "--config",
            "custom.json5",
            "--snapshot",
            "memories.jsonl",
            "show",
            "--id",
            "9",
        ]);
        let config = cli.load_config(temp.path()).expect("config");
        let mut out = Vec::new();
        let err = run(cli.command, &config, no_embedder, Utc::now(), &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read mem-9"), "{err}");
        assert!(out.is_empty());
    }
}
