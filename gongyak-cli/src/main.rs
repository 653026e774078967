//! Diagnostic CLI for the gongyak query pipeline.
//!
//! `ask` runs a question end to end, `interpret` shows only the parsed
//! query, `sources` lists the configured upstream services. Without a
//! service key everything runs against the built-in stub payloads.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gongyak::{PipelineConfig, QueryInterpreter, QueryPipeline, SourceCatalog};

#[derive(Parser)]
#[command(name = "gongyak", version, about = "Korean election open-data query pipeline")]
struct Cli {
    /// TOML config file; environment variables fill what it leaves out.
    #[arg(long, global = true, env = "GONGYAK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interpret a question and run it against the upstream services.
    Ask {
        /// The question, e.g. "2022년 지방선거 서울시장 당선자".
        text: Vec<String>,
    },
    /// Show the structured query a question parses into; no upstream calls.
    Interpret { text: Vec<String> },
    /// List the configured upstream sources and their endpoints.
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gongyak=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Ask { text } => {
            let question = text.join(" ");
            anyhow::ensure!(!question.trim().is_empty(), "ask needs a question");
            let pipeline = QueryPipeline::from_config(&config)?;
            let response = pipeline.run(&question).await?;
            if response.is_stub_data {
                info!("no service key set; this answer comes from stub data");
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
            if let Some(failure) = &response.failure {
                anyhow::bail!("query failed: {}", failure.message());
            }
        }
        Command::Interpret { text } => {
            let question = text.join(" ");
            anyhow::ensure!(!question.trim().is_empty(), "interpret needs a question");
            let interpreter = QueryInterpreter::from_config(&config.completion);
            let result = interpreter.interpret_with_debug(&question).await;
            println!("{}", serde_json::to_string_pretty(&result.parsed)?);
            info!(
                "interpreted via the {:?} path in {} ms",
                result.debug.path, result.debug.latency_ms
            );
        }
        Command::Sources => {
            let catalog = SourceCatalog::with_defaults();
            for id in catalog.ids() {
                let source = catalog.get(id)?;
                println!("{id}  ({})", id.display_name());
                println!("  base: {}", source.base_url);
                for (name, path) in &source.endpoints {
                    println!("  {name} -> {path}");
                }
            }
        }
    }
    Ok(())
}

/// File config when given, environment otherwise; the service key can
/// always come from the environment so it never has to live in a file.
fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::from_env());
    };
    let doc = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let mut config = PipelineConfig::from_toml_str(&doc)?;
    if config.service_key.is_none() {
        config.service_key = PipelineConfig::from_env().service_key;
    }
    Ok(config)
}
