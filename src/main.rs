//! # RagRelay
//!
//! Keyword-RAG relay in front of an OpenAI-compatible streaming chat API.
//!
//! Usage:
//!   ragrelay serve                          # Start the relay (default 0.0.0.0:8000)
//!   ragrelay serve --port 9000 -v           # Custom port, debug logging
//!   ragrelay diagnose                       # Check knowledge file and a running server
//!   ragrelay search "where is the atm"      # Show ranked passages offline

mod diagnose;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragrelay_core::config::RelayConfig;
use ragrelay_knowledge::KnowledgeStore;
use ragrelay_knowledge::chunker::split_passages;
use ragrelay_knowledge::keywords::query_categories;
use ragrelay_knowledge::search::{rank, select_context};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ragrelay",
    version,
    about = "🛍️ RagRelay: keyword-RAG relay for OpenAI-compatible chat APIs"
)]
struct Cli {
    /// Config file (defaults to $RAGRELAY_CONFIG or ~/.ragrelay/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP relay
    Serve {
        /// Bind address (overrides [server].host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Check the knowledge file and a running relay
    Diagnose {
        /// Base URL of the running relay
        #[arg(long, default_value = "http://localhost:8000")]
        url: String,

        /// Knowledge file to inspect (defaults to [knowledge].path)
        #[arg(long)]
        knowledge: Option<String>,
    },
    /// Rank knowledge passages for a query without calling the upstream
    Search {
        query: String,
    },
}

fn load_config(path: Option<&str>) -> Result<RelayConfig> {
    let config = match path {
        Some(p) => RelayConfig::load_from(&PathBuf::from(shellexpand::tilde(p).as_ref()))?,
        None => RelayConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "ragrelay=debug,ragrelay_agent=debug,ragrelay_knowledge=debug,ragrelay_providers=debug,ragrelay_gateway=debug,tower_http=debug"
    } else {
        "ragrelay=info,ragrelay_agent=info,ragrelay_knowledge=info,ragrelay_providers=info,ragrelay_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!("🛍️ RagRelay v{}", env!("CARGO_PKG_VERSION"));
            ragrelay_gateway::start(config).await?;
        }
        Command::Diagnose { url, knowledge } => {
            let path = match knowledge {
                Some(p) => PathBuf::from(shellexpand::tilde(&p).as_ref()),
                None => config.knowledge.resolved_path(),
            };
            let report = diagnose::run(&url, &path).await;
            report.print_summary();
            if !report.server_reachable {
                std::process::exit(1);
            }
        }
        Command::Search { query } => search(&config, &query).await?,
    }

    Ok(())
}

async fn search(config: &RelayConfig, query: &str) -> Result<()> {
    let store = KnowledgeStore::new(&config.knowledge);
    let text = store.load().await?;
    let passages = split_passages(&text);

    let lowered = query.to_lowercase();
    let categories: Vec<&str> = query_categories(&lowered).map(|c| c.name).collect();
    println!("🔍 Query: {query}");
    println!("📑 {} passages in {}", passages.len(), store.path().display());
    if categories.is_empty() {
        println!("🏷️  No keyword categories matched");
    } else {
        println!("🏷️  Categories: {}", categories.join(", "));
    }

    let ranked = rank(query, &passages);
    if ranked.is_empty() {
        println!("\n⚠️ No passage scored above zero");
    }
    for (i, scored) in ranked.iter().enumerate() {
        println!("\n#{} score={} (passage {})", i + 1, scored.score, scored.passage.position);
        println!("{}", scored.passage.text);
    }

    let selection = select_context(&ranked, &passages);
    let kind = match &selection {
        ragrelay_knowledge::Selection::Ranked { passages, .. } => format!("top {passages} ranked passages"),
        ragrelay_knowledge::Selection::Overview(_) => "overview (first passages)".to_string(),
        ragrelay_knowledge::Selection::Empty => "empty".to_string(),
    };
    println!("\n📋 Context: {kind}, {} characters", selection.context().len());
    Ok(())
}
