mod fixture;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use meridian_config::AppConfig;
use meridian_core::Outcome;
use meridian_engine::Engine;
use meridian_storage::Storage as _;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(
    name = "meridian",
    version,
    about = "Cite-or-abstain admissions and financial aid question answering"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used if it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer a single question against the bundled fixture corpus.
    Ask {
        /// The question, e.g. "is a parent PLUS denial going to make me independent?"
        query: String,
        /// Print the full structured response as JSON instead of rendered prose.
        #[arg(long)]
        json: bool,
    },
    /// Rebuild and report on the bundled fixture corpus without answering anything.
    IngestFixture,
    /// Print the effective configuration and bundled corpus summary.
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config))?;

    match cli.command {
        Commands::Ask { query, json } => run_ask(config, &query, json).await,
        Commands::IngestFixture => run_ingest_fixture(),
        Commands::Doctor => run_doctor(config, &cli.config),
    }
}

async fn run_ask(config: AppConfig, query: &str, json: bool) -> Result<()> {
    let storage = fixture::builder().finish().context("building bundled fixture corpus")?;
    let engine = Engine::new(storage, config);

    let response = engine.answer(query, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match &response.outcome {
        Outcome::Answered(answer) => {
            let rendered = engine.render(&response);
            println!("{}", rendered.body);
            println!("handler: {}", answer.handler_id);
            println!("confidence: {:.2}", answer.confidence);
        }
        Outcome::Abstained(abstention) => {
            println!("ABSTAINED [{}]: {}", abstention.reason.as_str(), abstention.message);
            if let Some(plan) = &abstention.retrieval_plan {
                println!("retrieval plan: {plan}");
            }
        }
    }

    Ok(())
}

fn run_ingest_fixture() -> Result<()> {
    let corpus = fixture::builder().finish().context("building bundled fixture corpus")?;
    println!("bundled fixture corpus rebuilt");
    for (collection, count) in corpus.list_collections() {
        println!("  {collection:<12} {count} document(s)");
    }
    Ok(())
}

fn run_doctor(config: AppConfig, config_path: &str) -> Result<()> {
    let config_exists = Path::new(config_path).exists();
    println!("meridian doctor");
    println!("- config path          : {config_path} ({})", if config_exists { "found" } else { "defaults used" });
    println!("- current_year         : {}", config.engine.current_year);
    println!("- request_deadline_ms  : {}", config.engine.request_deadline_ms);
    println!("- retrieval.k          : {}", config.retrieval.k);
    println!("- retrieval.fusion_c   : {}", config.retrieval.fusion_c);
    println!("- retrieval.authority_boost : {}", config.retrieval.authority_boost);
    println!("- retrieval.score_floor : {}", config.retrieval.score_floor);
    println!("- retrieval.top_n      : {}", config.retrieval.top_n);
    println!("- validator.citation_coverage_floor : {}", config.validator.citation_coverage_floor);
    println!("- validator.min_authoritative_sources : {}", config.validator.min_authoritative_sources);
    println!("- handler.retry_limit  : {}", config.handler.retry_limit);
    println!("- telemetry.log_level  : {}", config.telemetry.log_level);

    let corpus = fixture::builder().finish().context("building bundled fixture corpus")?;
    println!("- fixture corpus:");
    for (collection, count) in corpus.list_collections() {
        println!("    {collection:<12} {count} document(s)");
    }
    Ok(())
}
