use clap::{Parser, Subcommand};
use querygate::query::telemetry;
use querygate::{
    EngineConfig, MemoryCollection, QueryEngine, StaticTokenAuthorizer, cli as prog_cli, logger,
};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI-only settings. They live in the same TOML file as the engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AppConfig {
    collection: Option<String>,
    data: Option<PathBuf>,
    log_config: Option<PathBuf>,
    #[serde(default)]
    admin_tokens: Vec<String>,
    slow_query_ms: Option<u64>,
    structured_metrics: Option<bool>,
}

fn apply_telemetry(app: &AppConfig) {
    if let Some(ms) = app.slow_query_ms {
        telemetry::set_slow_query_ms(ms);
    }
    if let Some(enabled) = app.structured_metrics {
        telemetry::set_structured_json(enabled);
    }
}

fn find_config_path(cli_cfg: Option<&PathBuf>) -> Option<PathBuf> {
    // Precedence: CLI > env > ./querygate.toml
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = cli_cfg {
        paths.push(p.clone());
    }
    if let Ok(p) = std::env::var("QUERYGATE_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("querygate.toml"));
    }
    paths.into_iter().find(|p| p.exists())
}

fn load_config(
    cli_cfg: Option<&PathBuf>,
) -> Result<(AppConfig, EngineConfig), Box<dyn std::error::Error>> {
    let Some(path) = find_config_path(cli_cfg) else {
        return Ok((AppConfig::default(), EngineConfig::default()));
    };
    let text = std::fs::read_to_string(&path)?;
    let app: AppConfig = toml::from_str(&text)?;
    let engine = EngineConfig::from_toml_str(&text)?;
    Ok((app, engine))
}

#[derive(Parser, Debug)]
#[command(name = "querygate", version, about = "Run guarded reads against an NDJSON collection", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). Falls back to QUERYGATE_CONFIG, then ./querygate.toml")]
    config: Option<PathBuf>,
    #[arg(long, help = "NDJSON file with one document per line. Overrides `data` from the config")]
    data: Option<PathBuf>,
    #[arg(long, help = "Caller credential, e.g. \"Bearer <token>\"")]
    credential: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Page through matching documents; prints {data, count}")]
    Find {
        #[arg(long, help = "Request JSON, e.g. {\"filter\": {\"code\": \"abc\"}, \"limit\": 10}")]
        request: Option<String>,
        #[arg(long, help = "Return plain data without store metadata")]
        lean: bool,
    },
    #[command(name = "find-one", about = "First document matching a non-empty filter, or null")]
    FindOne {
        #[arg(long)]
        request: Option<String>,
        #[arg(long)]
        lean: bool,
    },
    #[command(name = "find-by-id", about = "Document with the given 24 hex digit id, or null")]
    FindById {
        id: String,
        #[arg(long)]
        request: Option<String>,
        #[arg(long)]
        lean: bool,
    },
}

fn build_engine(
    cli: &Cli,
    app: &AppConfig,
    cfg: EngineConfig,
) -> Result<QueryEngine, Box<dyn std::error::Error>> {
    let name = app.collection.clone().unwrap_or_else(|| "documents".to_string());
    let collection = MemoryCollection::new(name);
    if let Some(path) = cli.data.as_ref().or(app.data.as_ref()) {
        let file = std::fs::File::open(path)?;
        collection.load_ndjson(BufReader::new(file))?;
    }
    let authorizer = StaticTokenAuthorizer::new(app.admin_tokens.iter().cloned());
    Ok(QueryEngine::try_new(Arc::new(collection), Arc::new(authorizer), cfg)?)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (app, cfg) = load_config(cli.config.as_ref())?;
    match &app.log_config {
        Some(p) => logger::init_path(p)?,
        None => logger::configure_from_env()?,
    }
    apply_telemetry(&app);
    let engine = build_engine(&cli, &app, cfg)?;
    let cmd = match cli.command {
        Commands::Find { request, lean } => prog_cli::Command::Find { request, lean },
        Commands::FindOne { request, lean } => prog_cli::Command::FindOne { request, lean },
        Commands::FindById { id, request, lean } => prog_cli::Command::FindById { id, request, lean },
    };
    let out = prog_cli::run(&engine, cmd, cli.credential.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
