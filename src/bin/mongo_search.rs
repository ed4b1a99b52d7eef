use clap::{Parser, Subcommand};
use mongo_search::access::CallerContext;
use mongo_search::config::{AppConfig, load_config};
use mongo_search::gateway::{DEFAULT_LIMIT, SearchRequest};
use mongo_search::server::{AppState, run_server};
use mongo_search::logger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mongo-search", version, about = "Permission-filtered search gateway", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, the default locations are searched.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Settings JSON file. Takes precedence over config/env.")]
    settings: Option<PathBuf>,
    #[arg(long, help = "Directory of <kind>.ndjson seed files. Takes precedence over config/env.")]
    seed_dir: Option<PathBuf>,
    #[arg(long, help = "Log level: error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the HTTP API")]
    Serve {
        #[arg(long, help = "Address to bind, e.g. 127.0.0.1:8080")]
        bind: Option<String>,
    },
    #[command(about = "Print the current allow-list as JSON")]
    Allowed {
        #[arg(long, help = "Print the built-in default instead")]
        default: bool,
    },
    #[command(name = "set-allowed", about = "Validate and persist a new allow-list")]
    SetAllowed {
        #[arg(help = "Allow-list JSON, e.g. '{\"item\": [\"name\", \"size\"]}'")]
        json: String,
    },
    #[command(about = "Run one search and print the results as JSON")]
    Search {
        #[arg(long = "type", help = "Collection kind: user, collection, folder or item")]
        kind: String,
        #[arg(long, help = "Query as a JSON object")]
        q: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, help = "Bearer token identifying the caller; anonymous when omitted")]
        token: Option<String>,
    },
}

fn apply_cli(cfg: &mut AppConfig, cli: &Cli) {
    if let Some(p) = &cli.settings {
        cfg.settings_path = Some(p.clone());
    }
    if let Some(p) = &cli.seed_dir {
        cfg.seed_dir = Some(p.clone());
    }
    if let Some(l) = &cli.log_level {
        cfg.log_level = Some(l.clone());
    }
    if let Commands::Serve { bind: Some(b) } = &cli.command {
        cfg.bind = Some(b.clone());
    }
}

fn init_logging(cfg: &AppConfig) {
    let res = match &cfg.log_config {
        Some(p) => logger::init_path(p),
        None => logger::configure_logging(cfg.log_dir.as_deref(), cfg.log_level.as_deref(), None),
    };
    if let Err(e) = res {
        eprintln!("warning: logging not initialized: {e}");
    }
}

fn print_json(v: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

async fn run(cli: Cli, cfg: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Local commands run with the operator's own file access, so they act as an administrator.
    let operator = CallerContext::administrator("cli");
    match cli.command {
        Commands::Serve { .. } => run_server(&cfg).await,
        Commands::Allowed { default } => {
            let state = AppState::from_config(&cfg)?;
            print_json(&state.admin.get_allowed(&operator, default)?.to_value())
        }
        Commands::SetAllowed { json } => {
            let value: serde_json::Value = serde_json::from_str(&json)?;
            let state = AppState::from_config(&cfg)?;
            print_json(&state.admin.set_allowed(&operator, &value)?.to_value())
        }
        Commands::Search { kind, q, limit, offset, token } => {
            let state = AppState::from_config(&cfg)?;
            let caller = state.auth.authenticate(token.as_deref());
            let req = SearchRequest::new(kind, q).with_limit(limit).with_offset(offset);
            let docs = state.gateway.search(&caller, &req)?;
            let out: Vec<serde_json::Value> =
                docs.into_iter().map(|d| bson::Bson::Document(d).into_relaxed_extjson()).collect();
            print_json(&serde_json::Value::Array(out))
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    apply_cli(&mut cfg, &cli);
    init_logging(&cfg);
    if let Err(e) = run(cli, cfg).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
