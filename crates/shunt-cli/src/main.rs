use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::ShuntConfig;

#[derive(Parser)]
#[command(name = "shunt")]
#[command(version)]
#[command(about = "Shunt — a rule-driven AI request gateway")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Start,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Start => cmd_start(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    // Create uploads directory
    let uploads = config_dir.join("uploads");
    tokio::fs::create_dir_all(&uploads).await?;

    println!("Shunt initialized at {}", config_dir.display());
    println!(
        "Edit {} to change the bind address or storage paths.",
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ShuntConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_start(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ShuntConfig::load(config_path)?;
    info!("Starting Shunt gateway...");

    let db_path = shellexpand(&cfg.storage.db_path);
    let uploads_dir = shellexpand(&cfg.storage.uploads_dir);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&uploads_dir)?;

    let db = Arc::new(
        shunt_store::RuleDb::new(&db_path).context("Failed to initialize rule database")?,
    );
    db.seed_default_models().await?;

    let bind: std::net::SocketAddr = format!("{}:{}", cfg.server.bind, cfg.server.port)
        .parse()
        .with_context(|| {
            format!("Invalid bind address {}:{}", cfg.server.bind, cfg.server.port)
        })?;

    let server = shunt_gateway::GatewayServer::new(bind, db, uploads_dir);
    let mut handle = server.spawn();

    println!("Shunt is running on http://{}. Press Ctrl+C to stop.", bind);

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            handle.abort();
        }
        res = &mut handle => {
            res.context("Gateway task failed")??;
        }
    }

    println!("Shunt stopped.");
    Ok(())
}

// Utility: expand ~ in paths
fn shellexpand(s: &str) -> PathBuf {
    let mut result = s.to_string();
    if result.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            result = format!("{}{}", home.display(), &result[1..]);
        }
    }
    PathBuf::from(result)
}
