/// Freqsync daemon - mirrors frequency-named directory entries into a
/// Realtime Database, one polling session per configured window
use clap::{Parser, Subcommand};
use freqsync_core::RemoteStore;
use freqsync_daemon::{AppConfig, DaemonError};
use freqsync_firebase::{load_secret, FirebaseClient, FirebaseConfig};
use freqsync_watch::SessionRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "freqsync-daemon")]
#[command(about = "Mirror frequency-named directory entries into a Realtime Database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every configured window and run until interrupted
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check the configuration without starting anything
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "freqsync_daemon=info,freqsync_watch=info,freqsync_firebase=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run(config.as_deref()).await?;
        }
        Commands::Validate { config } => {
            validate(config.as_deref())?;
        }
    }

    Ok(())
}

async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path)?;
    config.validate()?;

    tracing::info!("Starting freqsync daemon");
    tracing::info!("Database: {}", config.firebase_url);
    tracing::info!("Windows: {}", config.windows.len());

    let store = connect(&config).await?;
    let registry = SessionRegistry::new(store, config.root_path.clone());

    for session in config.session_configs()? {
        let name = session.name.clone();
        let directory = session.directory.clone();
        if let Err(e) = registry.create(session).await {
            // No partial fleet: wind down whatever already started
            registry.stop_all().await;
            return Err(DaemonError::from(e).into());
        }
        tracing::info!(
            "Window {} watching {}",
            name,
            directory.display()
        );
    }

    tracing::info!("All windows running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Interrupt received, stopping sessions");
    registry.stop_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn validate(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path)?;
    config.validate()?;
    let sessions = config.session_configs()?;

    println!("Configuration OK: {} window(s)", sessions.len());
    for session in sessions {
        println!(
            "  {} -> {} every {}s",
            session.name,
            session.directory.display(),
            session.interval.as_secs()
        );
    }

    Ok(())
}

/// Build the database client and verify it before any session starts.
async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteStore>> {
    let firebase_config = match &config.firebase_key_path {
        Some(path) => {
            let secret = load_secret(path).map_err(|e| DaemonError::Init(e.to_string()))?;
            FirebaseConfig::with_secret(&config.firebase_url, secret)
        }
        None => FirebaseConfig::new(&config.firebase_url),
    };

    let client =
        FirebaseClient::new(firebase_config).map_err(|e| DaemonError::Init(e.to_string()))?;
    client
        .probe()
        .await
        .map_err(|e| DaemonError::Init(format!("database probe failed: {e}")))?;
    tracing::info!("Database connection verified");

    Ok(Arc::new(client))
}
