use std::sync::Arc;

use clap::Parser;
use lighthouse_core::{HttpBackend, LighthouseConfig, LighthouseError, TraceBackend};
use lighthouse_dashboard::{reporter, startup, Dashboard};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Lighthouse dashboard: trace sync and hallucination checks", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "lighthouse.toml")]
    config: String,

    /// Backend base URL (overrides [backend] base_url)
    #[arg(long, env = "LIGHTHOUSE_BACKEND_URL")]
    backend_url: Option<String>,

    /// Project to follow (overrides [sync] project_id)
    #[arg(long)]
    project: Option<String>,

    /// Probe the backend and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let mut config = match LighthouseConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }
    if args.project.is_some() {
        config.sync.project_id = args.project;
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let backend: Arc<dyn TraceBackend> = Arc::new(HttpBackend::new(&config.backend)?);

    match startup::wait_for_backend(backend.as_ref(), &config.startup).await {
        Ok(()) => {
            if args.health {
                println!("✅ Backend reachable at {}", config.backend.base_url);
                return Ok(());
            }
        }
        Err(LighthouseError::AuthRequired) => {
            eprintln!(
                "❌ Backend at {} requires authentication, but no credentials are sent. \
                 Allow unauthenticated access to the trace API for local use.",
                config.backend.base_url
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Backend at {} unreachable: {}", config.backend.base_url, e);
            std::process::exit(1);
        }
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let dashboard = Dashboard::new(backend, &config);
    let connected = dashboard.connections().refresh().await;
    match dashboard.connections().primary() {
        Some(primary) => tracing::info!(
            connected,
            connection_id = %primary.id,
            name = %primary.name,
            "Hallucination checks will use the first connected database"
        ),
        None => tracing::info!("No connected database; traces will not be checked"),
    }

    let scope = dashboard.switch_project(config.sync.project_id.clone());
    let reporter = tokio::spawn(reporter::run_reporter(scope, tx.subscribe()));

    let mut shutdown = tx.subscribe();
    let _ = shutdown.recv().await;

    dashboard.stop();
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "Reporter task ended abnormally");
    }

    Ok(())
}
