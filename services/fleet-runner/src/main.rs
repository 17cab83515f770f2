//! Lightworker fleet runner
//!
//! Single-binary service that:
//! 1. Loads config, the account list and the proxy list
//! 2. Starts one supervisor per account, each with its own egress
//! 3. Keeps every account authenticated, connected and heartbeating
//! 4. Optionally serves /health and /metrics
//! 5. Closes every session once on SIGINT/SIGTERM

mod admin;
mod banner;
mod config;
mod inputs;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet::{Fleet, RewardsApi, ShutdownCoordinator};
use rewards_api::RewardsClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker_session::WsConnector;

use crate::config::Config;

/// How long supervisors get to close their sessions after the signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// All accounts share one cooperative thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    banner::print();
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "fatal startup error");
        return Err(e);
    }
    Ok(())
}

/// Tracing with `LOG_LEVEL` / `RUST_LOG` filtering; JSON output when
/// `LOG_FORMAT=json`, compact text otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
}

async fn run() -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting lightworker-fleet");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install metrics recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(
        path = %config_path.path.display(),
        explicit = config_path.explicit,
        "loading configuration"
    );
    let config = Config::load(&config_path).with_context(|| {
        format!(
            "failed to load config from {}",
            config_path.path.display()
        )
    })?;
    info!(
        auth_base_url = %config.endpoints.auth_base_url,
        rewards_base_url = %config.endpoints.rewards_base_url,
        ws_base_url = %config.endpoints.ws_base_url,
        worker_host = %config.worker.host,
        "configuration loaded"
    );

    let addresses = inputs::read_accounts(&config.inputs.accounts_file)
        .context("cannot start without accounts")?;
    let slots = inputs::read_proxies(&config.inputs.proxies_file)?;
    let accounts = fleet::plan_accounts(addresses, &slots)?;

    let shutdown = ShutdownCoordinator::new();
    let endpoints = config.endpoints();
    let timeout = config.timings.http_timeout();
    let retry = config.retry.policy();

    let fleet = Fleet::start(
        accounts,
        &config.supervisor(),
        Arc::new(WsConnector::new()),
        &shutdown,
        |account| {
            let client =
                RewardsClient::new(endpoints.clone(), account.egress.as_ref(), timeout, retry)?;
            Ok(Arc::new(client) as Arc<dyn RewardsApi>)
        },
    )
    .context("failed to start fleet")?;

    let admin = match config.admin.listen_addr {
        Some(addr) => Some(
            admin::spawn(
                addr,
                admin::AdminState::new(fleet.statuses(), prometheus),
                shutdown.register(),
            )
            .await?,
        ),
        None => None,
    };

    shutdown_signal().await;
    let health = fleet.health();
    info!(
        status = health.status,
        connected = health.connected,
        total = health.total,
        "fleet state at shutdown"
    );
    shutdown.trigger();

    // Drain: every supervisor closes its session; bounded so a stuck
    // request cannot block exit.
    let drain = async {
        fleet.wait().await;
        if let Some(admin) = admin {
            let _ = admin.await;
        }
    };
    match tokio::time::timeout(DRAIN_TIMEOUT, drain).await {
        Ok(()) => info!("all sessions closed"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT. Installed once for the whole process.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
