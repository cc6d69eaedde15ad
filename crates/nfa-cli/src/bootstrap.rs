//! Wiring of settings, marketplace client, session store and server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use nfa_core::{DEFAULT_SWEEP_INTERVAL, MarketplacePort, ProxySettings, SessionStore};
use nfa_marketplace::{MarketplaceClient, MarketplaceClientConfig};
use nfa_proxy::passthrough::Passthrough;
use nfa_proxy::{ProxyState, serve};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::parser::Cli;

/// Environment files tried in order when none is given explicitly.
pub const DEFAULT_ENV_FILES: &[&str] = &[".env", ".env.test", ".env.example"];

/// Load an environment file.
///
/// With `explicit`, only that file is tried. Otherwise the first of
/// [`DEFAULT_ENV_FILES`] that loads wins. Returns the file that was loaded.
pub fn load_env_files(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => DEFAULT_ENV_FILES
            .iter()
            .find_map(|name| dotenvy::from_filename(name).ok()),
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `info`, or `debug` when `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Apply command-line overrides on top of environment settings.
pub fn apply_overrides(settings: &mut ProxySettings, cli: &Cli) {
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if cli.no_sweep {
        settings.sweep_enabled = false;
    }
}

/// Run the proxy until Ctrl+C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = load_env_files(cli.env_file.as_deref());
    init_tracing(cli.verbose);
    match (&loaded, &cli.env_file) {
        (Some(path), _) => info!(path = %path.display(), "Loaded environment file"),
        (None, Some(path)) => warn!(path = %path.display(), "Could not load environment file"),
        (None, None) => info!("No environment file found, using process environment"),
    }

    let mut settings = ProxySettings::from_env().context("failed to load configuration")?;
    apply_overrides(&mut settings, &cli);
    info!(
        consumer = %settings.consumer_node_url,
        marketplace = %settings.marketplace_url,
        port = settings.port,
        api_mode = %settings.api_mode,
        session_expiration_secs = settings.session_expiration.as_secs(),
        "Configuration loaded"
    );

    let client = MarketplaceClient::new(MarketplaceClientConfig::from_settings(&settings))
        .context("failed to build marketplace client")?;
    let marketplace: Arc<dyn MarketplacePort> = Arc::new(client);
    let sessions = Arc::new(SessionStore::new(
        Arc::clone(&marketplace),
        settings.session_expiration,
    ));
    let passthrough = Passthrough::new(&settings.marketplace_url)
        .context("failed to build passthrough client")?;
    let state = ProxyState::new(marketplace, Arc::clone(&sessions), passthrough);

    let cancel = CancellationToken::new();
    let sweeper = if settings.sweep_enabled {
        Some(sessions.spawn_sweeper(DEFAULT_SWEEP_INTERVAL, cancel.child_token()))
    } else {
        info!("Session sweep disabled, expired sessions are evicted on access");
        None
    };

    let addr = format!("{}:{}", cli.host, settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    serve(listener, state, cancel).await?;

    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    Ok(())
}
