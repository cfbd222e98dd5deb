use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use streamserver::api::{ApiServer, ApiServerConfig, AppState, normalize_address};
use streamserver::config::cli::Args;
use streamserver::config::{AppConfig, AppPaths};
use streamserver::credentials::{CachedCredential, Credential};
use streamserver::gateway::{HttpGateway, UpstreamGateway};
use streamserver::monitor::MonitorEventBroadcaster;
use streamserver::scheduler::{MonitorState, Orchestrator, OrchestratorConfig, SharedState};
use streamserver::utils::http_client::{DEFAULT_REQUEST_TIMEOUT, build_client};
use streamserver::{logging, panic_hook};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let paths = AppPaths::resolve(
        args.config_dir.clone(),
        args.cache_dir.clone(),
        args.log_dir.clone(),
    )?;

    // Keep the guard alive for the program lifetime.
    let _log_guard = logging::init_logging(&paths.log_dir)?;
    panic_hook::install(&paths.log_dir);

    let shutdown = CancellationToken::new();
    logging::start_retention_cleanup(paths.log_dir.clone(), shutdown.clone());

    info!(version = env!("CARGO_PKG_VERSION"), "Starting streamserver");

    let result = run(args, &paths).await;
    shutdown.cancel();

    if let Err(e) = &result {
        error!(error = %e, "streamserver stopped with an error");
    }
    result
}

async fn run(args: Args, paths: &AppPaths) -> anyhow::Result<()> {
    let config = AppConfig::load_or_init(&paths.config_file())?;
    let mut credential = config.credential();
    let cache_file = paths.credential_cache_file();
    if args.use_cache {
        load_credential_cache(&cache_file, &mut credential);
    }

    let client = build_client(DEFAULT_REQUEST_TIMEOUT)?;
    let gateway: Arc<dyn UpstreamGateway> = Arc::new(HttpGateway::new(client));
    let state = MonitorState::new(credential).into_shared();

    let mut orchestrator = Orchestrator::new(
        gateway.clone(),
        state.clone(),
        OrchestratorConfig {
            interval: args.refresh,
            secondary_enabled: !args.no_secondary,
        },
    );
    if args.log_transitions {
        let broadcaster = MonitorEventBroadcaster::new();
        spawn_transition_logger(broadcaster.subscribe());
        orchestrator = orchestrator.with_listener(Arc::new(broadcaster));
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    orchestrator.bootstrap().await?;
    orchestrator.check(false).await?;

    let delivery = CancellationToken::new();
    let server = spawn_server(&args, &orchestrator, gateway, delivery.clone());

    orchestrator.run(cancel, delivery).await?;

    if let Some(server) = server
        && let Err(e) = server.await
    {
        warn!(error = %e, "API server task failed");
    }

    save_credential_cache(&cache_file, &state).await?;
    info!("streamserver stopped");
    Ok(())
}

fn load_credential_cache(path: &Path, credential: &mut Credential) {
    match CachedCredential::load(path) {
        Ok(cached) => {
            if cached.apply_to(credential) {
                info!(path = %path.display(), "Using cached credentials");
            }
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Could not read credential cache"),
    }
}

async fn save_credential_cache(path: &Path, state: &SharedState) -> streamserver::Result<()> {
    let cached = CachedCredential::from_credential(&state.lock().await.credential);
    cached.save(path)?;
    info!(path = %path.display(), "Saved credential cache");
    Ok(())
}

fn spawn_server(
    args: &Args,
    orchestrator: &Orchestrator,
    gateway: Arc<dyn UpstreamGateway>,
    delivery: CancellationToken,
) -> Option<JoinHandle<()>> {
    let Some(address) = normalize_address(&args.address) else {
        warn!("No address configured, not serving stream data");
        return None;
    };

    let app_state = AppState::new(
        orchestrator.state(),
        orchestrator.refresh_handle(),
        gateway,
        &args.redirect_uri,
        orchestrator.interval(),
    );
    let config = ApiServerConfig {
        address,
        ..Default::default()
    };
    let server = ApiServer::new(config, app_state, delivery);

    Some(tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "API server stopped");
        }
    }))
}

fn spawn_transition_logger(mut events: broadcast::Receiver<streamserver::monitor::MonitorEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!("{}", event.description()),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Transition logger lagged {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
