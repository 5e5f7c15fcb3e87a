use std::sync::Arc;

use axum::http::HeaderValue;
use comanda_api::auth::Authenticator;
use comanda_api::config::{Config, ConfigError, StoreKind};
use comanda_api::model::ensure_collections;
use comanda_api::routes;
use comanda_api::state::AppState;
use comanda_seed::SeedConfig;
use comanda_store::{DocumentStore, MemoryStore, StoreError};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("store '{0}' is not compiled in; rebuild with the '{0}' feature")]
    Unsupported(&'static str),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "comanda-api stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    let cors_origin =
        HeaderValue::from_str(&config.cors_origin).map_err(|_| ConfigError::Invalid {
            var: "COMANDA_CORS_ORIGIN",
            value: config.cors_origin.clone(),
        })?;

    // the synchronous driver must not run on a runtime thread
    let store = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || prepare_store(&config)).await??
    };

    if config.accounts.is_empty() {
        warn!("no login accounts configured; every login will be rejected");
    }
    if !config.require_auth {
        warn!("bearer tokens are not enforced");
    }

    let state = AppState {
        store,
        auth: Arc::new(Authenticator::new(&config.secret, config.accounts.clone())),
        require_auth: config.require_auth,
    };
    let app = routes::router(state, cors_origin);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "comanda-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("comanda-api shut down");
    Ok(())
}

fn prepare_store(config: &Config) -> Result<Arc<dyn DocumentStore>, StartupError> {
    let store = open_store(&config.store)?;
    ensure_collections(store.as_ref())?;

    if let Some(usuarios) = config.seed {
        let report = comanda_seed::seed(
            store.as_ref(),
            &SeedConfig::scaled(usuarios),
            &mut rand::thread_rng(),
        )?;
        info!(?report, "store seeded");
    }
    Ok(store)
}

fn open_store(kind: &StoreKind) -> Result<Arc<dyn DocumentStore>, StartupError> {
    match kind {
        StoreKind::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "mongodb")]
        StoreKind::Mongo { uri, database } => Ok(Arc::new(comanda_store::MongoStore::connect(
            uri, database,
        )?)),
        #[cfg(not(feature = "mongodb"))]
        StoreKind::Mongo { .. } => Err(StartupError::Unsupported("mongodb")),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
