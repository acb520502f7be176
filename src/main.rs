//! Trailhunt Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trailhunt_back::{
    config::AppConfig,
    dao::hunt_store::memory::MemoryHuntStore,
    media::{MediaStore, cloudinary::CloudinaryMediaStore},
    routes,
    services::submission_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config, build_media_store());

    install_storage(app_state.clone()).await;
    // Stuck `uploading` placeholders are swept to `upload_failed` in the
    // background for the lifetime of the process.
    tokio::spawn(submission_service::run_reconciliation(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the media upload adapter from the environment, or run without photo
/// support when it is not configured.
fn build_media_store() -> Option<Arc<dyn MediaStore>> {
    match CloudinaryMediaStore::from_env() {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(error = %err, "photo uploads disabled");
            None
        }
    }
}

/// Select and install the storage backend.
///
/// `HUNT_STORE=memory` runs fully in-process; anything else supervises a
/// MongoDB connection in the background, leaving the app degraded until the
/// database answers.
async fn install_storage(state: SharedState) {
    let backend = env::var("HUNT_STORE").unwrap_or_else(|_| "mongo".into());

    if backend == "memory" {
        info!("using in-memory hunt store");
        state
            .install_hunt_store(Arc::new(MemoryHuntStore::new()))
            .await;
        return;
    }

    #[cfg(feature = "mongo-store")]
    spawn_mongo_supervisor(state);

    #[cfg(not(feature = "mongo-store"))]
    {
        warn!("built without mongo-store; falling back to the in-memory hunt store");
        state
            .install_hunt_store(Arc::new(MemoryHuntStore::new()))
            .await;
    }
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) {
    use trailhunt_back::{
        dao::hunt_store::{
            HuntStore,
            mongodb::{MongoConfig, MongoHuntStore},
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state, || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoHuntStore::connect(config).await?;
        Ok(Arc::new(store) as Arc<dyn HuntStore>)
    }));
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
