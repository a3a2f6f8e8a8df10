//! Beat League Back binary entrypoint wiring the HTTP API and the scheduler.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod collab;
mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use collab::dev::{DevChat, DevMetadata, DevRewards, DevThemes};
use config::AppConfig;
use dao::memory::MemoryStore;
use dao::models::CompetitionRecord;
use state::week::WeekId;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    // The built-in adapters log instead of talking to a real platform; swap
    // them for platform implementations when embedding.
    let app_state = AppState::new(
        MemoryStore::shared(),
        Arc::new(DevChat::permissive()),
        Arc::new(DevThemes),
        Arc::new(DevRewards::succeeding()),
        Arc::new(DevMetadata),
    );

    seed_communities(&app_state, &config).await?;
    tokio::spawn(services::scheduler::run(
        app_state.clone(),
        config.tick_interval(),
    ));

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

/// Register the configured communities, leaving already-known ones untouched.
///
/// Fresh communities get a record pointing at last week, so the scheduler
/// starts their first round on the next start day.
async fn seed_communities(state: &SharedState, config: &AppConfig) -> anyhow::Result<()> {
    let bootstrap_week = WeekId::of(OffsetDateTime::now_utc()).prev();
    for (community, community_config) in config.communities() {
        state
            .store()
            .save_config(community.clone(), community_config.clone())
            .await
            .context("seeding community config")?;
        if state
            .store()
            .load_competition(community.clone())
            .await
            .context("checking community state")?
            .is_none()
        {
            state
                .store()
                .save_competition(community.clone(), CompetitionRecord::inactive(bootstrap_week))
                .await
                .context("seeding community state")?;
        }
        info!(%community, "community registered");
    }
    Ok(())
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
