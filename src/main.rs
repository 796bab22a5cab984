use anyhow::Context;

use anime_recommender::{
    api::{create_router, AppState, RequestDefaults},
    config::Config,
    services::{Artifacts, Catalog},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;

    let (catalog, _) = Catalog::load(&config.catalog_path, &config.excluded_genres)
        .with_context(|| format!("Failed to load catalog from {}", config.catalog_path.display()))?;

    let artifacts = Artifacts::load(
        &config.user_recs_path(),
        &config.genre_recs_path(),
        &config.discover_path(),
    )
    .with_context(|| {
        format!(
            "Failed to load artifacts from {}; run `precompute` first",
            config.artifacts_dir.display()
        )
    })?;

    let state = AppState::new(
        catalog,
        artifacts.cooccurrence,
        artifacts.genre_index,
        artifacts.discover,
        RequestDefaults::from(&config),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
