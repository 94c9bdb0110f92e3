use std::{path::Path, sync::Arc};

use abs_player::{
    AppContext, app_api,
    config::Config,
    player::audio::SimulatedOutput,
    storage::{SeaOrmStateRepo, StateRepo},
};
use anyhow::Context;
use migration::MigratorTrait;
use poem::{
    EndpointExt, Route, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use poem_openapi::OpenApiService;
use sea_orm::Database;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type AbsPlayerResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> AbsPlayerResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,reqwest=warn,h2=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ABS player");

    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let db_conn = Database::connect(&config.db_connection_string)
        .await
        .with_context(|| "Failed to connect to database")?;

    migration::Migrator::up(&db_conn, None)
        .await
        .with_context(|| "Failed to run database migrations")?;

    let repo: Arc<dyn StateRepo> = Arc::new(SeaOrmStateRepo::new(db_conn));
    let app = AppContext::restore(repo, Arc::new(SimulatedOutput), config.app_settings())
        .await
        .with_context(|| "Failed to restore persisted state")?;

    run_poem(Arc::new(app), &config).await
}

pub async fn run_poem(app: Arc<AppContext>, config: &Config) -> AbsPlayerResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let api = app_api::AbsPlayerApi { app: app.clone() };
    let api_service = OpenApiService::new(api, "ABS Player API", version)
        .server(format!("http://{}", config.bind_addr));
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    let route = Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
        .with(Cors::new())
        .with(PoemTracing);

    tracing::info!(bind_addr = %config.bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(config.bind_addr.as_str()))
        .run_with_graceful_shutdown(
            route,
            async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown requested");
            },
            Some(std::time::Duration::from_secs(5)),
        )
        .await?;

    // flush the open player's position before exiting
    app.close_player().await;
    Ok(())
}
