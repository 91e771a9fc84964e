use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use policy_control_plane::{app, ApiDoc, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::build(&config).await?;

    let _sweeper = state
        .sync
        .clone()
        .spawn_staleness_sweeper(config.sync_poll_interval);

    let openapi = ApiDoc::openapi();
    let app = app(state).route(
        "/openapi.json",
        axum::routing::get(move || async { axum::Json(openapi) }),
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("policy-control-plane listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
