//! Example consumer: a separate Rust project that serves declared entities through entity-core.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`

use axum::Router;
use entity_core::{common_routes, entity_routes, load_from_dir, resolve, AppState, EntityService};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("entity_core=info")),
        )
        .init();

    let config_dir = std::env::var("ENTITY_CONFIG_PATH").unwrap_or_else(|_| "config".into());
    let config = load_from_dir(&config_dir)?;
    let model = resolve(&config)?;
    let service = EntityService::from_model(model)?;
    tracing::info!(
        entities = ?service.registry().entity_names()?,
        policies = service.policies().len(),
        "entity model loaded from {}",
        config_dir
    );
    let state = AppState::new(service);

    let app = Router::new()
        .merge(common_routes())
        .nest("/api/v1", entity_routes(state));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
