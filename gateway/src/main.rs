use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;

fn app() -> Router {
    let tasking_routes = Router::new().route("/simulate", post(routes::simulate));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", tasking_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "orbital_tasking_gateway=debug,tasking_engine=info,info".into(),
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("TASKING_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18602".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("🛰️  Tasking Gateway starting on {}", addr);
    tracing::info!("   POST /api/v1/simulate");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app()).await?;

    Ok(())
}
