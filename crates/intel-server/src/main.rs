//! Intel server entry point (§6): wires up config, state and the HTTP
//! router, then serves until interrupted. Grounded on the original
//! `backend.main`'s `FastAPI` app, translated to axum's router/layer idiom
//! rather than the lifespan/exception-handler shape FastAPI uses.

mod config;
mod depth;
mod error;
mod middleware;
mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(app_env = %config.app_env, "system_startup");

    let state = AppState::from_config(&config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "listening");
    axum::serve(listener, app).await?;

    tracing::info!("system_shutdown");
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/events", get(routes::sse_events))
        .route("/api/intel/query", post(routes::query_intel))
        .route("/api/recommend-depth", post(routes::recommend_depth))
        .route("/api/completion", post(routes::complete))
        .route("/api/council/export", post(routes::export_council))
        .route("/api/council", get(routes::search_council))
        .layer(axum::middleware::from_fn(middleware::correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
        ServerConfig {
            app_env: "test".to_string(),
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            exa_api_key: String::new(),
            tavily_api_key: String::new(),
            firecrawl_api_key: String::new(),
            jina_api_key: String::new(),
            openrouter_api_key: String::new(),
            cache_redis_url: "redis://127.0.0.1:6379/0".to_string(),
            knowledge_redis_url: "redis://127.0.0.1:6379/1".to_string(),
        }
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let state = AppState::from_config(&test_config());
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn unknown_route_is_a_404() {
        let state = AppState::from_config(&test_config());
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
