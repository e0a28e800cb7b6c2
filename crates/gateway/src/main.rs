//! Scout API Gateway
//!
//! The entry point for research requests.
//! Handles:
//! - Request routing and validation
//! - Streaming pipeline progress over SSE
//! - Observability (logging, metrics)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use scout_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics,
};
use scout_context::ResearchPipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<ResearchPipeline>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Configuration decides the log level, so load it first
    // APP_CONFIG_FILE replaces the config/ directory layering with one file
    let loaded = match std::env::var("APP_CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    init_tracing(&config.observability);

    info!("Starting Scout API Gateway v{}", scout_common::VERSION);

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    let pipeline = ResearchPipeline::from_config(&config)?;
    info!(
        search_engine = pipeline.search_engine(),
        model = pipeline.model_name(),
        "Research pipeline ready"
    );

    let state = AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let shutdown_timeout = state.config.shutdown_timeout();

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn install_metrics_exporter(port: u16) -> Result<(), BuildError> {
    let prefix = metrics::METRICS_PREFIX;

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_search_duration_seconds", prefix)),
            metrics::SEARCH_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", prefix)),
            metrics::GENERATION_BUCKETS,
        )?
        .install()
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/research", post(handlers::research::research))
        .route("/research/stream", post(handlers::research::research_stream))
        .route("/quality", post(handlers::research::quality));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler. In-flight requests get `drain_timeout`
/// to finish before the process exits.
async fn shutdown_signal(drain_timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }

    tokio::spawn(async move {
        tokio::time::sleep(drain_timeout).await;
        warn!(timeout_secs = drain_timeout.as_secs(), "Shutdown drain timed out, exiting");
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AppConfig::default();
        let pipeline = ResearchPipeline::from_config(&config).unwrap();
        create_router(AppState {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_degraded_backends() {
        let response = app()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["checks"]["search"]["engine"], "simulated");
        assert_eq!(json["checks"]["llm"]["status"], "offline");
    }

    #[tokio::test]
    async fn test_research_rejects_empty_query() {
        let response = app()
            .oneshot(post_json("/v1/research", serde_json::json!({ "query": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_research_with_simulated_backends() {
        let response = app()
            .oneshot(post_json("/v1/research", serde_json::json!({ "query": "rust ownership" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["has_mock_search"], true);
        assert_eq!(json["sources"].as_array().unwrap().len(), 0);
        assert_eq!(json["execution_plan"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_research_stream_ends_with_answer() {
        let response = app()
            .oneshot(post_json("/v1/research/stream", serde_json::json!({ "query": "rust ownership" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("event: thinking"));
        assert!(text.contains("event: mock_detected"));
        assert!(text.trim_end().rsplit("\n\n").next().unwrap().contains("event: answer"));
    }

    #[tokio::test]
    async fn test_quality_endpoint() {
        let body = serde_json::json!({
            "response": "See [5].",
            "sources": [
                { "id": "a", "title": "A", "url": "https://a.io", "snippet": "", "domain": "a.io" },
                { "id": "b", "title": "B", "url": "https://b.io", "snippet": "", "domain": "b.io" }
            ]
        });
        let response = app().oneshot(post_json("/v1/quality", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["score"], 45);
        assert_eq!(json["is_valid"], false);
    }
}
