//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::client::ControlPlane;
use crate::exposition;
use crate::translator::SharedTranslator;

/// Application state shared across handlers.
struct AppState<C> {
    translator: SharedTranslator<C>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            translator: Arc::clone(&self.translator),
        }
    }
}

/// Create the HTTP router.
pub fn create_router<C: ControlPlane>(translator: SharedTranslator<C>, metrics_path: &str) -> Router {
    let state = AppState { translator };

    Router::new()
        .route(metrics_path, get(metrics_handler::<C>))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint. Every request is a full scrape.
async fn metrics_handler<C: ControlPlane>(State(state): State<AppState<C>>) -> Response {
    match state.translator.render().await {
        Ok(set) => {
            debug!(samples = set.sample_count(), "Serving scrape");
            (
                StatusCode::OK,
                [(CONTENT_TYPE, exposition::CONTENT_TYPE)],
                exposition::encode(&set),
            )
                .into_response()
        }
        Err(e) => {
            error!(resource = %e.resource, error = %e, "Scrape failed");
            (StatusCode::BAD_GATEWAY, format!("scrape failed: {}\n", e)).into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer<C> {
    translator: SharedTranslator<C>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl<C: ControlPlane> HttpServer<C> {
    /// Create a new HTTP server.
    pub fn new(translator: SharedTranslator<C>, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            translator,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.translator, &self.metrics_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Resource;
    use crate::testing::StaticControlPlane;
    use crate::translator::Translator;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_router(plane: StaticControlPlane, path: &str) -> Router {
        create_router(Arc::new(Translator::new(plane)), path)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = make_router(StaticControlPlane::fixture(), "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_text(response).await;
        assert!(body.contains("core_started 1\n"));
        assert!(body.contains("user_lifetime_used_traffic_bytes{username=\"alice\"} 12345\n"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_upstream_failure() {
        let plane = StaticControlPlane::fixture().failing(Resource::Users, 500);
        let router = make_router(plane, "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_text(response).await;
        assert!(body.contains("users"));
        assert!(!body.contains("node_uplink_bytes"));
        assert!(!body.contains("# TYPE"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let plane = StaticControlPlane::fixture().failing(Resource::Nodes, 500);
        let router = make_router(plane, "/metrics");

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // Liveness does not depend on the control plane.
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let router = make_router(StaticControlPlane::fixture(), "/prometheus/metrics");

        let response = router
            .clone()
            .oneshot(
                Request::get("/prometheus/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_each_request_scrapes_again() {
        let translator = Arc::new(Translator::new(StaticControlPlane::fixture()));
        let router = create_router(translator.clone(), "/metrics");

        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(translator.client().calls().len(), 2 * Resource::ALL.len());
    }
}
