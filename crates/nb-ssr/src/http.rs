//! HTTP surface of the SSR bridge.
//!
//! Two routes, mounted into the host dev server's router; every other path
//! falls through to the host. The render endpoint speaks JSON both ways and
//! answers preflight itself, so the backend framework can call it from any
//! origin without extra server configuration.

use crate::bridge::SsrBridge;
use crate::error::SsrError;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, response::Builder, Method, StatusCode},
    response::Response,
    routing::{any, get},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Build the bridge's router using the configured endpoint paths.
pub fn router(bridge: Arc<SsrBridge>) -> Router {
    let render_path = bridge.config().path.clone();
    let health_path = bridge.config().health_path.clone();

    Router::new()
        .route(&render_path, any(render_route))
        .route(&health_path, get(health_route))
        .with_state(bridge)
}

async fn render_route(
    State(bridge): State<Arc<SsrBridge>>,
    method: Method,
    body: Bytes,
) -> Response {
    handle_render(&bridge, method, body).await
}

async fn health_route(State(bridge): State<Arc<SsrBridge>>) -> Response {
    handle_health(&bridge)
}

/// Render endpoint: `OPTIONS` preflight, `POST` render, `405` otherwise.
pub(crate) async fn handle_render(bridge: &SsrBridge, method: Method, body: Bytes) -> Response {
    match method {
        Method::OPTIONS => with_cors(Response::builder().status(StatusCode::OK))
            .body(Body::empty())
            .unwrap(),
        Method::POST => match render_request(bridge, &body).await {
            Ok(result) => json_response(
                StatusCode::OK,
                &json!({ "success": true, "result": result }),
            ),
            Err(e) => {
                tracing::warn!("SSR render request failed: {e}");
                json_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_error_body())
            }
        },
        _ => with_cors(Response::builder().status(StatusCode::METHOD_NOT_ALLOWED))
            .body(Body::empty())
            .unwrap(),
    }
}

async fn render_request(bridge: &SsrBridge, body: &[u8]) -> Result<Value, SsrError> {
    let page: Value = serde_json::from_slice(body)?;
    bridge.render(page).await
}

/// Health endpoint: `{"status":"ok","ready":…,"mode":"vite-plugin"}`.
pub(crate) fn handle_health(bridge: &SsrBridge) -> Response {
    let body = json!({
        "status": "ok",
        "ready": bridge.is_ready(),
        "mode": "vite-plugin",
    });
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cors(builder: Builder) -> Builder {
    builder
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    with_cors(Response::builder().status(status))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::test_support::{bridge_with, RunnerBehavior};
    use nb_core::RenderFailure;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn render_round_trip() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Render(
            json!({"head": [], "body": "<div>Test</div>"}),
        ));
        let request = r#"{"component":"Home","props":{},"url":"/","version":"v1"}"#;

        let response = handle_render(&bridge, Method::POST, Bytes::from(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({"success": true, "result": {"head": [], "body": "<div>Test</div>"}})
        );
    }

    #[tokio::test]
    async fn render_errors_produce_structured_500s() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Failing(RenderFailure::with_stack(
            "boom",
            "at render (ssr_dev.ts:1:1)",
        )));

        let response = handle_render(&bridge, Method::POST, Bytes::from("{}")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["message"], json!("boom"));
        assert!(!body["error"]["stack"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_failures_surface_per_request() {
        let (bridge, _log) = bridge_with(RunnerBehavior::NoRenderExport);

        let response = handle_render(&bridge, Method::POST, Bytes::from("{}")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("render"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_request_level_error() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Render(json!({})));

        let response = handle_render(&bridge, Method::POST, Bytes::from("{not json")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Render(json!({})));

        let response = handle_render(&bridge, Method::GET, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = handle_render(&bridge, Method::PUT, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn options_preflight_is_empty_with_cors() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Render(json!({})));

        let response = handle_render(&bridge, Method::OPTIONS, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "POST, OPTIONS"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn health_reflects_cache_state() {
        let (bridge, _log) = bridge_with(RunnerBehavior::Render(json!({})));

        let body = body_json(handle_health(&bridge)).await;
        assert_eq!(
            body,
            json!({"status": "ok", "ready": false, "mode": "vite-plugin"})
        );

        bridge.load().await.unwrap();
        let body = body_json(handle_health(&bridge)).await;
        assert_eq!(body["ready"], json!(true));
    }
}
