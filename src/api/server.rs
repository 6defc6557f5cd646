//! API Server module
//!
//! This module provides the HTTP API server functionality for the stepwise
//! tool. It is a thin adapter: payloads go to the core untyped, results come
//! back structured, and validation failures map to the shared failure shape.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::models::{Core, Failure, Recorded, Step, StepInput};
use crate::render::Renderer;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// Shared handler state: the history handle plus the optional renderer.
#[derive(Clone)]
pub struct AppState {
    core: Core,
    renderer: Renderer,
}

impl AppState {
    pub fn new(core: Core, renderer: Renderer) -> Self {
        Self { core, renderer }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Snapshot of the branch label set
#[derive(Serialize, Deserialize)]
pub struct BranchesResponse {
    pub branches: Vec<String>,
}

/// Builds the application router; split out so tests can drive it in-process.
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/steps", post(record_step).get(list_steps))
        .route("/api/branches", get(list_branches))
        .route("/api/reset", post(reset))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// POST /api/steps — the single stateful operation.
///
/// The body is taken as an untyped JSON value so that unrecognized shapes
/// flow through the core's schema error path rather than axum's extractor.
async fn record_step(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let result = StepInput::from_value(payload).and_then(crate::models::validate);

    match result {
        Ok(step) => {
            let recorded = state.core.record(step.clone());
            // Rendering runs only after a successful record and never gates it
            state.renderer.render(&step);
            (StatusCode::OK, Json(ApiResponse::success(recorded))).into_response()
        }
        Err(err) => {
            let failure = Failure::from(&err);
            tracing::debug!(kind = err.kind(), "rejected step: {}", failure.error);
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<Recorded>::error(failure.error)),
            )
                .into_response()
        }
    }
}

async fn list_steps(State(state): State<AppState>) -> Json<ApiResponse<Vec<Step>>> {
    Json(ApiResponse::success(state.core.steps()))
}

async fn list_branches(State(state): State<AppState>) -> Json<ApiResponse<BranchesResponse>> {
    Json(ApiResponse::success(BranchesResponse {
        branches: state.core.branch_labels(),
    }))
}

/// POST /api/reset — explicit operator action, never implicit.
async fn reset(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.core.reset();
    Json(ApiResponse::success(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt; // for `collect`
    use serde_json::json;
    use tower::ServiceExt; // for `oneshot`

    fn setup_test_app() -> (Core, Router) {
        let core = Core::new();
        let state = AppState::new(core.clone(), Renderer::new(false));
        (core, router(state))
    }

    async fn post_step(app: &Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/steps")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_record_step_success() {
        let (_core, app) = setup_test_app();

        let (status, body) = post_step(
            &app,
            json!({
                "text": "start",
                "sequenceNeeded": true,
                "index": 1,
                "estimatedTotal": 3
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["index"], json!(1));
        assert_eq!(body["data"]["estimatedTotal"], json!(3));
        assert_eq!(body["data"]["historyLength"], json!(1));
        // Absent optional fields are omitted, not null
        assert!(body["data"].get("isRevision").is_none());
    }

    #[tokio::test]
    async fn test_record_step_schema_failure() {
        let (core, app) = setup_test_app();

        let (status, body) = post_step(
            &app,
            json!({
                "text": "",
                "sequenceNeeded": true,
                "index": 1,
                "estimatedTotal": 1
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("text: must not be empty"));
        assert_eq!(core.history_len(), 0, "failed call must not mutate");
    }

    #[tokio::test]
    async fn test_record_step_unrecognized_shape() {
        let (core, app) = setup_test_app();

        let (status, body) = post_step(&app, json!({"index": "five"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("unrecognized payload"));
        assert_eq!(core.history_len(), 0);
    }

    #[tokio::test]
    async fn test_branch_flow_and_listing() {
        let (_core, app) = setup_test_app();

        post_step(
            &app,
            json!({"text": "one", "sequenceNeeded": true, "index": 1, "estimatedTotal": 4}),
        )
        .await;
        post_step(
            &app,
            json!({"text": "two", "sequenceNeeded": true, "index": 2, "estimatedTotal": 4}),
        )
        .await;
        let (status, body) = post_step(
            &app,
            json!({
                "text": "branch",
                "sequenceNeeded": false,
                "index": 4,
                "estimatedTotal": 4,
                "branchPoint": 2,
                "branchLabel": "alt"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["branches"], json!(["alt"]));

        let branches = get_json(&app, "/api/branches").await;
        assert_eq!(branches["data"]["branches"], json!(["alt"]));

        let steps = get_json(&app, "/api/steps").await;
        assert_eq!(steps["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reset_endpoint() {
        let (core, app) = setup_test_app();

        post_step(
            &app,
            json!({"text": "one", "sequenceNeeded": true, "index": 1, "estimatedTotal": 1}),
        )
        .await;
        assert_eq!(core.history_len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(core.history_len(), 0);
    }
}
