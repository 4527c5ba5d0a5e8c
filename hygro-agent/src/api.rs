use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::registry::{DeviceRegistry, DeviceSnapshot, NodeSnapshot, RegistryError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InternalServerError(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownNode(_) | RegistryError::UnknownProperty { .. } => {
                ApiError::NotFound(e.to_string())
            }
            _ => ApiError::InternalServerError(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorResponse {
            success: false,
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub fn router(registry: DeviceRegistry) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/device", get(get_device))
        .route("/device/nodes/{name}", get(get_node))
        .with_state(registry)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn get_device(State(registry): State<DeviceRegistry>) -> Result<Json<DeviceSnapshot>, ApiError> {
    Ok(Json(registry.snapshot()?))
}

async fn get_node(
    State(registry): State<DeviceRegistry>,
    Path(name): Path<String>,
) -> Result<Json<NodeSnapshot>, ApiError> {
    let snapshot = registry.snapshot()?;
    snapshot
        .nodes
        .into_iter()
        .find(|n| n.descriptor.name == name)
        .map(Json)
        .ok_or(ApiError::NotFound(format!("unknown node: {name}")))
}
