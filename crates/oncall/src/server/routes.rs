use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::{alert::AlertId, manager::OnCallManager, metrics::gather_metrics, Severity};

type AppState = State<Arc<OnCallManager>>;

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAlertResponse {
    pub id: AlertId,
}

/// Body of acknowledge/resolve requests.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub by: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn metrics() -> Response {
    match gather_metrics() {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn create_alert(State(manager): AppState, Json(request): Json<CreateAlertRequest>) -> Response {
    let severity: Severity = match request.severity.parse() {
        Ok(severity) => severity,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    info!(severity = %severity, title = %request.title, "Received alert");

    match manager
        .create_alert(severity, &request.title, &request.description, &request.source)
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(CreateAlertResponse { id })).into_response(),
        Err(e) => {
            error!("Failed to create alert: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn list_alerts(State(manager): AppState) -> Response {
    Json(manager.get_active_alerts().await).into_response()
}

pub async fn get_alert(State(manager): AppState, Path(id): Path<AlertId>) -> Response {
    match manager.get_alert(id).await {
        Some(alert) => Json(alert).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Alert {} not found", id)),
    }
}

pub async fn acknowledge_alert(
    State(manager): AppState,
    Path(id): Path<AlertId>,
    Json(request): Json<ActorRequest>,
) -> Response {
    if manager.acknowledge_alert(id, &request.by).await {
        Json(json!({ "success": true })).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Alert {} not found", id))
    }
}

pub async fn resolve_alert(
    State(manager): AppState,
    Path(id): Path<AlertId>,
    Json(request): Json<ActorRequest>,
) -> Response {
    if manager.resolve_alert(id, &request.by).await {
        Json(json!({ "success": true })).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Alert {} not found", id))
    }
}

pub async fn current_on_call(State(manager): AppState, Path(schedule_id): Path<String>) -> Response {
    match manager.get_current_on_call(&schedule_id) {
        Some(person) => Json(person).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No one on call for schedule {}", schedule_id),
        ),
    }
}

pub async fn next_rotation(State(manager): AppState, Path(schedule_id): Path<String>) -> Response {
    match manager.get_next_rotation(&schedule_id) {
        Some(rotation) => Json(rotation).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No rotation for schedule {}", schedule_id),
        ),
    }
}
