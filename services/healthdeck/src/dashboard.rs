//! Operator JSON API: scheduler health, targets, notifications and actions

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::downtime::DowntimeManager;
use crate::engine::Engine;
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::target::TargetId;
use crate::HealthdeckError;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub engine: Arc<Engine>,
    pub scheduler: Arc<Scheduler>,
    pub downtime: Arc<DowntimeManager>,
    pub store: Arc<dyn Store>,
}

/// Build the dashboard axum router
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/targets", get(targets_handler))
        .route("/api/targets/{id}/notifications", get(notifications_handler))
        .route("/api/targets/{id}/downtime", post(downtime_handler))
        .route("/api/targets/{id}/resume", post(resume_handler))
        .route("/api/targets/{id}/check", post(check_handler))
        .route("/api/clients/checks", get(client_checks_handler))
        .with_state(state)
}

impl IntoResponse for HealthdeckError {
    fn into_response(self) -> Response {
        let status = match &self {
            HealthdeckError::NotFound(_) => StatusCode::NOT_FOUND,
            HealthdeckError::InvalidDowntime(_) => StatusCode::BAD_REQUEST,
            HealthdeckError::Remote(_) | HealthdeckError::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn health_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(dashboard.scheduler.status().await)
}

async fn targets_handler(State(dashboard): State<DashboardState>) -> crate::Result<Response> {
    let targets = dashboard.store.targets().await?;
    Ok(Json(targets).into_response())
}

async fn notifications_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<TargetId>,
) -> crate::Result<Response> {
    if dashboard.store.target(id).await?.is_none() {
        return Err(HealthdeckError::NotFound(id));
    }
    let notifications = dashboard.store.notifications(id).await?;
    Ok(Json(notifications).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DowntimeRequest {
    duration_seconds: u64,
}

async fn downtime_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<TargetId>,
    Json(request): Json<DowntimeRequest>,
) -> crate::Result<Response> {
    let until = dashboard
        .downtime
        .schedule_downtime(id, request.duration_seconds)
        .await?;
    Ok(Json(serde_json::json!({ "id": id, "active": false, "suspendedUntil": until }))
        .into_response())
}

async fn resume_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<TargetId>,
) -> crate::Result<Response> {
    dashboard.downtime.resume(id).await?;
    Ok(Json(serde_json::json!({ "id": id, "active": true })).into_response())
}

async fn check_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<TargetId>,
) -> crate::Result<Response> {
    let evaluation = dashboard.engine.run_now(id).await?;
    Ok(Json(evaluation).into_response())
}

#[derive(Debug, Deserialize)]
struct ClientQuery {
    base: String,
}

async fn client_checks_handler(
    State(dashboard): State<DashboardState>,
    Query(query): Query<ClientQuery>,
) -> crate::Result<Response> {
    let checks = dashboard.engine.remote().list_checks(&query.base).await?;
    Ok(Json(checks).into_response())
}
