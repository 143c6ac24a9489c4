// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job CRUD, log tailing, and submission endpoints for the pipeline
//! orchestrator's HTTP surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use dray_core::{EnvVar, Job, JobConfig, JobId, JobStep};

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/{id}", get(get_job).delete(delete_job))
        .route("/{id}/log", get(get_job_log))
}

/// Request body for `POST /jobs`: the user-supplied portion of a [`Job`].
/// Any `id`/`status`/`stepsCompleted`/etc. fields a client includes (e.g.
/// by round-tripping a previously fetched job) are accepted and ignored —
/// those are always assigned fresh by the engine.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    steps: Vec<JobStep>,
    #[serde(default)]
    environment: Vec<EnvVar>,
}

impl From<CreateJobRequest> for JobConfig {
    fn from(req: CreateJobRequest) -> Self {
        JobConfig {
            name: req.name,
            steps: req.steps,
            environment: req.environment,
        }
    }
}

#[derive(Debug, Serialize)]
struct JobLogResponse {
    lines: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LogQuery {
    index: Option<i64>,
}

async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    let jobs = state.manager.list_all().await?;
    Ok(Json(jobs))
}

async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let created = state.manager.submit(req.into()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.manager.get_by_id(&JobId::new(id)).await?;
    Ok(Json(job))
}

async fn get_job_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<JobLogResponse>, ApiError> {
    let lines = state
        .manager
        .get_log(&JobId::new(id), query.index.unwrap_or(0))
        .await?;
    Ok(Json(JobLogResponse { lines }))
}

async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = JobId::new(id);
    // `Repository::delete` is idempotent and never fails on an unknown id,
    // but a job that was never there should still 404; `get_by_id` first
    // surfaces that distinction.
    state.manager.get_by_id(&id).await?;
    state.manager.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dray_core::{FakeClock, JobStatus};
    use dray_executor::FakeContainerExecutor;
    use dray_storage::{InMemoryRepository, Repository};
    use tower::ServiceExt;

    use super::*;
    use dray_engine::JobManager;

    fn test_state() -> AppState {
        let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        AppState::new(JobManager::new(repository, executor, clock))
    }

    #[tokio::test]
    async fn list_jobs_starts_empty() {
        let app = router().with_state(test_state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_then_get_round_trips_the_job() {
        let state = test_state();
        let app = router().with_state(state.clone());

        let body = r#"{"name":"demo","steps":[]}"#;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: Job = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created.name, "demo");
        assert_eq!(created.status, JobStatus::Pending);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", created.id.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_create_body_is_a_500_with_no_content_type() {
        let app = router().with_state(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("content-type").is_none());
    }

    #[tokio::test]
    async fn get_unknown_job_is_404() {
        let app = router().with_state(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_unknown_job_is_404() {
        let app = router().with_state(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn log_endpoint_returns_lines_wrapper() {
        let state = test_state();
        let created = state
            .manager
            .submit(JobConfig {
                name: "with-log".into(),
                steps: vec![],
                environment: vec![],
            })
            .await
            .unwrap();
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}/log", created.id.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let log: JobLogResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(log.lines.is_empty());
    }
}
