// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-facing error mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use dray_storage::RepositoryError;

/// Everything a handler can fail with, collapsed to the two outcomes the
/// HTTP surface distinguishes: a 404 for a job that doesn't exist, and a
/// 500 for everything else (storage faults, malformed request bodies,
/// engine errors). Neither carries a JSON body — on error the response's
/// `Content-Type` is cleared rather than advertising a body that isn't
/// there.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("malformed request body: {0}")]
    Decode(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(id) => {
                tracing::debug!(%id, "job not found");
                StatusCode::NOT_FOUND
            }
            ApiError::Decode(message) => {
                tracing::debug!(%message, "malformed request body");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(message) => {
                tracing::warn!(%message, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut response = status.into_response();
        response.headers_mut().remove(axum::http::header::CONTENT_TYPE);
        response
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => ApiError::NotFound(id),
            RepositoryError::Unavailable(message) => ApiError::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Decode(rejection.body_text())
    }
}
