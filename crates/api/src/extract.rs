// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `Json` extractor whose rejection is an [`ApiError`] rather than axum's
//! own default response, so a malformed request body gets the same 500 /
//! cleared-`Content-Type` treatment as every other error path instead of
//! axum's default 415/400/422.

use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ValidatedJson(value))
    }
}
