// src/auth.rs
//! Shared-secret gate for the operational endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::AppState;

/// Rejects with a bare `403 Forbidden` unless `?token=` matches the trigger token.
pub async fn require_token(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Response {
    match q.get("token") {
        Some(token) if !token.is_empty() && token.as_str() == &*state.trigger_token => {
            next.run(req).await
        }
        _ => {
            tracing::debug!(path = %req.uri().path(), "rejected request without valid token");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}
