//! CSRF token issuance

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::middleware::CSRF_TOKEN_NAME;

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    pub token_name: &'static str,
}

/// GET /api/csrf-token
pub async fn csrf_token(State(state): State<Arc<AppState>>) -> Response {
    let mut response = Json(CsrfTokenResponse {
        csrf_token: state.csrf.issue(),
        token_name: CSRF_TOKEN_NAME,
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
