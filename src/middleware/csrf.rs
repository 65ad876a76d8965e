//! CSRF protection for state-changing requests
//!
//! Tokens are stateless so any server process sharing the secret can verify
//! them: `<issued_at>.<nonce_hex>.<hmac_hex>`, where the HMAC-SHA256 covers
//! `<issued_at>.<nonce_hex>`. Safe methods pass through untouched; everything
//! else needs a valid, unexpired token in the `X-CSRF-Token` header or the
//! `_csrf_token` query parameter.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;

use super::rate_limit::request_client_ip;
use crate::error::AppError;
use crate::validation::log_security_event;

/// Header carrying the token
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Query parameter carrying the token
pub const CSRF_TOKEN_NAME: &str = "_csrf_token";

const NONCE_LEN: usize = 16;

/// CSRF signing state
#[derive(Clone)]
pub struct CsrfState {
    secret: Arc<Vec<u8>>,
    token_ttl_secs: i64,
}

impl CsrfState {
    pub fn new(secret: impl Into<Vec<u8>>, token_ttl_secs: i64) -> Self {
        let secret = secret.into();
        if secret.is_empty() {
            tracing::warn!("CsrfState created with an empty secret!");
        }
        Self {
            secret: Arc::new(secret),
            token_ttl_secs,
        }
    }

    /// Random hex secret for processes started without one
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn token_ttl_secs(&self) -> i64 {
        self.token_ttl_secs
    }

    pub fn issue(&self) -> String {
        self.issue_at(Utc::now().timestamp())
    }

    pub fn issue_at(&self, issued_at: i64) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let payload = format!("{}.{}", issued_at, hex::encode(nonce));
        let signature = self.sign(&payload).unwrap_or_default();
        format!("{}.{}", payload, signature)
    }

    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> bool {
        let Some((payload, signature)) = token.rsplit_once('.') else {
            return false;
        };
        let Some((issued_at, nonce)) = payload.split_once('.') else {
            return false;
        };
        let Ok(issued_at) = issued_at.parse::<i64>() else {
            return false;
        };
        if nonce.len() != NONCE_LEN * 2 || !nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }

        let age = now.saturating_sub(issued_at);
        if !(0..=self.token_ttl_secs).contains(&age) {
            tracing::debug!(age, max_age = self.token_ttl_secs, "CSRF token outside its lifetime");
            return false;
        }

        match self.sign(payload) {
            Some(expected) => constant_time_compare(signature, &expected),
            None => false,
        }
    }

    fn sign(&self, payload: &str) -> Option<String> {
        let mut mac = match Hmac::<Sha256>::new_from_slice(&self.secret) {
            Ok(m) => m,
            Err(_) => {
                tracing::error!("Failed to create HMAC instance");
                return None;
            }
        };
        mac.update(payload.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Reject unsafe requests without a valid token
pub async fn csrf_protect(
    State(state): State<Arc<CsrfState>>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().query().and_then(token_from_query));

    match token {
        Some(token) if state.verify(&token) => next.run(request).await,
        token => {
            let details = format!(
                "{} {} ({})",
                request.method(),
                request.uri().path(),
                if token.is_some() { "invalid token" } else { "missing token" }
            );
            log_security_event("CSRF validation failed", &details, request_client_ip(&request));
            AppError::Forbidden("Invalid or missing CSRF token".to_string()).into_response()
        }
    }
}

fn token_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == CSRF_TOKEN_NAME && !value.is_empty()).then(|| value.to_string())
    })
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
