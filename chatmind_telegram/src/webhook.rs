//! Webhook transport: Telegram pushes updates to `/webhook/<bot id>`.
//!
//! Requests pass through [`guard_update`] before teloxide sees them, so a
//! wrong secret is answered with 401 and a body that is not an update with
//! 400. `/` answers health checks from the hosting platform.

use crate::{Error, Result};
use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde_json::{Value, json};
use std::net::SocketAddr;
use teloxide::types::Update;
use tracing::warn;

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Updates larger than this are refused outright.
const MAX_UPDATE_BYTES: usize = 1024 * 1024;

/// How the webhook server is reached and guarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub public_url: String,
    pub port: u16,
    /// `None` accepts requests without a secret header.
    pub secret: Option<String>,
}

impl WebhookSettings {
    #[must_use]
    pub fn new(public_url: impl Into<String>, port: u16) -> Self {
        Self {
            public_url: public_url.into(),
            port,
            secret: None,
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Full URL registered with Telegram for `token`.
    pub fn url(&self, token: &str) -> Result<Url> {
        let raw = format!("{}{}", self.public_url.trim_end_matches('/'), webhook_path(token));
        Url::parse(&raw).map_err(|e| Error::Webhook(format!("invalid public URL {raw:?}: {e}")))
    }
}

/// `/webhook/<bot id>`; the secret half of the token never appears in a URL.
#[must_use]
pub fn webhook_path(token: &str) -> String {
    let bot_id = token.split_once(':').map_or(token, |(id, _)| id);
    format!("/webhook/{bot_id}")
}

/// Accept a webhook request only if it carries the expected secret and its
/// body is a Telegram update.
pub fn check_update_request(
    headers: &HeaderMap,
    body: &[u8],
    secret: Option<&str>,
) -> std::result::Result<(), StatusCode> {
    if let Some(expected) = secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(expected) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    serde_json::from_slice::<Update>(body)
        .map(|_| ())
        .map_err(|e| {
            warn!("Rejected webhook payload: {e}");
            StatusCode::BAD_REQUEST
        })
}

/// Middleware in front of the teloxide webhook route.
pub async fn guard_update(
    State(secret): State<Option<String>>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_UPDATE_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read webhook body: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if let Err(status) = check_update_request(&parts.headers, &bytes, secret.as_deref()) {
        return status.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

pub async fn health(State(port): State<u16>) -> Json<Value> {
    Json(json!({ "status": "ok", "port": port }))
}
