use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smashstats_core::identity::resolve_code;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone, Default)]
struct ApiState {
    uploaded: Arc<Mutex<HashSet<String>>>,
    issued: Arc<Mutex<Vec<String>>>,
}

#[derive(Deserialize)]
struct NewPlayer {
    code: String,
}

#[derive(Serialize)]
struct NewPlayerResponse {
    id: String,
    code: String,
    key: String,
}

/// Derives a stable `(id, key)` pair for a code: an 8 character id and a
/// 36 character, dash-grouped key.
pub fn credential_for_code(code: &str) -> (String, String) {
    let digest = hex::encode(Sha256::digest(code.as_bytes()));
    let id = digest[..8].to_string();
    let key = format!(
        "{}-{}-{}-{}-{}",
        &digest[8..16],
        &digest[16..20],
        &digest[20..24],
        &digest[24..28],
        &digest[28..40]
    );
    (id, key)
}

/// POST /api/player/new
async fn new_player(
    State(state): State<ApiState>,
    Json(request): Json<NewPlayer>,
) -> Result<Json<NewPlayerResponse>, StatusCode> {
    if resolve_code(&request.code).is_none() {
        warn!(code = %request.code, "Refusing credential for short code");
        return Err(StatusCode::BAD_REQUEST);
    }
    let (id, key) = credential_for_code(&request.code);
    if let Ok(mut issued) = state.issued.lock() {
        issued.push(request.code.clone());
    }
    Ok(Json(NewPlayerResponse {
        id,
        code: request.code,
        key,
    }))
}

/// GET /api/misc/ping
async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "time": chrono::Utc::now().timestamp_millis() }))
}

/// GET /api/player/hasuploaded/{id}
async fn has_uploaded(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let uploaded = state
        .uploaded
        .lock()
        .map(|uploaded| uploaded.contains(&id))
        .unwrap_or(false);
    Json(serde_json::json!({ "uploaded": uploaded }))
}

/// Local stand-in for the service's HTTP API.
#[derive(Clone, Default)]
pub struct MockApi {
    state: ApiState,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/player/new", post(new_player))
            .route("/api/misc/ping", get(ping))
            .route("/api/player/hasuploaded/{id}", get(has_uploaded))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Marks a player id as having uploaded games.
    pub fn mark_uploaded(&self, id: impl Into<String>) {
        if let Ok(mut uploaded) = self.state.uploaded.lock() {
            uploaded.insert(id.into());
        }
    }

    /// Codes that were issued a credential, in request order.
    pub fn issued(&self) -> Vec<String> {
        self.state
            .issued
            .lock()
            .map(|issued| issued.clone())
            .unwrap_or_default()
    }

    /// Serves the API on a free local port; returns its base URL.
    pub async fn serve(&self) -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let app = self.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Mock API stopped: {e}");
            }
        });
        info!(%addr, "Mock API listening");
        Ok(format!("http://{addr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_credentials_have_the_issued_shape() {
        let (id, key) = credential_for_code("ABC#123");
        assert_eq!(id.len(), 8);
        assert_eq!(key.len(), 36);
        assert_eq!(key.matches('-').count(), 4);
        assert_eq!(credential_for_code("ABC#123"), (id, key));
        assert_ne!(credential_for_code("XYZ#987").0, credential_for_code("ABC#123").0);
    }
}
