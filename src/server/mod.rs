use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde_json::json;

use crate::{
    logging,
    snapshot::{store::SnapshotStore, PairFilter},
};

/// 供前端畫面讀取快照，只讀不寫
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
}

pub fn router(store: SnapshotStore) -> Router {
    Router::new()
        .route("/snapshot", get(snapshot_handler))
        .route("/snapshot/pairs", get(pairs_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { store })
}

/// 啟動 HTTP 服務，直到程序結束
pub async fn serve(store: SnapshotStore, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    logging::info_file_async(format!("Snapshot API listening on {}", addr));
    axum::serve(listener, router(store)).await?;

    Ok(())
}

fn no_snapshot() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "no snapshot" })),
    )
        .into_response()
}

/// GET /snapshot
pub async fn snapshot_handler(State(state): State<AppState>) -> Response {
    match state.store.read().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => no_snapshot(),
    }
}

/// GET /snapshot/pairs?name=&a_code=&h_code=
pub async fn pairs_handler(
    State(state): State<AppState>,
    Query(filter): Query<PairFilter>,
) -> Response {
    match state.store.read().await {
        Some(snapshot) => Json(snapshot.rows(&filter)).into_response(),
        None => no_snapshot(),
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let age_seconds = state
        .store
        .read()
        .await
        .map(|s| s.age(Local::now()).num_seconds());

    Json(json!({ "status": "ok", "age_seconds": age_seconds })).into_response()
}
