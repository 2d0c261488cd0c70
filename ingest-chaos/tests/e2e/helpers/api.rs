//! In-process pipeline query API over the simulated [`World`].
//!
//! Every route answers 503 while the API service is stopped.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use super::world::{API_SERVICE, World};

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn health(State(world): State<World>) -> Response {
    if world.is_running(API_SERVICE).await {
        "ok".into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn wallet_transactions(
    State(world): State<World>,
    Path(address): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    if !world.is_running(API_SERVICE).await {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let events = world
        .wallet_events(&address, query.limit.unwrap_or(50))
        .await;
    if events.is_empty() {
        // the pipeline encodes an empty wallet as null
        return Json(serde_json::Value::Null).into_response();
    }
    Json(events).into_response()
}

async fn last_received(State(world): State<World>) -> Response {
    if !world.is_running(API_SERVICE).await {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(world.last_received().await).into_response()
}

/// Serves the fake API on an ephemeral port and returns its base URL.
pub async fn spawn_api(world: World) -> String {
    let router = Router::new()
        .route("/health", get(health))
        .route("/wallet/{address}/transactions", get(wallet_transactions))
        .route("/internal/last-received", get(last_received))
        .with_state(world);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}
