use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;

use crate::cache::CacheStore;
use crate::config::PreloadConfig;
use crate::downloader::{Downloader, HttpDownloader};
use crate::preload::{self, JobId, Preloader, WorkerHandle};
use crate::status::{LogSink, StatusEvent, Throttled, WatchSink};

struct AppState {
    worker: WorkerHandle,
    status: watch::Receiver<Option<StatusEvent>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StartRequest {
    #[serde(default)]
    pub uris: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StartResponse {
    pub job_id: Option<JobId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CancelResponse {
    pub status: String,
}

async fn start_job(State(state): State<Arc<AppState>>, Json(request): Json<StartRequest>) -> Response {
    match state.worker.submit(request.uris) {
        Ok(job_id) => Json(StartResponse { job_id }).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn cancel_job(State(state): State<Arc<AppState>>, Path(job_id): Path<u64>) -> impl IntoResponse {
    let status = if state.worker.cancel(JobId::from(job_id)) {
        "ok"
    } else {
        "ignored"
    };
    Json(CancelResponse {
        status: status.to_string(),
    })
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.status.borrow().clone();
    Json(latest)
}

async fn handle_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "start": "POST /jobs",
            "cancel": "POST /jobs/{id}/cancel",
            "status": "GET /status"
        }
    }))
}

fn build_app(worker: WorkerHandle, status_rx: watch::Receiver<Option<StatusEvent>>) -> Router {
    let app_state = Arc::new(AppState {
        worker,
        status: status_rx,
    });

    Router::new()
        .route("/", get(handle_root))
        .route("/jobs", post(start_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/status", get(status))
        .with_state(app_state)
}

/// Spawn a worker around `preloader` and return the control router in front of it.
pub fn app_for<D: Downloader + 'static>(preloader: Preloader<D>, progress_interval: Duration) -> Router {
    let (watch_sink, status_rx) = WatchSink::channel();
    let sink = Throttled::new((LogSink, watch_sink), progress_interval);

    let (worker, _task) = preload::spawn(preloader, sink);
    build_app(worker, status_rx)
}

pub async fn create_app(config: &PreloadConfig) -> Result<Router, Box<dyn std::error::Error + Send + Sync>> {
    let cache = CacheStore::open(&config.cache_dir).await?;
    let downloader = HttpDownloader::from_config(config)?;
    Ok(app_for(Preloader::new(cache, downloader), config.progress_interval()))
}

pub async fn startup(
    config: PreloadConfig,
    address: String,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_app(&config).await?;

    let addr = format!("{}:{}", address, port);
    let listener = TcpListener::bind(&addr).await?;

    info!(cache_dir = ?config.cache_dir, "Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
