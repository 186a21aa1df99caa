pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::ServerSettings;
use crate::task::{DownloadController, TaskStore};

/// 所有路由共享的状态
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<DownloadController>,
}

impl AppState {
    pub fn new(controller: Arc<DownloadController>) -> Self {
        Self { controller }
    }

    pub fn store(&self) -> &TaskStore {
        self.controller.store()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/download", post(handlers::download))
        .route("/check_progress/{task_id}", get(handlers::check_progress))
        .route("/clear_task", post(handlers::clear_task))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 定期清理已结束且超过保留时间的任务
pub fn spawn_sweeper(
    store: TaskStore,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let retention = chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::hours(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("清理任务退出");
                    break;
                }
                _ = ticker.tick() => {
                    store.sweep(Utc::now(), retention).await;
                }
            }
        }
    })
}

pub async fn serve(
    controller: Arc<DownloadController>,
    settings: &ServerSettings,
) -> anyhow::Result<()> {
    let cancel = controller.cancel_token().clone();
    let sweeper = spawn_sweeper(
        controller.store().clone(),
        settings.sweep_interval,
        settings.retention,
        cancel.clone(),
    );

    let app = router(AppState::new(controller));
    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!("🚀 服务已启动: http://localhost:{}", settings.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    sweeper.abort();
    info!("服务已停止");
    Ok(())
}
