use axum::Json;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::AppState;
use crate::catalog::CatalogError;
use crate::common::models::{AudioFormat, AudioQuality};
use crate::task::{DownloadRequest, SubmitError, TaskSnapshot, TaskStatus};

const SESSION_COOKIE: &str = "task_id";

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub url: String,
    pub limit: Option<String>,
    pub format: Option<String>,
    pub quality: Option<String>,
    pub output_dir: Option<String>,
    pub batch_mode: Option<String>,
}

impl DownloadForm {
    fn into_request(self) -> Result<(DownloadRequest, bool), String> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return Err("请输入链接".to_string());
        }

        let limit = match non_empty(self.limit) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(format!("无效的数量限制: {}", raw)),
            },
            None => None,
        };
        let format = match non_empty(self.format) {
            Some(raw) => AudioFormat::from_str(&raw)?,
            None => AudioFormat::default(),
        };
        let quality = match non_empty(self.quality) {
            Some(raw) => AudioQuality::from_str(&raw)?,
            None => AudioQuality::default(),
        };
        let batch = self.batch_mode.as_deref() == Some("true");

        let request = DownloadRequest {
            url,
            limit,
            format,
            quality,
            output_dir: non_empty(self.output_dir).map(PathBuf::from),
        };
        Ok((request, batch))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 查询进度的返回体
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub status: TaskStatus,
    pub total: usize,
    pub completed: usize,
    pub progress: u32,
    pub error: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub is_batch: bool,
}

impl From<TaskSnapshot> for ProgressResponse {
    fn from(snapshot: TaskSnapshot) -> Self {
        Self {
            status: snapshot.status,
            total: snapshot.total,
            completed: snapshot.completed,
            progress: snapshot.progress,
            error: snapshot.error,
            output_dir: snapshot.output_dir,
            is_batch: snapshot.is_batch,
        }
    }
}

// -----------------------------------------------------------------------------------------------

fn session_task_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

fn session_cookie(task_id: &str) -> String {
    Cookie::build((SESSION_COOKIE, task_id.to_string()))
        .path("/")
        .http_only(true)
        .build()
        .to_string()
}

fn expired_session_cookie() -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie.to_string()
}

// -----------------------------------------------------------------------------------------------

/// 返回当前会话仍在进行的任务；已结束或不存在的任务会解除关联
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(task_id) = session_task_id(&headers) else {
        return Json(json!({ "task_id": null })).into_response();
    };

    match state.store().get(&task_id).await {
        Some(snapshot) if !snapshot.status.is_terminal() => Json(json!({
            "task_id": task_id,
            "task": ProgressResponse::from(snapshot),
        }))
        .into_response(),
        _ => (
            [(header::SET_COOKIE, expired_session_cookie())],
            Json(json!({ "task_id": null })),
        )
            .into_response(),
    }
}

pub async fn download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Response {
    let (request, batch) = match form.into_request() {
        Ok(parsed) => parsed,
        Err(message) => {
            warn!("无效的下载请求: {}", message);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response();
        }
    };

    let result = if batch {
        state.controller.submit_batch(request).await
    } else {
        state.controller.submit_single(request).await
    };

    match result {
        Ok(task_id) => {
            info!("接受下载请求，任务: {}", task_id);
            (
                [(header::SET_COOKIE, session_cookie(&task_id))],
                Json(json!({ "success": true, "task_id": task_id })),
            )
                .into_response()
        }
        Err(e) => {
            let status = match &e {
                SubmitError::NoSongsFound
                | SubmitError::NoUrls
                | SubmitError::Catalog(CatalogError::UnsupportedUrl(_)) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("❌ 提交下载失败: {}", e);
            (
                status,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn check_progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    match state.store().get(&task_id).await {
        Some(snapshot) => Json(ProgressResponse::from(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "not_found" })),
        )
            .into_response(),
    }
}

/// 只解除会话与任务的关联，任务本身保留
pub async fn clear_task() -> Response {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response()
}
