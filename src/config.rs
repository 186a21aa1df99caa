use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::downloader::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("缺少配置项: {0}")]
    Missing(&'static str),
}

// Spotify 凭据，字段名与 config.json 保持一致
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyCredentials {
    #[serde(rename = "CLIENT_ID", default)]
    pub client_id: String,
    #[serde(rename = "CLIENT_SECRET", default)]
    pub client_secret: String,
    // 读取"我喜欢的音乐"需要用户授权的 access token
    #[serde(rename = "USER_TOKEN", default)]
    pub user_token: Option<String>,
}

impl SpotifyCredentials {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut credentials = if path.exists() {
            debug!("读取配置文件: {:?}", path);
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str::<SpotifyCredentials>(&raw)?
        } else {
            debug!("配置文件不存在，仅使用环境变量: {:?}", path);
            SpotifyCredentials::default()
        };

        // 环境变量优先于配置文件
        if let Ok(id) = std::env::var("SPOTIFY_CLIENT_ID") {
            credentials.client_id = id;
        }
        if let Ok(secret) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            credentials.client_secret = secret;
        }
        if let Ok(token) = std::env::var("SPOTIFY_USER_TOKEN") {
            credentials.user_token = Some(token);
        }

        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("CLIENT_ID"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("CLIENT_SECRET"));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub workers: usize,             // 下载并发数
    pub resolve_concurrency: usize, // 搜索并发数
    pub resolve_retry: RetryPolicy,
    pub download_retry: RetryPolicy,
    pub progress_grace: Duration, // 下载结束后等待进度汇总的时间
}

impl DownloadSettings {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            resolve_concurrency: 10,
            resolve_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            download_retry: RetryPolicy::new(3, Duration::from_secs(2)),
            progress_grace: Duration::from_secs(1),
        }
    }
}

// 最多 5 个并发下载
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(5)
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub sweep_interval: Duration,
    pub retention: Duration, // 已结束任务的保留时间
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 5001,
            sweep_interval: Duration::from_secs(300),
            retention: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: SpotifyCredentials,
    pub download: DownloadSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let credentials = SpotifyCredentials::load(path)?;
        info!("配置加载完成");
        Ok(Self {
            credentials,
            download: DownloadSettings::default(),
            server: ServerSettings::default(),
        })
    }
}
