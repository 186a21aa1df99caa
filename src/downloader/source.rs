use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::error::DownloadError;
use crate::common::models::{AudioFormat, AudioQuality};

// 搜索 + 下载的外部实现
#[async_trait]
pub trait MediaSource: Send + Sync {
    // 根据歌名和艺人搜索最匹配的媒体地址，找不到时返回 None
    async fn resolve(&self, title: &str, artist: &str) -> Result<Option<String>, DownloadError>;

    // 下载并转码到目标格式，返回最终写入的文件路径
    async fn fetch(
        &self,
        locator: &str,
        output_dir: &Path,
        format: AudioFormat,
        quality: AudioQuality,
    ) -> Result<PathBuf, DownloadError>;
}

// -----------------------------------------------------------------------------------------------

/// 基于系统 yt-dlp (转码依赖 FFmpeg) 的实现
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    ytdlp_cmd: String,
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpSource {
    pub fn new() -> Self {
        // 获取 yt-dlp 路径（支持环境变量）
        let ytdlp_cmd = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
        Self { ytdlp_cmd }
    }

    pub fn with_command(ytdlp_cmd: impl Into<String>) -> Self {
        Self {
            ytdlp_cmd: ytdlp_cmd.into(),
        }
    }

    /// 检查 yt-dlp 是否可用
    pub async fn check_available(&self) -> Result<(), DownloadError> {
        debug!("检查系统中是否安装了 yt-dlp...");
        let status = Command::new(&self.ytdlp_cmd)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => {
                error!("❌ 未检测到 yt-dlp，请确保系统中已安装 yt-dlp 与 ffmpeg。");
                error!("或者设置环境变量 YTDLP_PATH 指向 yt-dlp 可执行文件路径");
                Err(DownloadError::ToolNotFound(self.ytdlp_cmd.clone()))
            }
        }
    }

    async fn run(&self, args: &[String]) -> Result<String, DownloadError> {
        let output = Command::new(&self.ytdlp_cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(self.ytdlp_cmd.clone()),
                _ => DownloadError::IoError(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DownloadError::ProcessFailed {
                tool: self.ytdlp_cmd.clone(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn resolve(&self, title: &str, artist: &str) -> Result<Option<String>, DownloadError> {
        let query = format!("ytsearch1:{} {}", title, artist);
        debug!("搜索: {}", query);

        let args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--flat-playlist".to_string(),
            "--print".to_string(),
            "url".to_string(),
            query,
        ];
        let stdout = self.run(&args).await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http"))
            .map(str::to_string))
    }

    async fn fetch(
        &self,
        locator: &str,
        output_dir: &Path,
        format: AudioFormat,
        quality: AudioQuality,
    ) -> Result<PathBuf, DownloadError> {
        let template = output_dir.join("%(title)s.%(ext)s");
        let args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            format.extension().to_string(),
            "--audio-quality".to_string(),
            format!("{}K", quality.kbps()),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            locator.to_string(),
        ];
        let stdout = self.run(&args).await?;

        // 最后一行是转码后的文件路径
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| DownloadError::InvalidOutput(format!("yt-dlp 未输出文件路径: {}", locator)))?;

        if !path.exists() {
            return Err(DownloadError::FileNotFound(path));
        }

        info!("✅ 下载完成: {:?}", path);
        Ok(path)
    }
}
