use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::models::{DownloadUnit, Resolution, UnitOutcome};
use super::retry::RetryPolicy;
use super::source::MediaSource;
use crate::common::models::TrackMetadata;
use crate::config::DownloadSettings;
use crate::tagger::{MetadataTagger, TagOutcome};

/// 单首歌曲的执行者：搜索 -> 下载转码 -> 写标签
#[derive(Clone)]
pub struct FetchWorker {
    source: Arc<dyn MediaSource>,
    tagger: Option<Arc<MetadataTagger>>,
    resolve_retry: RetryPolicy,
    download_retry: RetryPolicy,
}

impl FetchWorker {
    pub fn new(
        source: Arc<dyn MediaSource>,
        tagger: Option<Arc<MetadataTagger>>,
        settings: &DownloadSettings,
    ) -> Self {
        Self {
            source,
            tagger,
            resolve_retry: settings.resolve_retry,
            download_retry: settings.download_retry,
        }
    }

    // 搜索阶段：第 n 次尝试前等待 n * backoff；没有结果直接返回 None
    pub async fn resolve(&self, meta: &TrackMetadata) -> Option<String> {
        for attempt in 0..self.resolve_retry.attempts {
            tokio::time::sleep(self.resolve_retry.delay_for(attempt)).await;

            match self.source.resolve(&meta.title, &meta.artist).await {
                Ok(Some(locator)) => {
                    debug!("找到 \"{}\": {}", meta, locator);
                    return Some(locator);
                }
                Ok(None) => {
                    info!("未找到搜索结果: \"{}\"", meta.search_query());
                    return None;
                }
                Err(e) => {
                    if self.resolve_retry.is_last(attempt) {
                        warn!("搜索 \"{}\" 失败: {}", meta.search_query(), e);
                        return None;
                    }
                    debug!("搜索 \"{}\" 第 {} 次失败: {}", meta, attempt + 1, e);
                }
            }
        }
        None
    }

    /// 并发搜索整张歌单，结果保持原有顺序
    pub async fn resolve_all(&self, tracks: Vec<TrackMetadata>, concurrency: usize) -> Resolution {
        let total = tracks.len();
        let results: Vec<(Option<String>, TrackMetadata)> = futures::stream::iter(tracks)
            .map(|meta| async move { (self.resolve(&meta).await, meta) })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut resolution = Resolution::default();
        for (locator, meta) in results {
            match locator {
                Some(locator) => resolution.units.push((locator, meta)),
                None => resolution.not_found.push(meta),
            }
        }

        info!("找到 {} / {} 首歌曲的下载地址", resolution.found(), total);
        if !resolution.not_found.is_empty() {
            warn!("有 {} 首歌曲未找到下载地址", resolution.not_found.len());
        }
        resolution
    }

    /// 下载阶段：每次尝试前检查取消信号
    pub async fn fetch(&self, unit: DownloadUnit, cancel: &CancellationToken) -> UnitOutcome {
        let label = unit.label();

        for attempt in 0..self.download_retry.attempts {
            if cancel.is_cancelled() {
                debug!("⏭️ 已取消，跳过: {}", label);
                return UnitOutcome::Cancelled;
            }

            match self
                .source
                .fetch(&unit.locator, &unit.output_dir, unit.format, unit.quality)
                .await
            {
                Ok(path) => {
                    if let Some(meta) = unit.metadata.as_ref() {
                        self.tag(&path, meta).await;
                    }
                    return UnitOutcome::Fetched(path);
                }
                Err(e) => {
                    if self.download_retry.is_last(attempt) {
                        error!("❌ 下载失败: {}, 错误: {}", label, e);
                        return UnitOutcome::Failed(e.to_string());
                    }
                    warn!("下载 {} 第 {} 次失败，准备重试: {}", label, attempt + 1, e);

                    let delay = self.download_retry.delay_for(attempt);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("⏭️ 等待重试时收到取消信号: {}", label);
                            return UnitOutcome::Cancelled;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        UnitOutcome::Failed(format!("没有可用的下载尝试: {}", label))
    }

    // 写标签失败只记录日志，文件保留
    async fn tag(&self, path: &Path, meta: &TrackMetadata) {
        let Some(tagger) = self.tagger.as_ref() else {
            return;
        };

        match tagger.apply(path, meta).await {
            Ok(TagOutcome::Tagged { container, cover }) => {
                debug!("标签写入完成 ({}，封面: {}): {:?}", container, cover, path);
            }
            Ok(TagOutcome::Unsupported) => {
                debug!("该格式不写标签: {:?}", path);
            }
            Err(e) => {
                warn!("⚠️ 写入标签失败，保留未打标签的文件 {:?}: {}", path, e);
            }
        }
    }
}
