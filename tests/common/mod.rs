#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use spotify_downloader::catalog::{Catalog, CatalogError, CatalogListing, SourceRef};
use spotify_downloader::common::models::{AudioFormat, AudioQuality, TrackMetadata};
use spotify_downloader::config::DownloadSettings;
use spotify_downloader::downloader::{DownloadError, MediaSource, RetryPolicy};
use spotify_downloader::task::{DownloadController, TaskStore};

pub fn track(title: &str, artist: &str) -> TrackMetadata {
    TrackMetadata::new(title, artist)
        .with_album("Test Album")
        .with_year("2021")
        .with_track_number("1")
}

// 按 SourceRef 返回固定曲目，未登记的链接返回 404
#[derive(Default)]
pub struct MockCatalog {
    listings: HashMap<SourceRef, Vec<TrackMetadata>>,
    pub calls: AtomicUsize,
}

impl MockCatalog {
    pub fn with(mut self, source: SourceRef, tracks: Vec<TrackMetadata>) -> Self {
        self.listings.insert(source, tracks);
        self
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn fetch_tracks(
        &self,
        source: &SourceRef,
        limit: Option<usize>,
    ) -> Result<CatalogListing, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(tracks) = self.listings.get(source) else {
            return Err(CatalogError::Api {
                status: 404,
                message: format!("not found: {}", source),
            });
        };

        let mut tracks = tracks.clone();
        let total = tracks.len();
        if let Some(limit) = limit {
            tracks.truncate(limit);
        }
        Ok(CatalogListing {
            name: format!("listing-{}", source.kind()),
            total,
            tracks,
        })
    }
}

// 搜索：前 resolve_fail_first 次出错，标题在 missing 中返回 None
// 下载：前 fail_first 次失败，之后按 delays 等待再写一个小文件
#[derive(Default)]
pub struct MockSource {
    missing: HashSet<String>,
    resolve_fail_first: usize,
    fail_first: usize,
    always_fail: bool,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub resolve_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub fetched: Mutex<Vec<PathBuf>>,
}

impl MockSource {
    pub fn missing(mut self, title: &str) -> Self {
        self.missing.insert(title.to_string());
        self
    }

    pub fn resolve_fail_first(mut self, n: usize) -> Self {
        self.resolve_fail_first = n;
        self
    }

    // name 是媒体地址的最后一段
    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn always_fail(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for MockSource {
    async fn resolve(&self, title: &str, _artist: &str) -> Result<Option<String>, DownloadError> {
        let call = self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.resolve_fail_first {
            return Err(DownloadError::ProcessFailed {
                tool: "mock".to_string(),
                stderr: "search timed out".to_string(),
            });
        }
        if self.missing.contains(title) {
            return Ok(None);
        }
        Ok(Some(format!("https://media.example/{}", title.replace(' ', "_"))))
    }

    async fn fetch(
        &self,
        locator: &str,
        output_dir: &Path,
        format: AudioFormat,
        _quality: AudioQuality,
    ) -> Result<PathBuf, DownloadError> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || call < self.fail_first {
            return Err(DownloadError::ProcessFailed {
                tool: "mock".to_string(),
                stderr: "HTTP Error 503".to_string(),
            });
        }

        let name = locator.rsplit('/').next().unwrap_or("track");
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let path = output_dir.join(format!("{}.{}", name, format.extension()));
        tokio::fs::write(&path, b"not really audio").await?;
        self.fetched.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

// 测试用配置：不等待重试
pub fn fast_settings() -> DownloadSettings {
    DownloadSettings {
        workers: 2,
        resolve_concurrency: 4,
        resolve_retry: RetryPolicy::new(3, Duration::ZERO),
        download_retry: RetryPolicy::new(3, Duration::ZERO),
        progress_grace: Duration::from_secs(1),
    }
}

pub fn controller(catalog: MockCatalog, source: Arc<MockSource>) -> Arc<DownloadController> {
    Arc::new(DownloadController::new(
        TaskStore::new(),
        Arc::new(catalog),
        source,
        None,
        fast_settings(),
        CancellationToken::new(),
    ))
}
