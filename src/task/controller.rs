use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{Local, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{SubmitError, TaskError};
use super::models::{SubTask, Task, TaskSnapshot, TaskStatus};
use super::store::TaskStore;
use crate::catalog::{Catalog, SourceRef, folder_name, sanitize_file_name};
use crate::common::models::{AudioFormat, AudioQuality};
use crate::config::DownloadSettings;
use crate::downloader::{
    DownloadUnit, FetchWorker, MediaSource, PoolReport, ProgressAggregator, ProgressSink,
    Resolution, UnitOutcome, WorkerPool,
};
use crate::tagger::MetadataTagger;

pub const NO_SONGS_IN_BATCH: &str = "所有链接中都没有找到歌曲";

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String, // 单个链接，批量模式下为原始输入
    pub limit: Option<usize>,
    pub format: AudioFormat,
    pub quality: AudioQuality,
    pub output_dir: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            limit: None,
            format: AudioFormat::default(),
            quality: AudioQuality::default(),
            output_dir: None,
        }
    }

    /// 批量模式下按行拆分链接，忽略空行
    pub fn urls(&self) -> Vec<String> {
        self.url
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// 一个链接展开并搜索后的结果
struct PreparedSource {
    name: String,
    resolution: Resolution,
}

// -----------------------------------------------------------------------------------------------

/// 下载池的结果经由任务表更新完成数
pub struct TaskProgress {
    store: TaskStore,
    task_id: String,
}

impl TaskProgress {
    pub fn new(store: TaskStore, task_id: impl Into<String>) -> Self {
        Self {
            store,
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
impl ProgressSink for TaskProgress {
    async fn unit_finished(&self, outcome: &UnitOutcome) {
        let updated = self
            .store
            .mutate(&self.task_id, |task| task.increment_completed())
            .await;
        match updated {
            Some(Ok(completed)) => debug!("任务 {} 进度: {} ({:?})", self.task_id, completed, outcome),
            Some(Err(e)) => debug!("任务 {} 已结束，忽略进度: {}", self.task_id, e),
            None => debug!("任务 {} 已被清理", self.task_id),
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// 负责任务的整个生命周期：展开链接、搜索、下载、收尾
pub struct DownloadController {
    store: TaskStore,
    catalog: Arc<dyn Catalog>,
    worker: Arc<FetchWorker>,
    settings: DownloadSettings,
    cancel: CancellationToken,
}

impl DownloadController {
    pub fn new(
        store: TaskStore,
        catalog: Arc<dyn Catalog>,
        source: Arc<dyn MediaSource>,
        tagger: Option<Arc<MetadataTagger>>,
        settings: DownloadSettings,
        cancel: CancellationToken,
    ) -> Self {
        let worker = Arc::new(FetchWorker::new(source, tagger, &settings));
        Self {
            store,
            catalog,
            worker,
            settings,
            cancel,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    async fn prepare(&self, url: &str, limit: Option<usize>) -> Result<PreparedSource, SubmitError> {
        let source = SourceRef::parse(url)?;
        let listing = self.catalog.fetch_tracks(&source, limit).await?;
        info!("🔍 开始搜索 \"{}\" 的 {} 首歌曲", listing.name, listing.tracks.len());

        let resolution = self
            .worker
            .resolve_all(listing.tracks, self.settings.resolve_concurrency)
            .await;
        Ok(PreparedSource {
            name: listing.name,
            resolution,
        })
    }

    /// 单个链接：同步完成搜索后创建任务，下载在后台进行
    pub async fn submit_single(
        self: &Arc<Self>,
        request: DownloadRequest,
    ) -> Result<String, SubmitError> {
        let prepared = self.prepare(&request.url, request.limit).await?;
        if prepared.resolution.found() == 0 {
            warn!("❌ {} 中没有找到可下载的歌曲", request.url);
            return Err(SubmitError::NoSongsFound);
        }

        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(sanitize_file_name(&prepared.name)));
        let units = prepared
            .resolution
            .into_units(output_dir.clone(), request.format, request.quality);

        let task_id = uuid::Uuid::new_v4().to_string();
        self.store
            .create(Task::single(&task_id, units.len(), &request.url))?;
        info!("📥 创建下载任务 {}，共 {} 首", task_id, units.len());

        let controller = Arc::clone(self);
        let id = task_id.clone();
        self.spawn_guarded(&task_id, async move {
            controller.run_single(&id, output_dir, units).await
        });
        Ok(task_id)
    }

    /// 批量模式：任务立即创建，链接在后台依次展开
    pub async fn submit_batch(
        self: &Arc<Self>,
        request: DownloadRequest,
    ) -> Result<String, SubmitError> {
        let urls = request.urls();
        if urls.is_empty() {
            return Err(SubmitError::NoUrls);
        }

        let base_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(default_batch_dir);

        let task_id = uuid::Uuid::new_v4().to_string();
        self.store.create(Task::batch(&task_id, &request.url))?;
        info!("📥 创建批量任务 {}，共 {} 个链接", task_id, urls.len());

        let controller = Arc::clone(self);
        let id = task_id.clone();
        self.spawn_guarded(&task_id, async move {
            controller.run_batch(&id, urls, base_dir, request).await
        });
        Ok(task_id)
    }

    // 后台任务的边界：任何错误或 panic 都记录为任务失败
    fn spawn_guarded<F>(&self, task_id: &str, job: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let store = self.store.clone();
        let task_id = task_id.to_string();
        tokio::spawn(async move {
            let result = match tokio::spawn(job).await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("后台任务异常退出: {}", e)),
            };

            if let Err(e) = result {
                error!("❌ 任务 {} 失败: {:#}", task_id, e);
                let message = format!("{:#}", e);
                store
                    .mutate(&task_id, |task| {
                        if !task.status().is_terminal() {
                            let _ = task.fail(message, Utc::now());
                        }
                    })
                    .await;
            }
        });
    }

    async fn update<R, F>(&self, task_id: &str, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut Task) -> Result<R, TaskError>,
    {
        match self.store.mutate(task_id, f).await {
            Some(result) => Ok(result?),
            None => Err(TaskError::NotFound(task_id.to_string()).into()),
        }
    }

    async fn run_single(
        &self,
        task_id: &str,
        output_dir: PathBuf,
        units: Vec<DownloadUnit>,
    ) -> anyhow::Result<()> {
        create_dir(&output_dir).await?;
        let dir = output_dir.clone();
        self.update(task_id, move |task| {
            task.set_output_dir(dir)?;
            task.advance(TaskStatus::Downloading)
        })
        .await?;

        self.execute(task_id, units).await
    }

    async fn run_batch(
        &self,
        task_id: &str,
        urls: Vec<String>,
        base_dir: PathBuf,
        request: DownloadRequest,
    ) -> anyhow::Result<()> {
        let dir = base_dir.clone();
        self.update(task_id, move |task| task.set_output_dir(dir)).await?;
        create_dir(&base_dir).await?;

        let mut units = Vec::new();
        for url in urls {
            if self.cancel.is_cancelled() {
                warn!("收到取消信号，停止展开剩余链接");
                break;
            }

            let source_dir = base_dir.join(folder_name(&url));
            let sub_task = match self.prepare_batch_source(&url, &source_dir, &request).await {
                Ok((source_units, not_found)) => {
                    let sub_task = SubTask {
                        url: url.clone(),
                        output_dir: source_dir,
                        total: source_units.len(),
                        not_found,
                        error: None,
                    };
                    units.extend(source_units);
                    sub_task
                }
                Err(e) => {
                    warn!("⚠️ 跳过链接 {}: {:#}", url, e);
                    SubTask {
                        url: url.clone(),
                        output_dir: source_dir,
                        total: 0,
                        not_found: 0,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            self.update(task_id, move |task| task.push_sub_task(sub_task))
                .await?;
        }

        let total = units.len();
        self.update(task_id, move |task| task.fix_total(total)).await?;
        info!("批量任务 {} 共找到 {} 首歌曲", task_id, total);

        if total == 0 {
            warn!("❌ 批量任务 {}: {}", task_id, NO_SONGS_IN_BATCH);
            return self
                .update(task_id, |task| task.fail(NO_SONGS_IN_BATCH, Utc::now()))
                .await;
        }

        self.update(task_id, |task| task.advance(TaskStatus::Downloading))
            .await?;
        // 所有链接共用一个下载池
        self.execute(task_id, units).await
    }

    // 返回 (下载单元, 未找到数量)
    async fn prepare_batch_source(
        &self,
        url: &str,
        source_dir: &Path,
        request: &DownloadRequest,
    ) -> anyhow::Result<(Vec<DownloadUnit>, usize)> {
        create_dir(source_dir).await?;
        let prepared = self.prepare(url, request.limit).await?;
        let not_found = prepared.resolution.not_found.len();
        info!(
            "链接 {} (\"{}\") 找到 {} 首歌曲",
            url,
            prepared.name,
            prepared.resolution.found()
        );
        let units = prepared.resolution.into_units(
            source_dir.to_path_buf(),
            request.format,
            request.quality,
        );
        Ok((units, not_found))
    }

    async fn execute(&self, task_id: &str, units: Vec<DownloadUnit>) -> anyhow::Result<()> {
        let total = units.len();
        let sink = Arc::new(TaskProgress::new(self.store.clone(), task_id));
        let (aggregator, events) = ProgressAggregator::spawn(total, sink);

        let pool = WorkerPool::new(self.settings.workers, self.cancel.clone());
        let report = pool.run(Arc::clone(&self.worker), units, Some(events)).await;

        if aggregator.finish(self.settings.progress_grace).await.is_none() {
            debug!("任务 {} 的进度汇总未正常结束", task_id);
        }

        self.finalize(task_id, total, report).await
    }

    // 下载池结束即视为完成，部分失败或被中断都不改变这一点
    async fn finalize(&self, task_id: &str, total: usize, report: PoolReport) -> anyhow::Result<()> {
        if self.cancel.is_cancelled() {
            warn!(
                "⏭️ 任务 {} 下载被中断：成功 {} 首，未完成 {} 首",
                task_id,
                report.succeeded,
                total.saturating_sub(report.succeeded)
            );
        }

        let now = Utc::now();
        self.update(task_id, move |task| task.complete(now)).await?;
        info!(
            "✅ 任务 {} 完成：成功 {} 首，失败 {} 首",
            task_id, report.succeeded, report.failed
        );
        Ok(())
    }

    /// 轮询直到任务结束；任务不存在时返回 None
    pub async fn wait_for(&self, task_id: &str, interval: Duration) -> Option<TaskSnapshot> {
        loop {
            let snapshot = self.store.get(task_id).await?;
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

async fn create_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("创建目录失败: {:?}", dir))
}

/// 批量模式的默认输出目录 downloads/batch_<时间>
pub fn default_batch_dir() -> PathBuf {
    PathBuf::from("downloads").join(format!("batch_{}", Local::now().format("%Y%m%d-%H%M%S")))
}
