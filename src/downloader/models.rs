use std::path::PathBuf;

use crate::common::models::{AudioFormat, AudioQuality, TrackMetadata};

// 单个下载单元：一首已经找到媒体地址的歌曲
#[derive(Debug, Clone)]
pub struct DownloadUnit {
    pub locator: String,                  // 媒体地址
    pub output_dir: PathBuf,              // 输出目录
    pub format: AudioFormat,              // 目标格式
    pub quality: AudioQuality,            // 目标音质
    pub metadata: Option<TrackMetadata>,  // 需要写入的标签
}

impl DownloadUnit {
    pub fn new(
        locator: String,
        output_dir: PathBuf,
        format: AudioFormat,
        quality: AudioQuality,
        metadata: Option<TrackMetadata>,
    ) -> Self {
        Self {
            locator,
            output_dir,
            format,
            quality,
            metadata,
        }
    }

    pub fn label(&self) -> String {
        match &self.metadata {
            Some(meta) => meta.to_string(),
            None => self.locator.clone(),
        }
    }
}

// --------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Fetched(PathBuf),
    Failed(String),
    Cancelled,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Fetched(_))
    }
}

// 一次 WorkerPool 运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl PoolReport {
    pub fn record(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Fetched(_) => self.succeeded += 1,
            UnitOutcome::Failed(_) => self.failed += 1,
            UnitOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

// --------------------------------------------------------------------
// 搜索阶段的结果：保持歌单原有顺序
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub units: Vec<(String, TrackMetadata)>, // (媒体地址, 元数据)
    pub not_found: Vec<TrackMetadata>,
}

impl Resolution {
    pub fn found(&self) -> usize {
        self.units.len()
    }

    pub fn into_units(
        self,
        output_dir: PathBuf,
        format: AudioFormat,
        quality: AudioQuality,
    ) -> Vec<DownloadUnit> {
        self.units
            .into_iter()
            .map(|(locator, meta)| {
                DownloadUnit::new(locator, output_dir.clone(), format, quality, Some(meta))
            })
            .collect()
    }
}
