use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::TaskError;

// --------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Preparing,
    Processing,
    Downloading,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Preparing => "preparing",
            TaskStatus::Processing => "processing",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    // 只允许向前的状态转换
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Preparing, Processing)
                | (Preparing, Downloading)
                | (Preparing, Error)
                | (Processing, Downloading)
                | (Processing, Error)
                | (Downloading, Completed)
                | (Downloading, Error)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 批量任务中每个链接的统计
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubTask {
    pub url: String,
    pub output_dir: PathBuf,
    pub total: usize,
    pub not_found: usize,
    pub error: Option<String>,
}

// --------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    total: usize,
    completed: usize,
    status: TaskStatus,
    error: Option<String>,
    output_dir: Option<PathBuf>,
    completion_time: Option<DateTime<Utc>>,
    original_url: String,
    is_batch: bool,
    sub_tasks: Option<Vec<SubTask>>,
    total_fixed: bool,
    created_at: DateTime<Utc>,
}

impl Task {
    /// 单个链接：歌曲数量在创建前已经确定
    pub fn single(id: impl Into<String>, total: usize, original_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            total,
            completed: 0,
            status: TaskStatus::Preparing,
            error: None,
            output_dir: None,
            completion_time: None,
            original_url: original_url.into(),
            is_batch: false,
            sub_tasks: None,
            total_fixed: true,
            created_at: Utc::now(),
        }
    }

    /// 批量任务：总数在所有链接解析完成后确定
    pub fn batch(id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            total: 0,
            completed: 0,
            status: TaskStatus::Processing,
            error: None,
            output_dir: None,
            completion_time: None,
            original_url: original_url.into(),
            is_batch: true,
            sub_tasks: Some(Vec::new()),
            total_fixed: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_batch(&self) -> bool {
        self.is_batch
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    fn ensure_active(&self) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::Terminal(self.status));
        }
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        self.ensure_active()?;
        if !self.status.can_advance_to(next) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// 非终止状态之间的推进
    pub fn advance(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if next.is_terminal() {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.transition(next)
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), TaskError> {
        self.ensure_active()?;
        let dir = dir.into();
        match &self.output_dir {
            Some(existing) if *existing == dir => Ok(()),
            Some(_) => Err(TaskError::OutputDirAlreadySet),
            None => {
                self.output_dir = Some(dir);
                Ok(())
            }
        }
    }

    /// 批量任务确定总数，只能设置一次且只能增加
    pub fn fix_total(&mut self, total: usize) -> Result<(), TaskError> {
        self.ensure_active()?;
        if self.total_fixed || total < self.total {
            return Err(TaskError::TotalAlreadyFixed);
        }
        self.total = total;
        self.total_fixed = true;
        Ok(())
    }

    pub fn push_sub_task(&mut self, sub_task: SubTask) -> Result<(), TaskError> {
        self.ensure_active()?;
        if let Some(sub_tasks) = self.sub_tasks.as_mut() {
            sub_tasks.push(sub_task);
        }
        Ok(())
    }

    /// 完成数只增不减，且不超过总数
    pub fn increment_completed(&mut self) -> Result<usize, TaskError> {
        self.ensure_active()?;
        if self.completed < self.total {
            self.completed += 1;
        }
        Ok(self.completed)
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Completed)?;
        self.completed = self.total;
        self.completion_time = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Error)?;
        self.error = Some(message.into());
        self.completion_time = Some(now);
        Ok(())
    }

    pub fn progress_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u32
    }

    // 已结束且超过保留时间
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        match self.completion_time {
            Some(done) if self.status.is_terminal() => now - done > retention,
            _ => false,
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            status: self.status,
            total: self.total,
            completed: self.completed,
            progress: self.progress_percent(),
            error: self.error.clone(),
            output_dir: self.output_dir.clone(),
            completion_time: self.completion_time,
            original_url: self.original_url.clone(),
            is_batch: self.is_batch,
            sub_tasks: self.sub_tasks.clone(),
            created_at: self.created_at,
        }
    }
}

/// 任务的只读副本，供查询接口使用
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    pub total: usize,
    pub completed: usize,
    pub progress: u32,
    pub error: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub completion_time: Option<DateTime<Utc>>,
    pub original_url: String,
    pub is_batch: bool,
    pub sub_tasks: Option<Vec<SubTask>>,
    pub created_at: DateTime<Utc>,
}
