use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::TaskError;
use super::models::{Task, TaskSnapshot};

/// 进程内的任务表；每个任务一把锁，所有修改都经过 `mutate`
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<DashMap<String, Arc<Mutex<Task>>>>, // task_id -> Task
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, task: Task) -> Result<String, TaskError> {
        let task_id = task.id().to_string();
        match self.tasks.entry(task_id.clone()) {
            Entry::Occupied(_) => Err(TaskError::AlreadyExists(task_id)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(task)));
                debug!("创建任务: {}", task_id);
                Ok(task_id)
            }
        }
    }

    fn entry(&self, task_id: &str) -> Option<Arc<Mutex<Task>>> {
        // 先拿到 Arc 再加锁，避免持有分片锁跨越 await
        self.tasks.get(task_id).map(|task| Arc::clone(task.value()))
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        let task = self.entry(task_id)?;
        let guard = task.lock().await;
        Some(guard.snapshot())
    }

    /// 在任务锁内执行修改，任务不存在时返回 None
    pub async fn mutate<R, F>(&self, task_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let task = self.entry(task_id)?;
        let mut guard = task.lock().await;
        Some(f(&mut guard))
    }

    /// 删除已结束且超过保留时间的任务，返回删除数量
    pub async fn sweep(&self, now: DateTime<Utc>, retention: chrono::Duration) -> usize {
        let entries: Vec<(String, Arc<Mutex<Task>>)> = self
            .tasks
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut removed = 0;
        for (task_id, task) in entries {
            let expired = task.lock().await.is_expired(now, retention);
            if expired && self.tasks.remove_if(&task_id, |_, v| Arc::ptr_eq(v, &task)).is_some() {
                debug!("清理过期任务: {}", task_id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("🧹 清理了 {} 个过期任务", removed);
        }
        removed
    }
}
