use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::models::{DownloadUnit, PoolReport, UnitOutcome};
use super::worker::FetchWorker;

/// 有界并发的下载池，结果按完成顺序收集
#[derive(Clone)]
pub struct WorkerPool {
    parallelism: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(parallelism: usize, cancel: CancellationToken) -> Self {
        Self {
            parallelism: parallelism.max(1),
            cancel,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// 运行所有下载单元；每个单元结束时把结果发送到 `events`
    pub async fn run(
        &self,
        worker: Arc<FetchWorker>,
        units: Vec<DownloadUnit>,
        events: Option<mpsc::UnboundedSender<UnitOutcome>>,
    ) -> PoolReport {
        let total = units.len();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut join_set = JoinSet::new();
        let mut report = PoolReport::default();

        info!("开始下载 {} 首歌曲，并发数: {}", total, self.parallelism);

        for unit in units {
            // 取消后不再派发新的单元，已派发的自行检查取消信号
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("收到取消信号，停止派发剩余 {} 首歌曲", total - report.dispatched);
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!("信号量已关闭");
                        break;
                    }
                },
            };

            let worker = Arc::clone(&worker);
            let cancel = self.cancel.clone();
            let events = events.clone();
            report.dispatched += 1;

            join_set.spawn(async move {
                let _permit = permit;
                let outcome = worker.fetch(unit, &cancel).await;
                if let Some(events) = events {
                    let _ = events.send(outcome.clone());
                }
                outcome
            });
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    error!("下载单元异常退出: {}", e);
                    let outcome = UnitOutcome::Failed(e.to_string());
                    if let Some(events) = events.as_ref() {
                        let _ = events.send(outcome.clone());
                    }
                    report.record(&outcome);
                }
            }
        }

        debug!("下载池结束: {:?}", report);
        info!(
            "成功下载 {} / {} 首歌曲",
            report.succeeded, total
        );
        report
    }
}
