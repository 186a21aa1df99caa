use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::models::UnitOutcome;

/// 进度回调：每观察到一个结束的单元调用一次
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn unit_finished(&self, outcome: &UnitOutcome);
}

/// 把下载池的结果流汇总到外部可见的进度上，下载单元本身从不直接修改任务
pub struct ProgressAggregator {
    handle: JoinHandle<usize>,
}

impl ProgressAggregator {
    /// 启动汇总任务，返回汇总器和交给下载池的发送端
    pub fn spawn(
        total: usize,
        sink: Arc<dyn ProgressSink>,
    ) -> (Self, mpsc::UnboundedSender<UnitOutcome>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<UnitOutcome>();

        let handle = tokio::spawn(async move {
            let mut observed = 0usize;
            while observed < total {
                match rx.recv().await {
                    Some(outcome) => {
                        observed += 1;
                        sink.unit_finished(&outcome).await;
                    }
                    // 下载池结束（或被取消）后发送端全部释放
                    None => break,
                }
            }
            debug!("进度汇总结束: {}/{}", observed, total);
            observed
        });

        (Self { handle }, tx)
    }

    /// 下载池结束后给汇总任务一段时间处理剩余结果
    pub async fn finish(self, grace: Duration) -> Option<usize> {
        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(observed)) => Some(observed),
            Ok(Err(e)) => {
                warn!("进度汇总任务异常退出: {}", e);
                None
            }
            Err(_) => {
                warn!("进度汇总超时，强制结束");
                handle.abort();
                None
            }
        }
    }
}
