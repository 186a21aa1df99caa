pub mod error;
pub mod models;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod source;
pub mod worker;

pub use error::DownloadError;
pub use models::{DownloadUnit, PoolReport, Resolution, UnitOutcome};
pub use pool::WorkerPool;
pub use progress::{ProgressAggregator, ProgressSink};
pub use retry::RetryPolicy;
pub use source::{MediaSource, YtDlpSource};
pub use worker::FetchWorker;
