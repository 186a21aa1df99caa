pub mod controller;
pub mod error;
pub mod models;
pub mod store;

pub use controller::{DownloadController, DownloadRequest, TaskProgress};
pub use error::{SubmitError, TaskError};
pub use models::{SubTask, Task, TaskSnapshot, TaskStatus};
pub use store::TaskStore;
