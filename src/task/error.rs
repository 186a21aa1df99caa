use thiserror::Error;

use super::models::TaskStatus;
use crate::catalog::CatalogError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("任务未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("任务已结束，状态不可再修改: {0}")]
    Terminal(TaskStatus),

    #[error("任务总数已确定，不能再次修改")]
    TotalAlreadyFixed,

    #[error("输出目录已设置，不能再次修改")]
    OutputDirAlreadySet,

    #[error("任务已存在: {0}")]
    AlreadyExists(String),
}

/// 提交下载请求时的错误，此时还没有创建任务
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("没有找到任何歌曲")]
    NoSongsFound,

    #[error("没有提供任何链接")]
    NoUrls,

    #[error(transparent)]
    Task(#[from] TaskError),
}
