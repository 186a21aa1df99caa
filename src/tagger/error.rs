use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("标签读写失败: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("IO操作失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("文件不存在: {0:?}")]
    FileNotFound(PathBuf),

    #[error("该文件不支持 {0} 标签")]
    UnsupportedTag(&'static str),

    #[error("标签任务异常退出: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, TagError>;
