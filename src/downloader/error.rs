use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DownloadError {
    IoError(std::io::Error),
    ToolNotFound(String),
    ProcessFailed { tool: String, stderr: String },
    InvalidOutput(String),
    FileNotFound(PathBuf),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::IoError(e) => write!(f, "IO错误: {}", e),
            DownloadError::ToolNotFound(tool) => write!(f, "未找到可执行文件: {}", tool),
            DownloadError::ProcessFailed { tool, stderr } => {
                write!(f, "{} 执行失败: {}", tool, stderr.trim())
            }
            DownloadError::InvalidOutput(msg) => write!(f, "无法识别的输出: {}", msg),
            DownloadError::FileNotFound(path) => write!(f, "文件不存在: {:?}", path),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(error: std::io::Error) -> Self {
        DownloadError::IoError(error)
    }
}
