use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("无法识别的链接: {0}，请使用 Spotify 专辑、歌单链接或 'liked'")]
    UnsupportedUrl(String),

    #[error("需要登录认证: {0}")]
    AuthRequired(String),

    #[error("Spotify API 错误 ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
