pub mod error;
pub mod models;
pub mod spotify;

use async_trait::async_trait;
use std::fmt;
use url::Url;

pub use error::CatalogError;
pub use spotify::SpotifyCatalog;

use crate::common::models::TrackMetadata;

/// 一个可以展开成曲目列表的链接
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRef {
    Album(String),
    Playlist(String),
    Liked, // 当前用户"我喜欢的音乐"
}

impl SourceRef {
    /// 去掉查询参数后按路径识别链接类型
    pub fn parse(input: &str) -> Result<Self, CatalogError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("liked") {
            return Ok(SourceRef::Liked);
        }

        let without_query = strip_query(trimmed);
        let id = last_segment(&without_query);

        if without_query.contains("album") {
            Self::require_id(id, input).map(SourceRef::Album)
        } else if without_query.contains("playlist") {
            Self::require_id(id, input).map(SourceRef::Playlist)
        } else if without_query.contains("spotify.com/user") {
            Ok(SourceRef::Liked)
        } else {
            Err(CatalogError::UnsupportedUrl(input.to_string()))
        }
    }

    fn require_id(id: &str, input: &str) -> Result<String, CatalogError> {
        if id.is_empty() || id == "album" || id == "playlist" {
            return Err(CatalogError::UnsupportedUrl(input.to_string()));
        }
        Ok(id.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceRef::Album(_) => "album",
            SourceRef::Playlist(_) => "playlist",
            SourceRef::Liked => "liked",
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Album(id) => write!(f, "album:{}", id),
            SourceRef::Playlist(id) => write!(f, "playlist:{}", id),
            SourceRef::Liked => f.write_str("liked"),
        }
    }
}

// 能解析为 URL 时取 host + path，否则按 '?' 截断
fn strip_query(input: &str) -> String {
    match Url::parse(input) {
        Ok(url) => format!("{}{}", url.host_str().unwrap_or(""), url.path()),
        Err(_) => input.split('?').next().unwrap_or(input).to_string(),
    }
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// 批量下载时每个链接使用的子目录名
pub fn folder_name(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("liked") {
        return "liked_songs".to_string();
    }
    let without_query = strip_query(trimmed);
    let name = sanitize_file_name(last_segment(&without_query));
    if name.is_empty() {
        "source".to_string()
    } else {
        name
    }
}

/// 去掉文件系统不允许的字符
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}

// -----------------------------------------------------------------------------------------------

/// 展开后的曲目列表
#[derive(Debug, Clone)]
pub struct CatalogListing {
    pub name: String, // 专辑/歌单名称，单链接模式下作为输出目录
    pub total: usize, // 服务端报告的曲目总数
    pub tracks: Vec<TrackMetadata>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// 获取曲目列表，`limit` 限制最多返回的数量
    async fn fetch_tracks(
        &self,
        source: &SourceRef,
        limit: Option<usize>,
    ) -> Result<CatalogListing, CatalogError>;
}
