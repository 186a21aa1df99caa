use tracing::{debug, warn};

// 下载封面，失败时返回 None（封面是可选的）
pub async fn fetch_cover(client: &reqwest::Client, cover_url: &str) -> Option<Vec<u8>> {
    if cover_url.is_empty() {
        return None;
    }

    debug!("开始下载封面: {}", cover_url);
    let response = match client.get(cover_url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("封面下载失败: {}", e);
            return None;
        }
    };

    if response.status() != reqwest::StatusCode::OK {
        warn!("封面下载失败，状态码: {}", response.status());
        return None;
    }

    match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
        Ok(_) => None,
        Err(e) => {
            warn!("读取封面数据失败: {}", e);
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverKind {
    Jpeg,
    Png,
    Other,
}

// 根据文件头判断图片类型
pub fn cover_kind(data: &[u8]) -> CoverKind {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        CoverKind::Jpeg
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        CoverKind::Png
    } else {
        CoverKind::Other
    }
}
