use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::CatalogError;
use super::models::{
    Album, AlbumTrack, Artist, Paging, Playlist, PlaylistItem, RawTrack, SavedTrack,
    TokenResponse,
};
use super::{Catalog, CatalogListing, SourceRef};
use crate::common::models::TrackMetadata;
use crate::config::SpotifyCredentials;

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

// 各接口单页的最大数量
const ALBUM_PAGE: usize = 50;
const PLAYLIST_PAGE: usize = 100;
const LIKED_PAGE: usize = 50;

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Spotify Web API 客户端，应用凭据使用 client credentials 授权
pub struct SpotifyCatalog {
    inner: Client,
    credentials: SpotifyCredentials,
    api_base: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyCatalog {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self, CatalogError> {
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            inner,
            credentials,
            api_base: API_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    // 指向其它地址（本地代理或测试服务）
    pub fn with_endpoints(mut self, api_base: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.token_url = token_url.into();
        self
    }

    // 缓存的 token 在过期前一分钟刷新
    async fn app_token(&self) -> Result<String, CatalogError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("获取 Spotify access token");
        let resp = self
            .inner
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = Self::handle_response(resp).await?;

        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn user_token(&self) -> Result<String, CatalogError> {
        self.credentials
            .user_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CatalogError::AuthRequired(
                    "读取\"我喜欢的音乐\"需要设置 USER_TOKEN 或 SPOTIFY_USER_TOKEN".to_string(),
                )
            })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, CatalogError> {
        debug!("GET {}", url);
        let resp = self.inner.get(url).bearer_auth(token).send().await?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, CatalogError> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::AuthRequired("access token 无效或已过期".to_string()));
        }

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            CatalogError::InvalidResponse(format!("解析响应失败: {}. 原始响应: {}", e, text))
        })
    }

    // 翻页直到取够 limit 或没有下一页
    async fn collect_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: &str,
        page_size: usize,
        limit: Option<usize>,
        mut first: Option<Paging<T>>,
    ) -> Result<Vec<T>, CatalogError> {
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let page = match first.take() {
                Some(page) => page,
                None => {
                    let separator = if endpoint.contains('?') { '&' } else { '?' };
                    let url = format!(
                        "{}{}offset={}&limit={}",
                        endpoint, separator, offset, page_size
                    );
                    self.get::<Paging<T>>(&url, token).await?
                }
            };

            let fetched = page.items.len();
            offset += fetched;
            items.extend(page.items);

            let enough = limit.is_some_and(|limit| items.len() >= limit);
            if enough || fetched == 0 || page.next.is_none() {
                break;
            }
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn album(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> Result<(String, usize, Vec<RawTrack>), CatalogError> {
        let token = self.app_token().await?;
        let album: Album = self.get(&format!("{}/albums/{}", self.api_base, id), &token).await?;
        let album_ref = album.album_ref();
        let total = album.tracks.total;
        let name = album.name.clone();

        let tracks: Vec<AlbumTrack> = self
            .collect_pages(
                &format!("{}/albums/{}/tracks", self.api_base, id),
                &token,
                ALBUM_PAGE,
                limit,
                Some(album.tracks),
            )
            .await?;

        let raw = tracks
            .into_iter()
            .map(|track| RawTrack::from_album_track(track, &album_ref))
            .collect();
        Ok((name, total, raw))
    }

    async fn playlist(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> Result<(String, usize, Vec<RawTrack>), CatalogError> {
        let token = self.app_token().await?;
        let playlist: Playlist = self
            .get(
                &format!("{}/playlists/{}?fields=name,tracks.total", self.api_base, id),
                &token,
            )
            .await?;

        let items: Vec<PlaylistItem> = self
            .collect_pages(
                &format!("{}/playlists/{}/tracks", self.api_base, id),
                &token,
                PLAYLIST_PAGE,
                limit,
                None,
            )
            .await?;

        let raw = items
            .into_iter()
            .filter_map(|item| item.track)
            .map(RawTrack::from)
            .collect();
        Ok((playlist.name, playlist.tracks.total, raw))
    }

    async fn liked(&self, limit: Option<usize>) -> Result<(String, usize, Vec<RawTrack>), CatalogError> {
        let token = self.user_token()?;
        let items: Vec<SavedTrack> = self
            .collect_pages(
                &format!("{}/me/tracks", self.api_base),
                &token,
                LIKED_PAGE,
                limit,
                None,
            )
            .await?;

        let total = items.len();
        let raw = items.into_iter().map(|item| RawTrack::from(item.track)).collect();
        Ok(("liked_songs".to_string(), total, raw))
    }

    // 流派取自第一位艺人，同一艺人只查询一次；失败时留空
    async fn with_genres(&self, tracks: Vec<RawTrack>) -> Vec<TrackMetadata> {
        let token = match self.app_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("无法获取流派信息: {}", e);
                None
            }
        };

        let mut cache: HashMap<String, String> = HashMap::new();
        let mut result = Vec::with_capacity(tracks.len());

        for track in tracks {
            let genre = match (track.artist_id(), token.as_deref()) {
                (Some(artist_id), Some(token)) => {
                    if let Some(genre) = cache.get(artist_id) {
                        genre.clone()
                    } else {
                        let url = format!("{}/artists/{}", self.api_base, artist_id);
                        let genre = match self.get::<Artist>(&url, token).await {
                            Ok(artist) => artist.genres.join(", "),
                            Err(e) => {
                                debug!("获取艺人 {} 的流派失败: {}", artist_id, e);
                                String::new()
                            }
                        };
                        cache.insert(artist_id.to_string(), genre.clone());
                        genre
                    }
                }
                _ => String::new(),
            };
            result.push(track.into_metadata(genre));
        }
        result
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    async fn fetch_tracks(
        &self,
        source: &SourceRef,
        limit: Option<usize>,
    ) -> Result<CatalogListing, CatalogError> {
        info!("📋 获取曲目列表: {}", source);

        let (name, total, raw) = match source {
            SourceRef::Album(id) => self.album(id, limit).await?,
            SourceRef::Playlist(id) => self.playlist(id, limit).await?,
            SourceRef::Liked => self.liked(limit).await?,
        };

        let tracks = self.with_genres(raw).await;
        info!("{} \"{}\" 共 {} 首，取得 {} 首", source.kind(), name, total, tracks.len());

        Ok(CatalogListing { name, total, tracks })
    }
}
