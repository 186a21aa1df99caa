use serde::Deserialize;

use crate::common::models::TrackMetadata;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: usize,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl AlbumRef {
    // release_date 可能是 "2020"、"2020-05" 或 "2020-05-01"
    pub fn year(&self) -> String {
        self.release_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .unwrap_or("")
            .to_string()
    }

    pub fn cover_url(&self) -> Option<String> {
        self.images.first().map(|image| image.url.clone())
    }
}

// 专辑详情，tracks 是第一页
#[derive(Debug, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub tracks: Paging<AlbumTrack>,
}

impl Album {
    pub fn album_ref(&self) -> AlbumRef {
        AlbumRef {
            name: self.name.clone(),
            release_date: self.release_date.clone(),
            images: self.images.clone(),
        }
    }
}

// 专辑内的曲目不带 album 字段
#[derive(Debug, Deserialize)]
pub struct AlbumTrack {
    pub name: String,
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub track_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Track {
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub track_number: Option<u32>,
}

// 歌单中的曲目可能是本地文件或已下架，此时 track 为 null
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

#[derive(Debug, Deserialize)]
pub struct SavedTrack {
    pub track: Track,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTotal {
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub tracks: PlaylistTotal,
}

// -----------------------------------------------------------------------------------------------

// 统一后的曲目，转换成元数据前还需要查询流派
#[derive(Debug, Clone)]
pub struct RawTrack {
    pub name: String,
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub track_number: Option<u32>,
}

impl RawTrack {
    pub fn from_album_track(track: AlbumTrack, album: &AlbumRef) -> Self {
        Self {
            name: track.name,
            artist: track.artists.into_iter().next(),
            album: Some(album.clone()),
            track_number: track.track_number,
        }
    }

    pub fn artist_id(&self) -> Option<&str> {
        self.artist.as_ref().and_then(|artist| artist.id.as_deref())
    }

    pub fn into_metadata(self, genre: String) -> TrackMetadata {
        let artist = self.artist.map(|a| a.name).unwrap_or_default();
        let mut meta = TrackMetadata::new(self.name, artist).with_genre(genre);
        if let Some(number) = self.track_number {
            meta = meta.with_track_number(number.to_string());
        }
        if let Some(album) = self.album {
            meta = meta.with_year(album.year()).with_cover_url(album.cover_url().unwrap_or_default());
            meta = meta.with_album(album.name);
        }
        meta
    }
}

impl From<Track> for RawTrack {
    fn from(track: Track) -> Self {
        Self {
            name: track.name,
            artist: track.artists.into_iter().next(),
            album: track.album,
            track_number: track.track_number,
        }
    }
}
