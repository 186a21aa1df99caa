use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// -----------------------------------------------------------------------------------------------

// 单曲元数据，写入音频标签时使用
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,             // 歌名
    pub artist: String,            // 第一位艺人
    pub album: String,             // 专辑名
    pub year: String,              // 发行年份，可能为空
    pub track_number: String,      // 曲目序号，可能为空
    pub genre: String,             // 逗号拼接的流派，可能为空
    pub cover_url: Option<String>, // 封面地址
}

impl TrackMetadata {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    pub fn with_track_number(mut self, track_number: impl Into<String>) -> Self {
        self.track_number = track_number.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        let cover_url = cover_url.into();
        self.cover_url = if cover_url.is_empty() {
            None
        } else {
            Some(cover_url)
        };
        self
    }

    // 搜索时使用的关键字
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "wav" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(format!("不支持的音频格式: {}", other)),
        }
    }
}

// -----------------------------------------------------------------------------------------------

// 比特率 (kbps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioQuality {
    Q128,
    #[default]
    Q192,
    Q256,
    Q320,
}

impl AudioQuality {
    pub fn kbps(&self) -> u32 {
        match self {
            AudioQuality::Q128 => 128,
            AudioQuality::Q192 => 192,
            AudioQuality::Q256 => 256,
            AudioQuality::Q320 => 320,
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kbps())
    }
}

impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "128" => Ok(AudioQuality::Q128),
            "192" => Ok(AudioQuality::Q192),
            "256" => Ok(AudioQuality::Q256),
            "320" => Ok(AudioQuality::Q320),
            other => Err(format!("不支持的音质: {}，可选 128/192/256/320", other)),
        }
    }
}

impl TryFrom<String> for AudioQuality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AudioQuality> for String {
    fn from(value: AudioQuality) -> Self {
        value.to_string()
    }
}
