pub mod cover;
pub mod error;
pub mod flac;
pub mod id3;
pub mod mp4;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lofty::{Accessor, ItemKey, ParseOptions, Picture, PictureType, Probe, Tag, TagExt, TagType, TaggedFileExt};
use tracing::{debug, info};

use crate::common::models::TrackMetadata;
use error::{Result, TagError};

/// 每种容器格式一个实现，按扩展名选择
pub trait ContainerTagger: Send + Sync {
    fn name(&self) -> &'static str;

    // 小写、不带点
    fn extensions(&self) -> &'static [&'static str];

    fn tag_type(&self) -> TagType;

    // 把元数据写入该容器的原生字段，返回是否写入了封面
    fn fill(&self, tag: &mut Tag, meta: &TrackMetadata, cover: Option<&[u8]>) -> bool;

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    fn write(&self, path: &Path, meta: &TrackMetadata, cover: Option<&[u8]>) -> Result<bool> {
        if !path.exists() {
            return Err(TagError::FileNotFound(path.to_path_buf()));
        }

        let mut tagged_file = Probe::open(path)?
            .options(ParseOptions::new().read_properties(false))
            .read()?;

        let tag_type = self.tag_type();
        if tagged_file.tag(tag_type).is_none() {
            let _ = tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or(TagError::UnsupportedTag(self.name()))?;

        let embedded = self.fill(tag, meta, cover);
        tag.save_to_path(path)?;
        Ok(embedded)
    }
}

// 各容器共用的文本字段，空值不写
pub(crate) fn fill_common_text(tag: &mut Tag, meta: &TrackMetadata) {
    if !meta.title.is_empty() {
        tag.set_title(meta.title.clone());
    }
    if !meta.artist.is_empty() {
        tag.set_artist(meta.artist.clone());
    }
    if !meta.album.is_empty() {
        tag.set_album(meta.album.clone());
    }
    if !meta.year.is_empty() {
        tag.insert_text(ItemKey::RecordingDate, meta.year.clone());
    }
    if !meta.genre.is_empty() {
        tag.set_genre(meta.genre.clone());
    }
}

// 替换已有的封面，重复写入不会追加
pub(crate) fn replace_front_cover(tag: &mut Tag, data: &[u8], description: &str) -> bool {
    let mut reader = data;
    let mut picture = match Picture::from_reader(&mut reader) {
        Ok(picture) => picture,
        Err(e) => {
            debug!("无法识别的封面数据，跳过: {}", e);
            return false;
        }
    };
    picture.set_pic_type(PictureType::CoverFront);
    picture.set_description(Some(description.to_string()));

    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);
    true
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Tagged { container: &'static str, cover: bool },
    Unsupported,
}

#[derive(Clone)]
pub struct MetadataTagger {
    client: reqwest::Client,
    taggers: Vec<Arc<dyn ContainerTagger>>,
}

impl Default for MetadataTagger {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl MetadataTagger {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            taggers: vec![
                Arc::new(id3::Id3Tagger),
                Arc::new(mp4::Mp4Tagger),
                Arc::new(flac::FlacTagger),
            ],
        }
    }

    pub fn tagger_for(&self, path: &Path) -> Option<Arc<dyn ContainerTagger>> {
        self.taggers.iter().find(|t| t.supports(path)).cloned()
    }

    /// 下载封面并写入标签
    pub async fn apply(&self, path: &Path, meta: &TrackMetadata) -> Result<TagOutcome> {
        if self.tagger_for(path).is_none() {
            debug!("不支持写入标签的格式，跳过: {:?}", path);
            return Ok(TagOutcome::Unsupported);
        }

        let cover = match meta.cover_url.as_deref() {
            Some(url) => cover::fetch_cover(&self.client, url).await,
            None => None,
        };

        self.apply_with_cover(path, meta, cover).await
    }

    /// 使用已有的封面数据写入标签
    pub async fn apply_with_cover(
        &self,
        path: &Path,
        meta: &TrackMetadata,
        cover: Option<Vec<u8>>,
    ) -> Result<TagOutcome> {
        let Some(tagger) = self.tagger_for(path) else {
            return Ok(TagOutcome::Unsupported);
        };

        let path: PathBuf = path.to_path_buf();
        let meta = meta.clone();

        // 标签写入是阻塞 IO
        let (container, cover) = tokio::task::spawn_blocking(move || {
            let embedded = tagger.write(&path, &meta, cover.as_deref())?;
            info!("🏷️ 已写入 {} 标签: {:?}", tagger.name(), path);
            Ok::<_, TagError>((tagger.name(), embedded))
        })
        .await
        .map_err(|e| TagError::Join(e.to_string()))??;

        Ok(TagOutcome::Tagged { container, cover })
    }
}
