use lofty::{ItemKey, Tag, TagType};

use super::{ContainerTagger, fill_common_text, replace_front_cover};
use crate::common::models::TrackMetadata;

// MP3: ID3v2 (TIT2/TPE1/TALB/TDRC/TRCK/TCON/APIC)
pub struct Id3Tagger;

impl ContainerTagger for Id3Tagger {
    fn name(&self) -> &'static str {
        "ID3v2"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mp3"]
    }

    fn tag_type(&self) -> TagType {
        TagType::Id3v2
    }

    fn fill(&self, tag: &mut Tag, meta: &TrackMetadata, cover: Option<&[u8]>) -> bool {
        fill_common_text(tag, meta);

        // TRCK 允许 "3/12" 这种写法，原样写入
        if !meta.track_number.is_empty() {
            tag.insert_text(ItemKey::TrackNumber, meta.track_number.clone());
        }

        match cover {
            Some(data) => replace_front_cover(tag, data, "Cover"),
            None => false,
        }
    }
}
