use lofty::{ItemKey, Tag, TagType};

use super::{ContainerTagger, fill_common_text, replace_front_cover};
use crate::common::models::TrackMetadata;

// FLAC: Vorbis Comments (TITLE/ARTIST/ALBUM/DATE/TRACKNUMBER/GENRE) + PICTURE 块
pub struct FlacTagger;

impl ContainerTagger for FlacTagger {
    fn name(&self) -> &'static str {
        "Vorbis Comments"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["flac"]
    }

    fn tag_type(&self) -> TagType {
        TagType::VorbisComments
    }

    fn fill(&self, tag: &mut Tag, meta: &TrackMetadata, cover: Option<&[u8]>) -> bool {
        fill_common_text(tag, meta);

        if !meta.track_number.is_empty() {
            tag.insert_text(ItemKey::TrackNumber, meta.track_number.clone());
        }

        match cover {
            Some(data) => replace_front_cover(tag, data, "Cover"),
            None => false,
        }
    }
}
