use lofty::{Accessor, Tag, TagType};
use tracing::{debug, warn};

use super::cover::{CoverKind, cover_kind};
use super::{ContainerTagger, fill_common_text, replace_front_cover};
use crate::common::models::TrackMetadata;

// M4A: MP4 ilst (©nam/©ART/©alb/©day/trkn/©gen/covr)
pub struct Mp4Tagger;

impl ContainerTagger for Mp4Tagger {
    fn name(&self) -> &'static str {
        "MP4"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["m4a", "mp4"]
    }

    fn tag_type(&self) -> TagType {
        TagType::Mp4Ilst
    }

    fn fill(&self, tag: &mut Tag, meta: &TrackMetadata, cover: Option<&[u8]>) -> bool {
        fill_common_text(tag, meta);

        // trkn 只能存整数
        if !meta.track_number.is_empty() {
            match meta.track_number.split('/').next().unwrap_or("").trim().parse::<u32>() {
                Ok(track) => tag.set_track(track),
                Err(_) => debug!("曲目序号不是数字，跳过 trkn: {}", meta.track_number),
            }
        }

        let Some(data) = cover else {
            return false;
        };

        // covr 只支持 JPEG/PNG
        match cover_kind(data) {
            CoverKind::Jpeg | CoverKind::Png => replace_front_cover(tag, data, "Cover"),
            CoverKind::Other => {
                warn!("MP4 封面只支持 JPEG/PNG，跳过封面");
                false
            }
        }
    }
}
