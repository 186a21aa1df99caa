use lofty::{Accessor, ItemKey, ParseOptions, Probe, TagType, TaggedFileExt};
use std::path::Path;

use spotify_downloader::common::models::TrackMetadata;
use spotify_downloader::tagger::cover::{CoverKind, cover_kind};
use spotify_downloader::tagger::{MetadataTagger, TagOutcome};

// 最小 FLAC 文件：STREAMINFO + 末尾的 PADDING 块
fn minimal_flac() -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]);
    data.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // 最小/最大块大小
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]); // 最小/最大帧大小
    data.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]); // 44100Hz, 2ch, 16bit
    data.extend_from_slice(&[0u8; 16]); // MD5
    data.extend_from_slice(&[0x81, 0x00, 0x00, 0x08]); // 最后一个块: PADDING
    data.extend_from_slice(&[0u8; 8]);
    data
}

// 10 个 MPEG-1 Layer III 帧 (128kbps, 44100Hz, 每帧 417 字节)
fn minimal_mp3() -> Vec<u8> {
    let mut data = Vec::new();
    for _ in 0..10 {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        data.extend_from_slice(&frame);
    }
    data
}

// 1x1 PNG
const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn sample_meta() -> TrackMetadata {
    TrackMetadata::new("Song Title", "Some Artist")
        .with_album("Some Album")
        .with_year("2019")
        .with_track_number("7")
        .with_genre("indie rock, dream pop")
}

#[derive(Debug, PartialEq)]
struct TagView {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    genre: Option<String>,
    date: Option<String>,
    track: Option<String>,
    pictures: usize,
    picture_data: Vec<Vec<u8>>,
}

fn read_tags(path: &Path, tag_type: TagType) -> TagView {
    let tagged = Probe::open(path)
        .unwrap()
        .options(ParseOptions::new().read_properties(false))
        .read()
        .unwrap();
    let tag = tagged.tag(tag_type).unwrap();
    TagView {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        genre: tag.genre().map(|s| s.to_string()),
        date: tag.get_string(&ItemKey::RecordingDate).map(str::to_string),
        track: tag.get_string(&ItemKey::TrackNumber).map(str::to_string),
        pictures: tag.pictures().len(),
        picture_data: tag.pictures().iter().map(|p| p.data().to_vec()).collect(),
    }
}

fn read_vorbis(path: &Path) -> TagView {
    read_tags(path, TagType::VorbisComments)
}

#[tokio::test]
async fn test_flac_tagging_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.flac");
    std::fs::write(&path, minimal_flac()).unwrap();

    let tagger = MetadataTagger::default();
    let meta = sample_meta();

    let outcome = tagger
        .apply_with_cover(&path, &meta, Some(PNG_1X1.to_vec()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TagOutcome::Tagged {
            container: "Vorbis Comments",
            cover: true
        }
    );
    let once = read_vorbis(&path);

    tagger
        .apply_with_cover(&path, &meta, Some(PNG_1X1.to_vec()))
        .await
        .unwrap();
    let twice = read_vorbis(&path);

    assert_eq!(once, twice);
    assert_eq!(twice.title.as_deref(), Some("Song Title"));
    assert_eq!(twice.artist.as_deref(), Some("Some Artist"));
    assert_eq!(twice.album.as_deref(), Some("Some Album"));
    assert_eq!(twice.genre.as_deref(), Some("indie rock, dream pop"));
    assert_eq!(twice.date.as_deref(), Some("2019"));
    assert_eq!(twice.track.as_deref(), Some("7"));
    assert_eq!(twice.pictures, 1);
}

#[tokio::test]
async fn test_mp3_tagging_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.mp3");
    std::fs::write(&path, minimal_mp3()).unwrap();

    let tagger = MetadataTagger::default();
    let meta = sample_meta();

    let outcome = tagger
        .apply_with_cover(&path, &meta, Some(PNG_1X1.to_vec()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TagOutcome::Tagged {
            container: "ID3v2",
            cover: true
        }
    );
    let once = read_tags(&path, TagType::Id3v2);
    let len_once = std::fs::metadata(&path).unwrap().len();

    tagger
        .apply_with_cover(&path, &meta, Some(PNG_1X1.to_vec()))
        .await
        .unwrap();
    let twice = read_tags(&path, TagType::Id3v2);

    assert_eq!(once, twice);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), len_once);
    assert_eq!(twice.title.as_deref(), Some("Song Title"));
    assert_eq!(twice.track.as_deref(), Some("7"));
    assert_eq!(twice.pictures, 1);
    assert_eq!(twice.picture_data[0], PNG_1X1.to_vec());
}

#[tokio::test]
async fn test_missing_fields_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.flac");
    std::fs::write(&path, minimal_flac()).unwrap();

    let tagger = MetadataTagger::default();
    let meta = TrackMetadata::new("Only Title", "Only Artist");
    let outcome = tagger.apply_with_cover(&path, &meta, None).await.unwrap();
    assert_eq!(
        outcome,
        TagOutcome::Tagged {
            container: "Vorbis Comments",
            cover: false
        }
    );

    let view = read_vorbis(&path);
    assert_eq!(view.title.as_deref(), Some("Only Title"));
    assert!(view.album.is_none());
    assert!(view.date.is_none());
    assert!(view.track.is_none());
    assert_eq!(view.pictures, 0);
}

#[tokio::test]
async fn test_invalid_cover_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.flac");
    std::fs::write(&path, minimal_flac()).unwrap();

    let tagger = MetadataTagger::default();
    let outcome = tagger
        .apply_with_cover(&path, &sample_meta(), Some(b"definitely not an image".to_vec()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TagOutcome::Tagged {
            container: "Vorbis Comments",
            cover: false
        }
    );
    assert_eq!(read_vorbis(&path).title.as_deref(), Some("Song Title"));
}

#[test]
fn test_tagger_dispatch_by_extension() {
    let tagger = MetadataTagger::default();
    let name = |p: &str| tagger.tagger_for(Path::new(p)).map(|t| t.name());

    assert_eq!(name("a/b/song.mp3"), Some("ID3v2"));
    assert_eq!(name("song.M4A"), Some("MP4"));
    assert_eq!(name("song.flac"), Some("Vorbis Comments"));
    assert_eq!(name("song.wav"), None);
    assert_eq!(name("no_extension"), None);
}

#[tokio::test]
async fn test_wav_is_left_untagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.wav");
    std::fs::write(&path, b"RIFF").unwrap();

    let outcome = MetadataTagger::default()
        .apply_with_cover(&path, &sample_meta(), None)
        .await
        .unwrap();
    assert_eq!(outcome, TagOutcome::Unsupported);
}

#[tokio::test]
async fn test_corrupt_file_reports_error_and_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.flac");
    std::fs::write(&path, b"this is not a flac file at all").unwrap();

    let result = MetadataTagger::default()
        .apply_with_cover(&path, &sample_meta(), None)
        .await;
    assert!(result.is_err());
    assert!(path.exists());
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = MetadataTagger::default()
        .apply_with_cover(&dir.path().join("nope.flac"), &sample_meta(), None)
        .await;
    assert!(result.is_err());
}

#[test]
fn test_cover_kind_by_magic() {
    assert_eq!(cover_kind(PNG_1X1), CoverKind::Png);
    assert_eq!(cover_kind(&[0xFF, 0xD8, 0xFF, 0xE0]), CoverKind::Jpeg);
    assert_eq!(cover_kind(b"GIF89a"), CoverKind::Other);
}
