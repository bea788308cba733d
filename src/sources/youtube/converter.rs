use std::{
  cmp::Reverse,
  hash::{DefaultHasher, Hash, Hasher},
};

use tracing::{debug, warn};

use crate::{
  common::ConversionError,
  protocol::tracks::{
    Album, Artist, Extras, Playable, Streamable, StreamableMedia, Track, TrackType,
  },
  sources::youtube::{
    engine::{AudioRendition, StreamInfo, StreamInfoItem},
    resolver::{ResolvedRendition, StreamResolver},
    ua::media_headers,
    utils::extract_video_id,
  },
};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const PLACEHOLDER_QUALITY: u32 = 128;

/// Maps raw extraction records into host entities. Nothing from a converted
/// record is kept after the call returns.
#[derive(Clone)]
pub struct YouTubeConverter {
  resolver: StreamResolver,
}

/// Every key is always present; absent values become `""`, `"0"` or
/// `"Unknown"` so hosts see a stable shape.
fn extras<const N: usize>(pairs: [(&str, String); N]) -> Extras {
  pairs
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn or_empty(value: Option<&String>) -> String {
  value.cloned().unwrap_or_default()
}

fn or_zero<T: ToString>(value: Option<T>) -> String {
  value.map_or_else(|| "0".to_string(), |v| v.to_string())
}

fn placeholder_id(url: &str) -> String {
  let mut hasher = DefaultHasher::new();
  url.hash(&mut hasher);
  format!("server_{:x}", hasher.finish())
}

fn to_artist(name: Option<&str>, url: Option<&str>, avatar: Option<&str>) -> Artist {
  let url = url.unwrap_or_default();
  Artist {
    id: url.to_string(),
    name: name
      .filter(|n| !n.trim().is_empty())
      .unwrap_or(UNKNOWN_ARTIST)
      .to_string(),
    cover: avatar.map(str::to_string),
    extras: extras([
      ("url", url.to_string()),
      ("channelUrl", url.to_string()),
    ]),
  }
}

impl YouTubeConverter {
  pub fn new(resolver: StreamResolver) -> Self {
    Self { resolver }
  }

  /// Search-result variant. No resolution happens here; the single
  /// placeholder streamable is resolved lazily when the host asks for media.
  pub fn to_track(&self, item: &StreamInfoItem) -> Track {
    let video_id = extract_video_id(&item.url);
    let artist = to_artist(
      item.uploader_name.as_deref(),
      item.uploader_url.as_deref(),
      item.uploader_avatar_url.as_deref(),
    );

    let placeholder = Streamable::server(
      placeholder_id(&item.url),
      PLACEHOLDER_QUALITY,
      "Audio Stream",
      extras([
        ("videoUrl", item.url.clone()),
        ("videoId", video_id.clone()),
        ("title", item.name.clone()),
        ("uploader", or_empty(item.uploader_name.as_ref())),
        ("duration", or_zero(item.duration.map(|secs| secs * 1000))),
        ("thumbnailUrl", or_empty(item.thumbnail_url.as_ref())),
      ]),
    );

    Track {
      id: item.url.clone(),
      title: item.name.clone(),
      kind: TrackType::Song,
      cover: item.thumbnail_url.clone(),
      subtitle: item.uploader_name.clone(),
      artists: vec![artist],
      album: None,
      duration: item.duration.map(|secs| secs * 1000),
      plays: item.view_count,
      description: None,
      is_explicit: false,
      extras: extras([
        ("viewCount", or_zero(item.view_count)),
        ("uploadDate", or_empty(item.textual_upload_date.as_ref())),
        ("uploaderUrl", or_empty(item.uploader_url.as_ref())),
        ("url", item.url.clone()),
        ("videoId", video_id),
      ]),
      is_playable: Playable::Yes,
      streamables: vec![placeholder],
    }
  }

  /// Detail variant. Every rendition is resolved; the ones that fail are
  /// left out, and a track left with none is reported as not playable.
  pub async fn to_detailed_track(&self, info: &StreamInfo) -> Track {
    let resolved = self.resolver.resolve_all(&info.audio_streams, &info.id).await;
    let streamables: Vec<Streamable> = resolved
      .iter()
      .map(|r| self.to_streamable(info, r))
      .collect();

    if streamables.is_empty() {
      warn!(
        "No playable renditions for {} ({} offered)",
        info.id,
        info.audio_streams.len()
      );
    } else {
      debug!("{} has {} playable renditions", info.id, streamables.len());
    }

    let artist = to_artist(
      info.uploader_name.as_deref(),
      info.uploader_url.as_deref(),
      info.uploader_avatar_url.as_deref(),
    );
    let duration = (info.length > 0).then_some(info.length * 1000);

    let album = info.upload_date.as_ref().map(|date| Album {
      id: format!("album_{}", info.id),
      title: format!("Uploaded {}", date),
      cover: info.thumbnail_url.clone(),
      artists: vec![artist.clone()],
      duration,
      description: info.description.clone(),
      subtitle: Some("Single".to_string()),
      extras: extras([("uploadDate", date.clone()), ("url", info.url.clone())]),
    });

    Track {
      id: info.url.clone(),
      title: info.name.clone(),
      kind: TrackType::Song,
      cover: info.thumbnail_url.clone(),
      subtitle: info.uploader_name.clone(),
      artists: vec![artist],
      album,
      duration,
      plays: info.view_count,
      description: info.description.clone(),
      is_explicit: false,
      extras: extras([
        ("viewCount", or_zero(info.view_count)),
        ("likeCount", or_zero(info.like_count)),
        ("dislikeCount", or_zero(info.dislike_count)),
        (
          "uploadDate",
          or_empty(info.textual_upload_date.as_ref().or(info.upload_date.as_ref())),
        ),
        ("uploaderUrl", or_empty(info.uploader_url.as_ref())),
        ("url", info.url.clone()),
        ("videoId", info.id.clone()),
      ]),
      is_playable: if streamables.is_empty() {
        Playable::No
      } else {
        Playable::Yes
      },
      streamables,
    }
  }

  fn to_streamable(&self, info: &StreamInfo, resolved: &ResolvedRendition) -> Streamable {
    let rendition = &resolved.rendition;
    let bitrate = rendition.bitrate();

    Streamable::server(
      format!("audio_{}_{}", rendition.itag, bitrate),
      bitrate,
      format!("Audio Stream - {}", rendition.format),
      extras([
        ("itag", rendition.itag.to_string()),
        ("format", rendition.format.to_string()),
        ("bitrate", bitrate.to_string()),
        (
          "mimeType",
          rendition
            .mime_type
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        ),
        ("contentLength", or_zero(rendition.content_length)),
        ("trackId", info.id.clone()),
        ("trackTitle", info.name.clone()),
        ("videoUrl", info.url.clone()),
        ("audioUrl", resolved.resolved.playable_url.clone()),
      ]),
    )
  }
}

/// Builds the host media descriptor for a resolved streamable.
pub fn to_streamable_media(streamable: &Streamable) -> Result<StreamableMedia, ConversionError> {
  let uri = streamable
    .extras
    .get("audioUrl")
    .filter(|u| !u.is_empty())
    .ok_or(ConversionError::MissingField("audioUrl"))?;

  Ok(StreamableMedia {
    uri: uri.clone(),
    headers: media_headers(),
  })
}

/// Sorts in place by descending bitrate; equal bitrates keep itag order.
pub fn sort_by_bitrate_desc(renditions: &mut [AudioRendition]) {
  renditions.sort_by(|a, b| b.bitrate().cmp(&a.bitrate()).then(a.itag.cmp(&b.itag)));
}

pub fn best_audio_stream(renditions: &[AudioRendition]) -> Option<&AudioRendition> {
  renditions
    .iter()
    .min_by_key(|r| (Reverse(r.bitrate()), r.itag))
}

fn closest_by_bitrate<T>(items: &[T], target: u32, bitrate: impl Fn(&T) -> u32) -> Option<&T> {
  items
    .iter()
    .min_by_key(|item| {
      let b = bitrate(*item);
      (b.abs_diff(target), Reverse(b))
    })
}

/// The rendition minimizing `|bitrate - target|`; ties go to the higher bitrate.
pub fn audio_stream_by_quality(renditions: &[AudioRendition], target: u32) -> Option<&AudioRendition> {
  closest_by_bitrate(renditions, target, AudioRendition::bitrate)
}

pub fn resolved_by_quality(resolved: &[ResolvedRendition], target: u32) -> Option<&ResolvedRendition> {
  closest_by_bitrate(resolved, target, |r| r.rendition.bitrate())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use proptest::prelude::*;

  use super::*;
  use crate::sources::youtube::{
    engine::RenditionSource,
    resolver::tests::{FakePlayer, rendition},
  };

  fn converter() -> YouTubeConverter {
    YouTubeConverter::new(StreamResolver::new(Arc::new(FakePlayer::default())))
  }

  fn info(audio_streams: Vec<AudioRendition>) -> StreamInfo {
    StreamInfo {
      id: "dQw4w9WgXcQ".into(),
      url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
      name: "Never Gonna Give You Up".into(),
      uploader_name: Some("Rick Astley".into()),
      uploader_url: Some("https://www.youtube.com/@RickAstleyYT".into()),
      length: 213,
      view_count: Some(1_500_000_000),
      upload_date: Some("2009-10-24".into()),
      audio_streams,
      ..Default::default()
    }
  }

  #[test]
  fn test_search_item_gets_placeholder() {
    let item = StreamInfoItem {
      url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
      name: "Never Gonna Give You Up".into(),
      duration: Some(213),
      ..Default::default()
    };

    let track = converter().to_track(&item);
    assert_eq!(track.id, item.url);
    assert_eq!(track.duration, Some(213_000));
    assert_eq!(track.artists[0].name, UNKNOWN_ARTIST);
    assert_eq!(track.artists[0].id, "");
    assert_eq!(track.extras["viewCount"], "0");
    assert_eq!(track.extras["videoId"], "dQw4w9WgXcQ");
    assert_eq!(track.extras["uploaderUrl"], "");
    assert_eq!(track.extras["uploadDate"], "");
    assert!(track.is_playable());

    let placeholder = &track.streamables[0];
    assert!(placeholder.id.starts_with("server_"));
    assert_eq!(placeholder.quality, PLACEHOLDER_QUALITY);
    assert_eq!(placeholder.extras["videoUrl"], item.url);
    assert_eq!(placeholder.extras["duration"], "213000");
    assert_eq!(placeholder.extras["thumbnailUrl"], "");
    assert_eq!(placeholder.extras["uploader"], "");
    assert!(!placeholder.extras.contains_key("audioUrl"));
    assert_eq!(placeholder.id, converter().to_track(&item).streamables[0].id);
  }

  #[tokio::test]
  async fn test_detailed_track_keeps_resolved_renditions() {
    let track = converter()
      .to_detailed_track(&info(vec![
        rendition(140, 128, RenditionSource::Direct("https://a/140".into())),
        rendition(249, 50, RenditionSource::Cipher("sp=sig".into())),
        rendition(251, 160, RenditionSource::Direct("https://a/251".into())),
      ]))
      .await;

    assert!(track.is_playable());
    let ids: Vec<&str> = track.streamables.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["audio_251_160", "audio_140_128"]);
    assert_eq!(track.streamables[0].title.as_deref(), Some("Audio Stream - WEBMA"));
    assert_eq!(track.streamables[0].extras["audioUrl"], "https://a/251");
    assert_eq!(track.duration, Some(213_000));
    assert_eq!(track.extras["likeCount"], "0");

    let album = track.album.unwrap();
    assert_eq!(album.id, "album_dQw4w9WgXcQ");
    assert_eq!(album.title, "Uploaded 2009-10-24");
    assert_eq!(album.subtitle.as_deref(), Some("Single"));
    assert_eq!(album.extras["uploadDate"], "2009-10-24");
    assert_eq!(album.extras["url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
  }

  #[tokio::test]
  async fn test_absent_rendition_fields_get_defaults() {
    let mut bare = rendition(140, 128, RenditionSource::Direct("https://a/140".into()));
    bare.mime_type = None;
    bare.content_length = None;

    let track = converter()
      .to_detailed_track(&StreamInfo {
        uploader_url: None,
        upload_date: None,
        ..info(vec![bare])
      })
      .await;

    let extras = &track.streamables[0].extras;
    assert_eq!(extras["mimeType"], "Unknown");
    assert_eq!(extras["contentLength"], "0");
    assert_eq!(track.extras["uploaderUrl"], "");
    assert_eq!(track.extras["uploadDate"], "");
    assert!(track.album.is_none());
  }

  #[tokio::test]
  async fn test_detailed_track_without_renditions_is_not_playable() {
    let track = converter()
      .to_detailed_track(&info(vec![rendition(
        249,
        50,
        RenditionSource::Cipher("s=abc".into()),
      )]))
      .await;

    assert!(!track.is_playable());
    assert!(track.streamables.is_empty());
  }

  #[test]
  fn test_streamable_media() {
    let mut extras = Extras::new();
    extras.insert("audioUrl".into(), "https://a/251".into());
    let media = to_streamable_media(&Streamable::server("audio_251_160", 160, "x", extras)).unwrap();

    assert_eq!(media.uri, "https://a/251");
    assert!(
      media
        .headers
        .iter()
        .any(|(k, v)| k == "Referer" && v == "https://www.youtube.com/")
    );

    let err = to_streamable_media(&Streamable::server("server_1", 128, "x", Extras::new()));
    assert!(matches!(err, Err(ConversionError::MissingField("audioUrl"))));
  }

  #[test]
  fn test_quality_selection() {
    let renditions = vec![
      rendition(139, 48, RenditionSource::Direct("a".into())),
      rendition(140, 128, RenditionSource::Direct("b".into())),
      rendition(251, 160, RenditionSource::Direct("c".into())),
    ];

    assert_eq!(best_audio_stream(&renditions).unwrap().itag, 251);
    assert_eq!(audio_stream_by_quality(&renditions, 130).unwrap().itag, 140);
    assert_eq!(audio_stream_by_quality(&renditions, 144).unwrap().itag, 251);
    assert_eq!(audio_stream_by_quality(&renditions, 0).unwrap().itag, 139);
    assert!(audio_stream_by_quality(&[], 128).is_none());

    let mut sorted = renditions.clone();
    sort_by_bitrate_desc(&mut sorted);
    let itags: Vec<u32> = sorted.iter().map(|r| r.itag).collect();
    assert_eq!(itags, vec![251, 140, 139]);
  }

  proptest! {
    #[test]
    fn prop_closest_bitrate_matches_oracle(
      bitrates in proptest::collection::vec(0u32..512, 1..12),
      target in 0u32..512,
    ) {
      let renditions: Vec<AudioRendition> = bitrates
        .iter()
        .enumerate()
        .map(|(i, b)| rendition(i as u32, *b, RenditionSource::Direct(String::new())))
        .collect();

      let best_diff = bitrates.iter().map(|b| b.abs_diff(target)).min().unwrap();
      let expected = bitrates
        .iter()
        .filter(|b| b.abs_diff(target) == best_diff)
        .max()
        .copied()
        .unwrap();

      let picked = audio_stream_by_quality(&renditions, target).unwrap();
      prop_assert_eq!(picked.bitrate(), expected);
    }
  }
}
