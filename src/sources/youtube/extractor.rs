use serde_json::Value;

use crate::{
  common::{AudioFormat, ConversionError},
  sources::youtube::{
    engine::{AudioRendition, InfoItem, RenditionSource, SearchPage, StreamInfo, StreamInfoItem},
    utils::{parse_count, parse_duration_to_millis},
  },
};

const BASE_URL: &str = "https://www.youtube.com";

/// Flattens `simpleText` / `runs` text objects.
pub fn get_text(obj: &Value) -> Option<String> {
  if let Some(s) = obj.as_str() {
    return Some(s.to_string());
  }
  if let Some(simple_text) = obj.get("simpleText").and_then(|v| v.as_str()) {
    return Some(simple_text.to_string());
  }
  let runs = obj.get("runs")?.as_array()?;
  Some(
    runs
      .iter()
      .filter_map(|run| run.get("text").and_then(|v| v.as_str()))
      .collect(),
  )
}

/// Highest resolution thumbnail, without its query string.
fn get_thumbnail(obj: Option<&Value>) -> Option<String> {
  obj?
    .get("thumbnails")?
    .as_array()?
    .last()?
    .get("url")?
    .as_str()
    .map(|s| s.split('?').next().unwrap_or(s).to_string())
}

fn browse_url(run_owner: &Value) -> Option<String> {
  let endpoint = run_owner
    .get("runs")?
    .get(0)?
    .get("navigationEndpoint")?;

  endpoint
    .get("commandMetadata")
    .and_then(|c| c.get("webCommandMetadata"))
    .and_then(|w| w.get("url"))
    .and_then(|u| u.as_str())
    .map(|path| format!("{}{}", BASE_URL, path))
    .or_else(|| {
      endpoint
        .get("browseEndpoint")
        .and_then(|b| b.get("browseId"))
        .and_then(|id| id.as_str())
        .map(|id| format!("{}/channel/{}", BASE_URL, id))
    })
}

pub fn find_section_list(value: &Value) -> Option<&Value> {
  if let Some(list) = value.get("sectionListRenderer") {
    return Some(list);
  }
  if let Some(primary) = value
    .get("twoColumnSearchResultsRenderer")
    .and_then(|t| t.get("primaryContents"))
  {
    return find_section_list(primary);
  }
  if let Some(contents) = value.get("contents") {
    if let Some(list) = find_section_list(contents) {
      return Some(list);
    }
  }
  if let Some(arr) = value.as_array() {
    return arr.iter().find_map(find_section_list);
  }
  None
}

fn extract_stream_item(renderer: &Value) -> Option<StreamInfoItem> {
  let video_id = renderer.get("videoId")?.as_str()?;
  let name = get_text(renderer.get("title")?)?;

  let owner = renderer
    .get("ownerText")
    .or_else(|| renderer.get("longBylineText"))
    .or_else(|| renderer.get("shortBylineText"));

  let is_live = renderer
    .get("badges")
    .and_then(|b| b.as_array())
    .map(|badges| {
      badges.iter().any(|badge| {
        badge
          .get("metadataBadgeRenderer")
          .and_then(|m| m.get("style"))
          .and_then(|s| s.as_str())
          == Some("BADGE_STYLE_TYPE_LIVE_NOW")
      })
    })
    .unwrap_or(false);

  let duration = if is_live {
    None
  } else {
    renderer
      .get("lengthText")
      .and_then(get_text)
      .and_then(|s| parse_duration_to_millis(&s))
      .map(|ms| ms / 1000)
  };

  let uploader_avatar_url = renderer
    .get("channelThumbnailSupportedRenderers")
    .and_then(|c| c.get("channelThumbnailWithLinkRenderer"))
    .and_then(|c| get_thumbnail(c.get("thumbnail")));

  Some(StreamInfoItem {
    url: format!("{}/watch?v={}", BASE_URL, video_id),
    name,
    uploader_name: owner.and_then(get_text),
    uploader_url: owner.and_then(browse_url),
    uploader_avatar_url,
    thumbnail_url: get_thumbnail(renderer.get("thumbnail")),
    duration,
    view_count: renderer
      .get("viewCountText")
      .and_then(get_text)
      .and_then(|s| parse_count(&s)),
    textual_upload_date: renderer.get("publishedTimeText").and_then(get_text),
  })
}

fn extract_info_item(item: &Value) -> Option<InfoItem> {
  if let Some(renderer) = item.get("videoRenderer") {
    return extract_stream_item(renderer).map(InfoItem::Stream);
  }
  if let Some(renderer) = item.get("channelRenderer") {
    let id = renderer.get("channelId")?.as_str()?;
    return Some(InfoItem::Channel {
      url: format!("{}/channel/{}", BASE_URL, id),
      name: get_text(renderer.get("title")?)?,
    });
  }
  if let Some(renderer) = item.get("playlistRenderer") {
    let id = renderer.get("playlistId")?.as_str()?;
    return Some(InfoItem::Playlist {
      url: format!("{}/playlist?list={}", BASE_URL, id),
      name: get_text(renderer.get("title")?)?,
    });
  }
  None
}

/// Parses an InnerTube `search` response.
pub fn extract_search_page(body: &Value) -> SearchPage {
  let items = find_section_list(body)
    .and_then(|list| list.get("contents"))
    .and_then(|c| c.as_array())
    .map(|sections| {
      sections
        .iter()
        .filter_map(|section| {
          section
            .get("itemSectionRenderer")
            .and_then(|i| i.get("contents"))
            .and_then(|c| c.as_array())
        })
        .flatten()
        .filter_map(extract_info_item)
        .collect()
    })
    .unwrap_or_default();

  SearchPage { items }
}

/// Parses the suggestion endpoint's `["query", ["s1", "s2", ...]]` answer.
pub fn extract_suggestions(body: &Value) -> Vec<String> {
  body
    .get(1)
    .and_then(|v| v.as_array())
    .map(|arr| {
      arr
        .iter()
        .filter_map(|s| s.as_str().map(str::to_string))
        .collect()
    })
    .unwrap_or_default()
}

fn as_u64(value: Option<&Value>) -> Option<u64> {
  let value = value?;
  value
    .as_u64()
    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn extract_rendition(format: &Value) -> Option<AudioRendition> {
  let mime_type = format.get("mimeType")?.as_str()?;
  if !mime_type.starts_with("audio/") {
    return None;
  }

  let source = if let Some(url) = format.get("url").and_then(|u| u.as_str()) {
    RenditionSource::Direct(url.to_string())
  } else {
    let cipher = format
      .get("signatureCipher")
      .or_else(|| format.get("cipher"))?
      .as_str()?;
    RenditionSource::Cipher(cipher.to_string())
  };

  let bitrate = as_u64(format.get("averageBitrate")).or_else(|| as_u64(format.get("bitrate")));

  Some(AudioRendition {
    itag: u32::try_from(as_u64(format.get("itag"))?).ok()?,
    mime_type: Some(mime_type.to_string()),
    average_bitrate: bitrate.and_then(|bps| u32::try_from(bps.saturating_add(500) / 1000).ok()),
    content_length: as_u64(format.get("contentLength")),
    source,
    format: AudioFormat::from_mime(mime_type),
  })
}

/// Parses an InnerTube `player` response.
pub fn extract_stream_info(body: &Value) -> Result<StreamInfo, ConversionError> {
  let details = body
    .get("videoDetails")
    .ok_or(ConversionError::MissingField("videoDetails"))?;
  let id = details
    .get("videoId")
    .and_then(|v| v.as_str())
    .ok_or(ConversionError::MissingField("videoId"))?;
  let name = details
    .get("title")
    .and_then(|v| v.as_str())
    .ok_or(ConversionError::MissingField("title"))?;

  let microformat = body
    .get("microformat")
    .and_then(|m| m.get("playerMicroformatRenderer"));
  let micro_str = |key: &str| {
    microformat
      .and_then(|m| m.get(key))
      .and_then(|v| v.as_str())
      .map(str::to_string)
  };

  let audio_streams = body
    .get("streamingData")
    .and_then(|s| s.get("adaptiveFormats"))
    .and_then(|f| f.as_array())
    .map(|formats| formats.iter().filter_map(extract_rendition).collect())
    .unwrap_or_default();

  let upload_date = micro_str("uploadDate")
    .or_else(|| micro_str("publishDate"))
    .map(|d| d.chars().take(10).collect::<String>());

  Ok(StreamInfo {
    id: id.to_string(),
    url: format!("{}/watch?v={}", BASE_URL, id),
    name: name.to_string(),
    uploader_name: details
      .get("author")
      .and_then(|v| v.as_str())
      .map(str::to_string),
    uploader_url: micro_str("ownerProfileUrl").or_else(|| {
      details
        .get("channelId")
        .and_then(|v| v.as_str())
        .map(|c| format!("{}/channel/{}", BASE_URL, c))
    }),
    uploader_avatar_url: None,
    thumbnail_url: get_thumbnail(details.get("thumbnail")),
    length: as_u64(details.get("lengthSeconds")).unwrap_or(0),
    view_count: as_u64(details.get("viewCount")),
    like_count: None,
    dislike_count: None,
    description: details
      .get("shortDescription")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .map(str::to_string),
    textual_upload_date: upload_date.clone(),
    upload_date,
    audio_streams,
  })
}

/// `(status, reason)` from `playabilityStatus`.
pub fn playability(body: &Value) -> (String, Option<String>) {
  let status = body.get("playabilityStatus");
  (
    status
      .and_then(|s| s.get("status"))
      .and_then(|v| v.as_str())
      .unwrap_or("UNKNOWN")
      .to_string(),
    status
      .and_then(|s| s.get("reason"))
      .and_then(|v| v.as_str())
      .map(str::to_string),
  )
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn search_body() -> Value {
    json!({
      "contents": {
        "twoColumnSearchResultsRenderer": {
          "primaryContents": {
            "sectionListRenderer": {
              "contents": [{
                "itemSectionRenderer": {
                  "contents": [
                    {
                      "videoRenderer": {
                        "videoId": "dQw4w9WgXcQ",
                        "title": { "runs": [{ "text": "Never Gonna " }, { "text": "Give You Up" }] },
                        "ownerText": { "runs": [{
                          "text": "Rick Astley",
                          "navigationEndpoint": {
                            "commandMetadata": { "webCommandMetadata": { "url": "/@RickAstleyYT" } }
                          }
                        }] },
                        "lengthText": { "simpleText": "3:33" },
                        "viewCountText": { "simpleText": "1,234,567 views" },
                        "publishedTimeText": { "simpleText": "15 years ago" },
                        "thumbnail": { "thumbnails": [
                          { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg" },
                          { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg?sqp=abc" }
                        ] }
                      }
                    },
                    { "channelRenderer": { "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw", "title": { "simpleText": "Rick Astley" } } },
                    { "playlistRenderer": { "playlistId": "PL123", "title": { "simpleText": "Hits" } } },
                    { "adSlotRenderer": {} },
                    { "videoRenderer": { "videoId": "jNQXAC9IVRw", "title": { "simpleText": "Me at the zoo" } } }
                  ]
                }
              }]
            }
          }
        }
      }
    })
  }

  #[test]
  fn test_extract_search_page() {
    let page = extract_search_page(&search_body());
    assert_eq!(page.items.len(), 4);

    let streams: Vec<_> = page.streams().collect();
    assert_eq!(streams.len(), 2);

    let first = streams[0];
    assert_eq!(first.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert_eq!(first.name, "Never Gonna Give You Up");
    assert_eq!(first.uploader_name.as_deref(), Some("Rick Astley"));
    assert_eq!(
      first.uploader_url.as_deref(),
      Some("https://www.youtube.com/@RickAstleyYT")
    );
    assert_eq!(first.duration, Some(213));
    assert_eq!(first.view_count, Some(1_234_567));
    assert_eq!(
      first.thumbnail_url.as_deref(),
      Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );

    let second = streams[1];
    assert_eq!(second.uploader_name, None);
    assert_eq!(second.duration, None);
    assert_eq!(second.view_count, None);
  }

  #[test]
  fn test_extract_search_page_unknown_shape() {
    assert!(extract_search_page(&json!({ "error": "nope" })).items.is_empty());
  }

  #[test]
  fn test_extract_suggestions() {
    let body = json!(["rick", ["rick astley", "rick roll"]]);
    assert_eq!(extract_suggestions(&body), vec!["rick astley", "rick roll"]);
    assert!(extract_suggestions(&json!({})).is_empty());
  }

  #[test]
  fn test_extract_stream_info() {
    let body = json!({
      "playabilityStatus": { "status": "OK" },
      "videoDetails": {
        "videoId": "dQw4w9WgXcQ",
        "title": "Never Gonna Give You Up",
        "author": "Rick Astley",
        "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
        "lengthSeconds": "213",
        "viewCount": "1500000000",
        "shortDescription": "",
        "thumbnail": { "thumbnails": [{ "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg" }] }
      },
      "microformat": { "playerMicroformatRenderer": { "uploadDate": "2009-10-24T23:57:33-07:00" } },
      "streamingData": { "adaptiveFormats": [
        { "itag": 137, "mimeType": "video/mp4; codecs=\"avc1\"", "url": "https://v/137" },
        { "itag": 140, "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "averageBitrate": 129_475, "contentLength": "3433514", "url": "https://a/140" },
        { "itag": 251, "mimeType": "audio/webm; codecs=\"opus\"", "bitrate": 160_000, "signatureCipher": "s=ZYX&sp=sig&url=https%3A%2F%2Fa%2F251" },
        { "itag": 250, "mimeType": "audio/webm; codecs=\"opus\"" },
        { "itag": 4_294_967_436u64, "mimeType": "audio/mp4", "url": "https://a/overflow" }
      ] }
    });

    let info = extract_stream_info(&body).unwrap();
    assert_eq!(info.id, "dQw4w9WgXcQ");
    assert_eq!(info.length, 213);
    assert_eq!(info.view_count, Some(1_500_000_000));
    assert_eq!(info.description, None);
    assert_eq!(info.upload_date.as_deref(), Some("2009-10-24"));
    assert_eq!(
      info.uploader_url.as_deref(),
      Some("https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw")
    );

    assert_eq!(info.audio_streams.len(), 2);
    assert!(
      info
        .audio_streams
        .iter()
        .all(|r| r.source != RenditionSource::Direct("https://a/overflow".into()))
    );
    let m4a = &info.audio_streams[0];
    assert_eq!(m4a.itag, 140);
    assert_eq!(m4a.average_bitrate, Some(129));
    assert_eq!(m4a.content_length, Some(3_433_514));
    assert_eq!(m4a.format, AudioFormat::M4a);
    assert_eq!(m4a.source, RenditionSource::Direct("https://a/140".into()));

    let opus = &info.audio_streams[1];
    assert_eq!(opus.average_bitrate, Some(160));
    assert!(matches!(opus.source, RenditionSource::Cipher(_)));
  }

  #[test]
  fn test_extract_stream_info_missing_details() {
    let err = extract_stream_info(&json!({ "playabilityStatus": { "status": "ERROR" } })).unwrap_err();
    assert!(matches!(err, ConversionError::MissingField("videoDetails")));
  }

  #[test]
  fn test_playability() {
    let body = json!({ "playabilityStatus": { "status": "LOGIN_REQUIRED", "reason": "Sign in" } });
    assert_eq!(
      playability(&body),
      ("LOGIN_REQUIRED".to_string(), Some("Sign in".to_string()))
    );
  }
}
