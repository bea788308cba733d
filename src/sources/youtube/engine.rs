//! Contract between the extension and the extraction engine.
//!
//! The engine owns page fetching and parsing; the extension only sees the raw
//! records defined here. The surface is versioned: an engine reporting a
//! different [`ExtractionEngine::api_version`] is refused at initialization.

use async_trait::async_trait;

use crate::common::{AudioFormat, ExtensionError, ResolutionError};

pub const ENGINE_API_VERSION: u32 = 1;

/// Where the bytes of a rendition can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionSource {
  /// Ready to fetch.
  Direct(String),
  /// `signatureCipher` query string that still needs deobfuscation.
  Cipher(String),
}

/// One encoded audio variant of a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRendition {
  pub itag: u32,
  pub mime_type: Option<String>,
  /// kbps
  pub average_bitrate: Option<u32>,
  pub content_length: Option<u64>,
  pub source: RenditionSource,
  pub format: AudioFormat,
}

impl AudioRendition {
  pub fn bitrate(&self) -> u32 {
    self.average_bitrate.unwrap_or(0)
  }
}

/// Compact search result entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfoItem {
  pub url: String,
  pub name: String,
  pub uploader_name: Option<String>,
  pub uploader_url: Option<String>,
  pub uploader_avatar_url: Option<String>,
  pub thumbnail_url: Option<String>,
  /// Seconds; `None` for live streams or when the page omitted it.
  pub duration: Option<u64>,
  pub view_count: Option<u64>,
  pub textual_upload_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoItem {
  Stream(StreamInfoItem),
  Channel { url: String, name: String },
  Playlist { url: String, name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
  pub items: Vec<InfoItem>,
}

impl SearchPage {
  pub fn streams(&self) -> impl Iterator<Item = &StreamInfoItem> {
    self.items.iter().filter_map(|item| match item {
      InfoItem::Stream(stream) => Some(stream),
      _ => None,
    })
  }
}

/// Everything known about one video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
  pub id: String,
  pub url: String,
  pub name: String,
  pub uploader_name: Option<String>,
  pub uploader_url: Option<String>,
  pub uploader_avatar_url: Option<String>,
  pub thumbnail_url: Option<String>,
  /// Seconds.
  pub length: u64,
  pub view_count: Option<u64>,
  pub like_count: Option<u64>,
  pub dislike_count: Option<u64>,
  pub description: Option<String>,
  /// ISO date (`YYYY-MM-DD`).
  pub upload_date: Option<String>,
  pub textual_upload_date: Option<String>,
  pub audio_streams: Vec<AudioRendition>,
}

#[async_trait]
pub trait ExtractionEngine: Send + Sync {
  fn api_version(&self) -> u32;

  /// First page of results for `query`.
  async fn search(&self, query: &str) -> Result<SearchPage, ExtensionError>;

  /// As-you-type query completions.
  async fn suggestions(&self, query: &str) -> Result<Vec<String>, ExtensionError>;

  /// Full info for a video URL, including raw audio renditions.
  async fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtensionError>;
}

/// Per-video player logic. Each video may be served by a different player
/// script version, so every call is keyed by video id.
#[async_trait]
pub trait PlayerScript: Send + Sync {
  async fn deobfuscate_signature(
    &self,
    video_id: &str,
    obfuscated: &str,
  ) -> Result<String, ResolutionError>;

  /// Rewrites the throttling parameter of `url`; URLs without one come back
  /// unchanged.
  async fn deobfuscate_throttling(&self, video_id: &str, url: &str) -> Result<String, ResolutionError>;

  async fn signature_timestamp(&self, video_id: &str) -> Result<u32, ResolutionError>;
}
