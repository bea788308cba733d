use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HttpProxyConfig {
  pub url: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
}

/// Remote service that runs the platform's player script for us.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct YouTubeCipherConfig {
  pub url: Option<String>,
  pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YouTubeConfig {
  #[serde(default)]
  pub cookie: Option<String>,
  #[serde(default)]
  pub proxy: Option<HttpProxyConfig>,
  #[serde(default)]
  pub cipher: YouTubeCipherConfig,
  #[serde(default = "default_search_limit")]
  pub search_limit: usize,
  #[serde(default = "default_quick_search_media_limit")]
  pub quick_search_media_limit: usize,
  #[serde(default = "default_suggestion_limit")]
  pub suggestion_limit: usize,
  /// Target bitrate in kbps used when picking a rendition for playback.
  #[serde(default = "default_preferred_bitrate")]
  pub preferred_bitrate: u32,
  #[serde(default = "default_hl")]
  pub hl: String,
  #[serde(default = "default_gl")]
  pub gl: String,
}

fn default_search_limit() -> usize {
  20
}

fn default_quick_search_media_limit() -> usize {
  3
}

fn default_suggestion_limit() -> usize {
  5
}

fn default_preferred_bitrate() -> u32 {
  128
}

fn default_hl() -> String {
  "en".to_string()
}

fn default_gl() -> String {
  "US".to_string()
}

impl Default for YouTubeConfig {
  fn default() -> Self {
    Self {
      cookie: None,
      proxy: None,
      cipher: YouTubeCipherConfig::default(),
      search_limit: default_search_limit(),
      quick_search_media_limit: default_quick_search_media_limit(),
      suggestion_limit: default_suggestion_limit(),
      preferred_bitrate: default_preferred_bitrate(),
      hl: default_hl(),
      gl: default_gl(),
    }
  }
}
