use std::{
  sync::{Arc, LazyLock},
  time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::{
  common::ResolutionError,
  configs::YouTubeCipherConfig,
  sources::youtube::{
    downloader::{Downloader, StreamRequest},
    engine::PlayerScript,
    resolver::set_query_param,
  },
};

const PLAYER_SCRIPT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

static JS_URL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#""jsUrl":"([^"]+)""#).expect("valid regex"));
static LOCALE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"/([a-z]{2}_[A-Z]{2})/").expect("valid regex"));
static STS_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:signatureTimestamp|sts):(\d+)").expect("valid regex"));

#[derive(Clone)]
struct CachedPlayerScript {
  url: String,
  expires_at: Instant,
}

#[derive(Clone, Copy)]
struct CachedTimestamp {
  signature_timestamp: u32,
  expires_at: Instant,
}

/// [`PlayerScript`] that discovers the player script a video is served with
/// and delegates running it to a remote cipher service.
pub struct RemoteCipherManager {
  config: YouTubeCipherConfig,
  downloader: Arc<dyn Downloader>,
  player_scripts: DashMap<String, CachedPlayerScript>,
  /// Keyed by player script URL; many videos share one script.
  timestamps: DashMap<String, CachedTimestamp>,
  timestamp_fetch: Mutex<()>,
}

impl RemoteCipherManager {
  pub fn new(config: YouTubeCipherConfig, downloader: Arc<dyn Downloader>) -> Self {
    Self {
      config,
      downloader,
      player_scripts: DashMap::new(),
      timestamps: DashMap::new(),
      timestamp_fetch: Mutex::new(()),
    }
  }

  fn deobfuscation_error(video_id: &str, reason: impl ToString) -> ResolutionError {
    ResolutionError::Deobfuscation {
      video_id: video_id.to_string(),
      reason: reason.to_string(),
    }
  }

  /// Player script URL for `video_id`, cached for a day.
  pub async fn player_script_url(&self, video_id: &str) -> Result<String, ResolutionError> {
    if let Some(cached) = self.player_scripts.get(video_id) {
      if Instant::now() < cached.expires_at {
        return Ok(cached.url.clone());
      }
    }

    let url = self.fetch_player_script_url(video_id).await?;
    let now = Instant::now();
    self.player_scripts.retain(|_, cached| now < cached.expires_at);
    self.player_scripts.insert(
      video_id.to_string(),
      CachedPlayerScript {
        url: url.clone(),
        expires_at: now + PLAYER_SCRIPT_TTL,
      },
    );
    Ok(url)
  }

  async fn fetch_player_script_url(&self, video_id: &str) -> Result<String, ResolutionError> {
    let pages = [
      format!("https://www.youtube.com/embed/{}", video_id),
      format!("https://www.youtube.com/watch?v={}", video_id),
    ];

    for page in pages {
      let response = self
        .downloader
        .execute(StreamRequest::get(&page))
        .await
        .map_err(|e| Self::deobfuscation_error(video_id, e))?;

      if let Some(script_url) = extract_player_script_url(&response.text()) {
        debug!("Player script for {}: {}", video_id, script_url);
        return Ok(script_url);
      }
    }

    Err(Self::deobfuscation_error(
      video_id,
      "could not find jsUrl in player page",
    ))
  }

  fn service_url(&self, video_id: &str, path: &str) -> Result<String, ResolutionError> {
    let base = self
      .config
      .url
      .as_deref()
      .ok_or_else(|| Self::deobfuscation_error(video_id, "cipher service url not configured"))?;
    Ok(format!("{}/{}", base.trim_end_matches('/'), path))
  }

  async fn call_service(
    &self,
    video_id: &str,
    path: &str,
    body: Value,
  ) -> Result<Value, ResolutionError> {
    let mut request = StreamRequest::post_json(self.service_url(video_id, path)?, &body);
    if let Some(token) = &self.config.token {
      request = request.header("Authorization", token.as_str());
    }

    let response = self
      .downloader
      .execute(request)
      .await
      .map_err(|e| Self::deobfuscation_error(video_id, e))?
      .error_for_status()
      .map_err(|e| Self::deobfuscation_error(video_id, e))?;

    response
      .json()
      .map_err(|e| Self::deobfuscation_error(video_id, e))
  }

  fn cached_timestamp(&self, player_url: &str) -> Option<u32> {
    self
      .timestamps
      .get(player_url)
      .filter(|cached| Instant::now() < cached.expires_at)
      .map(|cached| cached.signature_timestamp)
  }

  async fn fetch_signature_timestamp(
    &self,
    video_id: &str,
    player_url: &str,
  ) -> Result<u32, ResolutionError> {
    let sts = if self.config.url.is_some() {
      let body = self
        .call_service(video_id, "get_sts", json!({ "player_url": player_url }))
        .await?;
      body
        .get("sts")
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string())))
        .ok_or_else(|| Self::deobfuscation_error(video_id, "service returned no sts"))?
    } else {
      let script = self
        .downloader
        .execute(StreamRequest::get(player_url))
        .await
        .map_err(|e| Self::deobfuscation_error(video_id, e))?
        .text();
      STS_RE
        .captures(&script)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Self::deobfuscation_error(video_id, "could not find sts in player script"))?
    };

    debug!("Signature timestamp for {}: {}", player_url, sts);
    sts
      .parse::<u32>()
      .map_err(|e| Self::deobfuscation_error(video_id, e))
  }
}

/// Absolute, locale-neutral player script URL from a watch or embed page.
pub fn extract_player_script_url(page: &str) -> Option<String> {
  let raw = JS_URL_RE.captures(page)?.get(1)?.as_str();
  let script_url = LOCALE_RE.replace(raw, "/en_US/").to_string();

  Some(if script_url.starts_with("http") {
    script_url
  } else {
    format!("https://www.youtube.com{}", script_url)
  })
}

#[async_trait]
impl PlayerScript for RemoteCipherManager {
  async fn deobfuscate_signature(
    &self,
    video_id: &str,
    obfuscated: &str,
  ) -> Result<String, ResolutionError> {
    let player_url = self.player_script_url(video_id).await?;
    let body = self
      .call_service(
        video_id,
        "decrypt_signature",
        json!({
          "encrypted_signature": obfuscated,
          "n_param": "",
          "player_url": player_url,
        }),
      )
      .await?;

    body
      .get("decrypted_signature")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .map(str::to_string)
      .ok_or_else(|| Self::deobfuscation_error(video_id, "service returned no signature"))
  }

  async fn deobfuscate_throttling(&self, video_id: &str, url: &str) -> Result<String, ResolutionError> {
    let throttling_error = |reason: String| ResolutionError::Throttling {
      video_id: video_id.to_string(),
      reason,
    };

    let parsed = Url::parse(url).map_err(|e| ResolutionError::InvalidUrl {
      url: url.to_string(),
      reason: e.to_string(),
    })?;
    let Some(n) = parsed
      .query_pairs()
      .find(|(k, _)| k == "n")
      .map(|(_, v)| v.into_owned())
    else {
      return Ok(url.to_string());
    };

    let player_url = self
      .player_script_url(video_id)
      .await
      .map_err(|e| throttling_error(e.to_string()))?;
    let body = self
      .call_service(
        video_id,
        "decrypt_signature",
        json!({
          "encrypted_signature": "",
          "n_param": n,
          "player_url": player_url,
        }),
      )
      .await
      .map_err(|e| throttling_error(e.to_string()))?;

    let decoded = body
      .get("decrypted_n_sig")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .ok_or_else(|| throttling_error("service returned no n value".to_string()))?;

    set_query_param(url, "n", decoded)
  }

  async fn signature_timestamp(&self, video_id: &str) -> Result<u32, ResolutionError> {
    let player_url = self.player_script_url(video_id).await?;
    if let Some(sts) = self.cached_timestamp(&player_url) {
      return Ok(sts);
    }

    let _guard = self.timestamp_fetch.lock().await;
    // another caller may have filled it while we waited
    if let Some(sts) = self.cached_timestamp(&player_url) {
      return Ok(sts);
    }

    let sts = self.fetch_signature_timestamp(video_id, &player_url).await?;
    let now = Instant::now();
    self.timestamps.retain(|_, cached| now < cached.expires_at);
    self.timestamps.insert(
      player_url,
      CachedTimestamp {
        signature_timestamp: sts,
        expires_at: now + PLAYER_SCRIPT_TTL,
      },
    );
    Ok(sts)
  }
}
