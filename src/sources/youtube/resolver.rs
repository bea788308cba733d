use std::{sync::Arc, time::SystemTime};

use futures::future::join_all;
use tracing::{debug, warn};
use url::Url;

use crate::{
  common::ResolutionError,
  sources::youtube::engine::{AudioRendition, PlayerScript, RenditionSource},
};

/// A playable URL computed for one rendition. Lives only as long as the
/// track load that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStreamUrl {
  pub itag: u32,
  pub playable_url: String,
  pub resolved_at: SystemTime,
}

/// A rendition that survived resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRendition {
  pub rendition: AudioRendition,
  pub resolved: ResolvedStreamUrl,
}

struct CipherParts {
  signature: String,
  signature_param: String,
  url: String,
}

fn parse_cipher(blob: &str) -> Result<CipherParts, ResolutionError> {
  let mut signature = None;
  let mut signature_param = None;
  let mut url = None;

  for (key, value) in url::form_urlencoded::parse(blob.as_bytes()) {
    match key.as_ref() {
      "s" => signature = Some(value.into_owned()),
      "sp" => signature_param = Some(value.into_owned()),
      "url" => url = Some(value.into_owned()),
      _ => {}
    }
  }

  Ok(CipherParts {
    signature: signature.ok_or(ResolutionError::MissingCipherField("s"))?,
    signature_param: signature_param.ok_or(ResolutionError::MissingCipherField("sp"))?,
    url: url.ok_or(ResolutionError::MissingCipherField("url"))?,
  })
}

/// Sets `name=value` on `url`, replacing any existing value for `name`.
pub fn set_query_param(url: &str, name: &str, value: &str) -> Result<String, ResolutionError> {
  let mut parsed = Url::parse(url).map_err(|e| ResolutionError::InvalidUrl {
    url: url.to_string(),
    reason: e.to_string(),
  })?;

  let kept: Vec<(String, String)> = parsed
    .query_pairs()
    .filter(|(k, _)| k != name)
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  parsed
    .query_pairs_mut()
    .clear()
    .extend_pairs(kept)
    .append_pair(name, value);

  Ok(parsed.to_string())
}

/// Turns audio renditions into playable URLs.
///
/// Holds no state of its own; everything video-specific lives behind the
/// [`PlayerScript`] collaborator.
#[derive(Clone)]
pub struct StreamResolver {
  player: Arc<dyn PlayerScript>,
}

impl StreamResolver {
  pub fn new(player: Arc<dyn PlayerScript>) -> Self {
    Self { player }
  }

  pub async fn resolve_stream_url(
    &self,
    rendition: &AudioRendition,
    video_id: &str,
  ) -> Result<ResolvedStreamUrl, ResolutionError> {
    let playable_url = match &rendition.source {
      RenditionSource::Direct(url) => {
        if url.is_empty() {
          return Err(ResolutionError::MissingUrl {
            itag: rendition.itag,
          });
        }
        url.clone()
      }
      RenditionSource::Cipher(blob) => self.resolve_cipher(blob, video_id).await?,
    };

    Ok(ResolvedStreamUrl {
      itag: rendition.itag,
      playable_url,
      resolved_at: SystemTime::now(),
    })
  }

  async fn resolve_cipher(&self, blob: &str, video_id: &str) -> Result<String, ResolutionError> {
    let parts = parse_cipher(blob)?;

    let signature = self
      .player
      .deobfuscate_signature(video_id, &parts.signature)
      .await?;
    let signed_url = set_query_param(&parts.url, &parts.signature_param, &signature)?;

    self
      .player
      .deobfuscate_throttling(video_id, &signed_url)
      .await
  }

  /// Resolves every rendition, dropping the ones that fail. The result is
  /// sorted by descending bitrate regardless of completion order.
  pub async fn resolve_all(
    &self,
    renditions: &[AudioRendition],
    video_id: &str,
  ) -> Vec<ResolvedRendition> {
    let results = join_all(
      renditions
        .iter()
        .map(|rendition| self.resolve_stream_url(rendition, video_id)),
    )
    .await;

    let mut resolved: Vec<ResolvedRendition> = renditions
      .iter()
      .zip(results)
      .filter_map(|(rendition, result)| match result {
        Ok(resolved) => Some(ResolvedRendition {
          rendition: rendition.clone(),
          resolved,
        }),
        Err(e) => {
          warn!(
            "Rendition {} of {} unavailable: {}",
            rendition.itag, video_id, e
          );
          None
        }
      })
      .collect();

    resolved.sort_by(|a, b| {
      b.rendition
        .bitrate()
        .cmp(&a.rendition.bitrate())
        .then(a.rendition.itag.cmp(&b.rendition.itag))
    });
    debug!(
      "Resolved {}/{} renditions for {}",
      resolved.len(),
      renditions.len(),
      video_id
    );
    resolved
  }
}
