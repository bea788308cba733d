use thiserror::Error;

/// Network or server-side failure while talking to the upstream.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request to {url} failed: {source}")]
  Network {
    url: String,
    #[source]
    source: reqwest::Error,
  },
  #[error("{url} responded with HTTP {status}")]
  Status { url: String, status: u16 },
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

/// The upstream answered 429 and wants a challenge solved before serving more.
#[derive(Debug, Error)]
#[error("reCaptcha challenge requested by {url}")]
pub struct RateLimitedError {
  pub url: String,
}

/// Everything a [`Downloader`](crate::sources::youtube::downloader::Downloader)
/// call can fail with.
#[derive(Debug, Error)]
pub enum DownloadError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  RateLimited(#[from] RateLimitedError),
}

impl DownloadError {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, Self::RateLimited(_))
  }
}

/// Failure to turn a rendition into a playable URL.
#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("cipher blob is missing the `{0}` field")]
  MissingCipherField(&'static str),
  #[error("rendition {itag} carries neither a url nor a cipher blob")]
  MissingUrl { itag: u32 },
  #[error("signature deobfuscation failed for {video_id}: {reason}")]
  Deobfuscation { video_id: String, reason: String },
  #[error("throttling parameter decode failed for {video_id}: {reason}")]
  Throttling { video_id: String, reason: String },
  #[error("invalid stream url `{url}`: {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// Failure to map raw extraction records into host entities.
#[derive(Debug, Error)]
pub enum ConversionError {
  #[error("raw record is missing required field `{0}`")]
  MissingField(&'static str),
  #[error("track {id} has no playable renditions")]
  NoPlayableRenditions { id: String },
}

#[derive(Debug, Error)]
pub enum ExtensionError {
  #[error(transparent)]
  Download(#[from] DownloadError),
  #[error(transparent)]
  Resolution(#[from] ResolutionError),
  #[error(transparent)]
  Conversion(#[from] ConversionError),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("extraction engine speaks api v{found}, expected v{expected}")]
  UnsupportedEngine { expected: u32, found: u32 },
}

impl From<TransportError> for ExtensionError {
  fn from(e: TransportError) -> Self {
    Self::Download(e.into())
  }
}

impl From<RateLimitedError> for ExtensionError {
  fn from(e: RateLimitedError) -> Self {
    Self::Download(e.into())
  }
}
