use serde::{Deserialize, Serialize};

/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Audio containers a rendition can be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
  M4a,
  Webm,
  Mp3,
  Opus,
  Unknown,
}

impl AudioFormat {
  pub fn name(&self) -> &'static str {
    match self {
      Self::M4a => "M4A",
      Self::Webm => "WEBMA",
      Self::Mp3 => "MP3",
      Self::Opus => "OPUS",
      Self::Unknown => "Unknown",
    }
  }

  /// Detects the container from a mime type such as
  /// `audio/webm; codecs="opus"`.
  pub fn from_mime(mime: &str) -> Self {
    let essence = mime
      .split(';')
      .next()
      .unwrap_or(mime)
      .trim()
      .to_ascii_lowercase();

    match essence.as_str() {
      "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Self::M4a,
      "audio/webm" => Self::Webm,
      "audio/mpeg" | "audio/mp3" => Self::Mp3,
      "audio/ogg" | "audio/opus" => Self::Opus,
      _ => Self::Unknown,
    }
  }
}

impl std::fmt::Display for AudioFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_mime() {
    assert_eq!(
      AudioFormat::from_mime("audio/webm; codecs=\"opus\""),
      AudioFormat::Webm
    );
    assert_eq!(
      AudioFormat::from_mime("audio/mp4; codecs=\"mp4a.40.2\""),
      AudioFormat::M4a
    );
    assert_eq!(AudioFormat::from_mime("video/mp4"), AudioFormat::Unknown);
  }
}
