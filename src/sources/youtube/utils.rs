use std::sync::LazyLock;

use regex::Regex;

pub const VIDEO_ID_LEN: usize = 11;

/// Known URL shapes, tried in order.
static VIDEO_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  [
    r"youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})",
    r"youtu\.be/([A-Za-z0-9_-]{11})",
    r"youtube\.com/embed/([A-Za-z0-9_-]{11})",
    r"youtube\.com/v/([A-Za-z0-9_-]{11})",
    r"youtube\.com/shorts/([A-Za-z0-9_-]{11})",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("valid regex"))
  .collect()
});

/// A platform video id; always exactly 11 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
  /// Strict extraction: only the known URL shapes are accepted.
  pub fn parse(url: &str) -> Option<Self> {
    VIDEO_URL_PATTERNS
      .iter()
      .find_map(|re| re.captures(url))
      .and_then(|caps| caps.get(1))
      .map(|m| Self(m.as_str().to_string()))
  }

  /// Accepts either a known URL shape or a bare id.
  pub fn from_url_or_id(input: &str) -> Option<Self> {
    let input = input.trim();
    if input.len() == VIDEO_ID_LEN
      && input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
      return Some(Self(input.to_string()));
    }
    Self::parse(input)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn watch_url(&self) -> String {
    format!("https://www.youtube.com/watch?v={}", self.0)
  }
}

impl std::fmt::Display for VideoId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Best-effort id extraction.
///
/// Falls back to the last path segment cut to 11 characters when no known
/// shape matches. That fallback can produce a wrong id that still looks
/// valid; callers needing certainty should use [`VideoId::parse`].
pub fn extract_video_id(url: &str) -> String {
  if let Some(id) = VideoId::parse(url) {
    return id.0;
  }

  let path = url.split(['?', '#']).next().unwrap_or(url);
  path
    .rsplit('/')
    .next()
    .unwrap_or(path)
    .chars()
    .take(VIDEO_ID_LEN)
    .collect()
}

/// Parses `MM:SS`, `HH:MM:SS`, `45s`, `3m` or plain seconds into milliseconds.
pub fn parse_duration_to_millis(duration: &str) -> Option<u64> {
  let duration = duration.trim();
  if duration.is_empty() {
    return None;
  }

  let secs = if duration.contains(':') {
    let parts = duration
      .split(':')
      .map(|p| p.trim().parse::<u64>().ok())
      .collect::<Option<Vec<u64>>>()?;
    match parts.as_slice() {
      [m, s] => m.checked_mul(60)?.checked_add(*s)?,
      [h, m, s] => h
        .checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(*s)?,
      _ => return None,
    }
  } else if let Some(secs) = duration.strip_suffix('s') {
    secs.trim().parse::<u64>().ok()?
  } else if let Some(mins) = duration.strip_suffix('m') {
    mins.trim().parse::<u64>().ok()?.checked_mul(60)?
  } else {
    duration.parse::<u64>().ok()?
  };

  secs.checked_mul(1000)
}

/// Parses counts such as `1,234,567 views`.
pub fn parse_count(text: &str) -> Option<u64> {
  let digits: String = text
    .split_whitespace()
    .next()?
    .chars()
    .filter(char::is_ascii_digit)
    .collect();
  digits.parse().ok()
}

pub fn encode_url_parameter(input: &str) -> String {
  urlencoding::encode(input).into_owned()
}
