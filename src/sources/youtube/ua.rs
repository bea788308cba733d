use crate::common::http::DEFAULT_USER_AGENT;

/// Sent with every page/API request; the platform rejects clients that look
/// less like a desktop browser.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
  ("User-Agent", DEFAULT_USER_AGENT),
  (
    "Accept",
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
  ),
  ("Accept-Language", "en-US,en;q=0.5"),
  ("Accept-Encoding", "gzip, deflate, br"),
  ("Connection", "keep-alive"),
  ("Upgrade-Insecure-Requests", "1"),
  ("Sec-Fetch-Dest", "document"),
  ("Sec-Fetch-Mode", "navigate"),
  ("Sec-Fetch-Site", "none"),
  ("Sec-Fetch-User", "?1"),
  ("Cache-Control", "max-age=0"),
];

pub const MEDIA_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Headers the CDN expects on progressive audio fetches.
pub const MEDIA_HEADERS: &[(&str, &str)] = &[
  ("User-Agent", MEDIA_USER_AGENT),
  (
    "Accept",
    "audio/webm,audio/ogg,audio/wav,audio/*;q=0.9,application/ogg;q=0.7,video/*;q=0.6,*/*;q=0.5",
  ),
  ("Accept-Language", "en-US,en;q=0.5"),
  ("Accept-Encoding", "gzip, deflate, br"),
  ("Connection", "keep-alive"),
  ("Sec-Fetch-Dest", "audio"),
  ("Sec-Fetch-Mode", "no-cors"),
  ("Sec-Fetch-Site", "cross-site"),
  ("Referer", "https://www.youtube.com/"),
];

pub fn media_headers() -> Vec<(String, String)> {
  MEDIA_HEADERS
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
