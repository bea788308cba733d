use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
  Method,
  header::{HeaderMap, HeaderName, HeaderValue},
};
use tracing::{debug, warn};

use crate::{
  common::{DownloadError, HttpClient, RateLimitedError, TransportError},
  configs::YouTubeConfig,
  sources::youtube::ua::BROWSER_HEADERS,
};

/// Header names with every value they were given, in insertion order.
///
/// Names compare case-insensitively; the first spelling seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMultimap {
  entries: Vec<(String, Vec<String>)>,
}

impl HeaderMultimap {
  pub fn new() -> Self {
    Self::default()
  }

  fn position(&self, name: &str) -> Option<usize> {
    self
      .entries
      .iter()
      .position(|(n, _)| n.eq_ignore_ascii_case(name))
  }

  /// Adds a value, keeping values already present under the same name.
  pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    match self.position(&name) {
      Some(i) => self.entries[i].1.push(value.into()),
      None => self.entries.push((name, vec![value.into()])),
    }
  }

  /// Replaces every value stored under `name`.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    match self.position(&name) {
      Some(i) => self.entries[i].1 = vec![value.into()],
      None => self.entries.push((name, vec![value.into()])),
    }
  }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.append(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .position(name)
      .and_then(|i| self.entries[i].1.first())
      .map(String::as_str)
  }

  pub fn get_all(&self, name: &str) -> &[String] {
    self
      .position(name)
      .map(|i| self.entries[i].1.as_slice())
      .unwrap_or(&[])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self
      .entries
      .iter()
      .map(|(n, v)| (n.as_str(), v.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl From<&HeaderMap> for HeaderMultimap {
  fn from(map: &HeaderMap) -> Self {
    let mut headers = Self::new();
    for (name, value) in map {
      headers.append(
        name.as_str(),
        String::from_utf8_lossy(value.as_bytes()).into_owned(),
      );
    }
    headers
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Head,
  Post,
}

impl From<HttpMethod> for Method {
  fn from(method: HttpMethod) -> Self {
    match method {
      HttpMethod::Get => Method::GET,
      HttpMethod::Head => Method::HEAD,
      HttpMethod::Post => Method::POST,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
  pub url: String,
  pub method: HttpMethod,
  pub headers: HeaderMultimap,
  pub body: Option<Bytes>,
}

impl StreamRequest {
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      method: HttpMethod::Get,
      headers: HeaderMultimap::new(),
      body: None,
    }
  }

  pub fn head(url: impl Into<String>) -> Self {
    Self {
      method: HttpMethod::Head,
      ..Self::get(url)
    }
  }

  pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
    Self {
      url: url.into(),
      method: HttpMethod::Post,
      headers: HeaderMultimap::new().with("Content-Type", "application/json"),
      body: Some(Bytes::from(body.to_string())),
    }
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.append(name, value);
    self
  }
}

#[derive(Debug, Clone)]
pub struct StreamResponse {
  pub status_code: u16,
  pub status_message: String,
  pub headers: HeaderMultimap,
  pub body: Bytes,
  /// URL after redirects.
  pub final_url: String,
}

impl StreamResponse {
  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }

  pub fn json(&self) -> Result<serde_json::Value, TransportError> {
    serde_json::from_slice(&self.body).map_err(|e| {
      TransportError::InvalidRequest(format!("{} returned malformed JSON: {}", self.final_url, e))
    })
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status_code)
  }

  /// Turns any non-2xx answer into [`TransportError::Status`].
  pub fn error_for_status(self) -> Result<Self, TransportError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(TransportError::Status {
        url: self.final_url,
        status: self.status_code,
      })
    }
  }
}

/// Executes HTTP requests on behalf of the extraction engine.
///
/// Implementations return `Ok` for every answer except 429, which is a
/// [`RateLimitedError`], and 5xx, which is a [`TransportError::Status`].
#[async_trait]
pub trait Downloader: Send + Sync {
  async fn execute(&self, request: StreamRequest) -> Result<StreamResponse, DownloadError>;

  /// HEAD probe; any failure counts as inaccessible.
  async fn is_url_accessible(&self, url: &str) -> bool {
    match self.execute(StreamRequest::head(url)).await {
      Ok(response) => response.is_success(),
      Err(e) => {
        debug!("URL not accessible: {} ({})", url, e);
        false
      }
    }
  }
}

/// [`Downloader`] backed by a pooled `reqwest` client.
pub struct HttpDownloader {
  client: reqwest::Client,
  cookie: Option<String>,
}

impl HttpDownloader {
  pub fn new(config: &YouTubeConfig) -> Result<Self, TransportError> {
    let client = HttpClient::with_proxy(config.proxy.as_ref()).map_err(|e| {
      TransportError::InvalidRequest(format!("failed to build http client: {}", e))
    })?;

    Ok(Self::with_client(client, config.cookie.clone()))
  }

  pub fn with_client(client: reqwest::Client, cookie: Option<String>) -> Self {
    Self { client, cookie }
  }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TransportError> {
  let name = HeaderName::from_bytes(name.as_bytes())
    .map_err(|e| TransportError::InvalidRequest(format!("header name `{}`: {}", name, e)))?;
  let value = HeaderValue::from_str(value)
    .map_err(|e| TransportError::InvalidRequest(format!("header `{}` value: {}", name, e)))?;
  Ok((name, value))
}

/// Browser defaults first, then the request's own headers: a name given
/// several values replaces the default with all of them, a single value
/// overrides the default, and the cookie is appended last.
pub fn build_headers(
  request: &StreamRequest,
  cookie: Option<&str>,
) -> Result<HeaderMap, TransportError> {
  let mut map = HeaderMap::new();

  for (name, value) in BROWSER_HEADERS {
    let (name, value) = header_pair(name, value)?;
    map.append(name, value);
  }

  for (name, values) in request.headers.iter() {
    match values {
      [] => {}
      [single] => {
        let (name, value) = header_pair(name, single)?;
        map.insert(name, value);
      }
      many => {
        let (header_name, _) = header_pair(name, "")?;
        map.remove(&header_name);
        for value in many {
          let (name, value) = header_pair(name, value)?;
          map.append(name, value);
        }
      }
    }
  }

  if let Some(cookie) = cookie {
    let (name, value) = header_pair("Cookie", cookie)?;
    map.append(name, value);
  }

  Ok(map)
}

#[async_trait]
impl Downloader for HttpDownloader {
  async fn execute(&self, request: StreamRequest) -> Result<StreamResponse, DownloadError> {
    let headers = build_headers(&request, self.cookie.as_deref())?;
    debug!("{:?} {}", request.method, request.url);

    let mut builder = self
      .client
      .request(request.method.into(), &request.url)
      .headers(headers);
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|source| TransportError::Network {
      url: request.url.clone(),
      source,
    })?;

    let status = response.status();
    let final_url = response.url().to_string();

    if status.as_u16() == 429 {
      warn!("Rate limited by {}", request.url);
      return Err(RateLimitedError { url: request.url }.into());
    }
    if status.is_server_error() {
      return Err(
        TransportError::Status {
          url: final_url,
          status: status.as_u16(),
        }
        .into(),
      );
    }

    let headers = HeaderMultimap::from(response.headers());
    let body = response
      .bytes()
      .await
      .map_err(|source| TransportError::Network {
        url: final_url.clone(),
        source,
      })?;

    Ok(StreamResponse {
      status_code: status.as_u16(),
      status_message: status.canonical_reason().unwrap_or("").to_string(),
      headers,
      body,
      final_url,
    })
  }
}
