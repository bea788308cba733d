use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
  common::ExtensionError,
  configs::sources::YouTubeConfig,
  sources::youtube::{
    downloader::{Downloader, StreamRequest},
    engine::{
      ENGINE_API_VERSION, ExtractionEngine, PlayerScript, RenditionSource, SearchPage, StreamInfo,
    },
    extractor::{extract_search_page, extract_stream_info, extract_suggestions, playability},
    utils::{VideoId, encode_url_parameter},
  },
};

pub const INNERTUBE_API: &str = "https://www.youtube.com/youtubei/v1";
const SUGGEST_API: &str = "https://suggestqueries-clients6.youtube.com/complete/search";

const CLIENT_NAME: &str = "WEB";
const CLIENT_ID: &str = "1";
const CLIENT_VERSION: &str = "2.20260114.01.00";
/// Restricts search results to videos.
const VIDEO_FILTER_PARAMS: &str = "EgIQAQ%3D%3D";

/// Extraction engine speaking the web client's InnerTube API. All traffic
/// goes through the injected [`Downloader`].
pub struct InnertubeEngine {
  downloader: Arc<dyn Downloader>,
  player: Arc<dyn PlayerScript>,
  hl: String,
  gl: String,
}

impl InnertubeEngine {
  pub fn new(
    config: &YouTubeConfig,
    downloader: Arc<dyn Downloader>,
    player: Arc<dyn PlayerScript>,
  ) -> Self {
    Self {
      downloader,
      player,
      hl: config.hl.clone(),
      gl: config.gl.clone(),
    }
  }

  fn context(&self) -> Value {
    json!({
      "client": {
        "clientName": CLIENT_NAME,
        "clientVersion": CLIENT_VERSION,
        "platform": "DESKTOP",
        "hl": self.hl,
        "gl": self.gl,
      }
    })
  }

  async fn post(&self, endpoint: &str, body: Value, referer: Option<String>) -> Result<Value, ExtensionError> {
    let url = format!("{}/{}?prettyPrint=false", INNERTUBE_API, endpoint);
    debug!("InnerTube POST {}", url);

    let mut request = StreamRequest::post_json(&url, &body)
      .header("X-YouTube-Client-Name", CLIENT_ID)
      .header("X-YouTube-Client-Version", CLIENT_VERSION)
      .header("Origin", "https://www.youtube.com");
    if let Some(referer) = referer {
      request = request.header("Referer", referer);
    }

    let response = self.downloader.execute(request).await?.error_for_status()?;
    Ok(response.json()?)
  }

  /// Direct URLs can still carry an encoded `n`; a failed decode keeps the
  /// raw URL, which plays but may be throttled.
  async fn decode_direct_urls(&self, info: &mut StreamInfo) {
    for rendition in &mut info.audio_streams {
      let RenditionSource::Direct(url) = &rendition.source else {
        continue;
      };
      match self.player.deobfuscate_throttling(&info.id, url).await {
        Ok(decoded) => rendition.source = RenditionSource::Direct(decoded),
        Err(e) => warn!("Keeping throttled url for itag {}: {}", rendition.itag, e),
      }
    }
  }
}

#[async_trait]
impl ExtractionEngine for InnertubeEngine {
  fn api_version(&self) -> u32 {
    ENGINE_API_VERSION
  }

  async fn search(&self, query: &str) -> Result<SearchPage, ExtensionError> {
    let body = json!({
      "context": self.context(),
      "query": query,
      "params": VIDEO_FILTER_PARAMS,
    });

    let response = self.post("search", body, None).await?;
    let page = extract_search_page(&response);
    debug!("Search '{}' returned {} items", query, page.items.len());
    Ok(page)
  }

  async fn suggestions(&self, query: &str) -> Result<Vec<String>, ExtensionError> {
    let url = format!(
      "{}?client=firefox&ds=yt&hl={}&gl={}&q={}",
      SUGGEST_API,
      self.hl,
      self.gl,
      encode_url_parameter(query)
    );

    let response = self
      .downloader
      .execute(StreamRequest::get(url))
      .await?
      .error_for_status()?;
    Ok(extract_suggestions(&response.json()?))
  }

  async fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtensionError> {
    let video_id = VideoId::from_url_or_id(url)
      .ok_or_else(|| ExtensionError::NotFound(format!("no video id in {}", url)))?;

    let mut body = json!({
      "context": self.context(),
      "videoId": video_id.as_str(),
      "contentCheckOk": true,
      "racyCheckOk": true,
    });

    match self.player.signature_timestamp(video_id.as_str()).await {
      Ok(sts) => {
        body["playbackContext"] = json!({
          "contentPlaybackContext": { "signatureTimestamp": sts }
        });
      }
      Err(e) => warn!("No signature timestamp for {}: {}", video_id, e),
    }

    let response = self
      .post("player", body, Some(video_id.watch_url()))
      .await?;

    let (status, reason) = playability(&response);
    if status != "OK" {
      return Err(ExtensionError::NotFound(format!(
        "{} is {}: {}",
        video_id,
        status,
        reason.unwrap_or_default()
      )));
    }

    let mut info = extract_stream_info(&response)?;
    self.decode_direct_urls(&mut info).await;
    Ok(info)
  }
}
