use std::sync::{
  Arc,
  atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::{
  common::{ConversionError, ExtensionError},
  configs::sources::YouTubeConfig,
  protocol::{
    feed::{Feed, QuickSearchItem},
    tracks::{Streamable, StreamableMedia, Track},
  },
  sources::plugin::{
    ExtensionClient, QuickSearchClient, SearchFeedClient, SettingItem, Settings, TrackClient,
  },
};

pub mod cipher;
pub mod converter;
pub mod downloader;
pub mod engine;
pub mod extractor;
pub mod innertube;
pub mod resolver;
pub mod search;
pub mod ua;
pub mod utils;

use cipher::RemoteCipherManager;
use converter::{YouTubeConverter, resolved_by_quality, to_streamable_media};
use downloader::{Downloader, HttpDownloader};
use engine::{ENGINE_API_VERSION, ExtractionEngine, PlayerScript};
use innertube::InnertubeEngine;
use resolver::{ResolvedRendition, StreamResolver};
use search::SearchOrchestrator;

pub const PREFERRED_BITRATE_KEY: &str = "preferred_bitrate";

pub struct YouTubeExtension {
  engine: Arc<dyn ExtractionEngine>,
  resolver: StreamResolver,
  converter: YouTubeConverter,
  search: SearchOrchestrator,
  default_bitrate: u32,
  preferred_bitrate: AtomicU32,
}

impl YouTubeExtension {
  /// Wires the HTTP downloader, remote cipher and InnerTube engine together.
  pub fn new(config: YouTubeConfig) -> Result<Self, ExtensionError> {
    let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::new(&config)?);
    let player: Arc<dyn PlayerScript> = Arc::new(RemoteCipherManager::new(
      config.cipher.clone(),
      downloader.clone(),
    ));
    let engine = Arc::new(InnertubeEngine::new(&config, downloader, player.clone()));

    Ok(Self::with_engine(&config, engine, player))
  }

  pub fn with_engine(
    config: &YouTubeConfig,
    engine: Arc<dyn ExtractionEngine>,
    player: Arc<dyn PlayerScript>,
  ) -> Self {
    let resolver = StreamResolver::new(player);
    let converter = YouTubeConverter::new(resolver.clone());
    let search = SearchOrchestrator::new(engine.clone(), converter.clone(), config);

    Self {
      engine,
      resolver,
      converter,
      search,
      default_bitrate: config.preferred_bitrate,
      preferred_bitrate: AtomicU32::new(config.preferred_bitrate),
    }
  }

  pub fn preferred_bitrate(&self) -> u32 {
    self.preferred_bitrate.load(Ordering::Relaxed)
  }

  /// Resolves the video behind `streamable` again and picks a rendition:
  /// the same itag when the streamable names one, else the closest to the
  /// preferred bitrate.
  async fn resolve_media(&self, streamable: &Streamable) -> Result<StreamableMedia, ExtensionError> {
    let video_url = streamable
      .extras
      .get("videoUrl")
      .ok_or(ConversionError::MissingField("videoUrl"))?;

    let info = self.engine.stream_info(video_url).await?;
    let resolved = self.resolver.resolve_all(&info.audio_streams, &info.id).await;

    let wanted_itag = streamable
      .extras
      .get("itag")
      .and_then(|itag| itag.parse::<u32>().ok());
    let picked = wanted_itag
      .and_then(|itag| resolved.iter().find(|r| r.rendition.itag == itag))
      .or_else(|| resolved_by_quality(&resolved, self.preferred_bitrate()))
      .ok_or(ConversionError::NoPlayableRenditions { id: info.id.clone() })?;

    Ok(media_for(picked))
  }
}

fn media_for(resolved: &ResolvedRendition) -> StreamableMedia {
  debug!(
    "Serving itag {} at {}kbps",
    resolved.rendition.itag,
    resolved.rendition.bitrate()
  );
  StreamableMedia {
    uri: resolved.resolved.playable_url.clone(),
    headers: ua::media_headers(),
  }
}

#[async_trait]
impl ExtensionClient for YouTubeExtension {
  async fn on_initialize(&self) -> Result<(), ExtensionError> {
    let found = self.engine.api_version();
    if found != ENGINE_API_VERSION {
      error!(
        "Refusing extraction engine v{} (need v{})",
        found, ENGINE_API_VERSION
      );
      return Err(ExtensionError::UnsupportedEngine {
        expected: ENGINE_API_VERSION,
        found,
      });
    }

    info!(
      "YouTube extension ready (engine v{}, {}kbps preferred)",
      found,
      self.preferred_bitrate()
    );
    Ok(())
  }

  fn set_settings(&self, settings: &Settings) {
    let bitrate = settings
      .get_u32(PREFERRED_BITRATE_KEY)
      .unwrap_or(self.default_bitrate);
    self.preferred_bitrate.store(bitrate, Ordering::Relaxed);
  }

  fn get_setting_items(&self) -> Vec<SettingItem> {
    vec![SettingItem {
      key: PREFERRED_BITRATE_KEY.to_string(),
      title: "Preferred bitrate".to_string(),
      summary: Some("Audio quality in kbps picked when a track starts playing".to_string()),
      default_value: self.default_bitrate.to_string(),
    }]
  }
}

#[async_trait]
impl SearchFeedClient for YouTubeExtension {
  async fn load_search_feed(&self, query: &str) -> Result<Feed, ExtensionError> {
    Ok(self.search.search_feed(query).await)
  }
}

#[async_trait]
impl TrackClient for YouTubeExtension {
  async fn load_track(&self, track: &Track, _refresh: bool) -> Result<Track, ExtensionError> {
    let info = self.engine.stream_info(&track.id).await.map_err(|e| {
      error!("Loading {} failed: {}", track.id, e);
      e
    })?;
    Ok(self.converter.to_detailed_track(&info).await)
  }

  async fn load_streamable_media(
    &self,
    streamable: &Streamable,
    refresh: bool,
  ) -> Result<StreamableMedia, ExtensionError> {
    if !refresh {
      if let Ok(media) = to_streamable_media(streamable) {
        return Ok(media);
      }
    }

    self.resolve_media(streamable).await.map_err(|e| {
      error!("Media for {} unavailable: {}", streamable.id, e);
      e
    })
  }

  async fn load_feed(&self, _track: &Track) -> Result<Option<Feed>, ExtensionError> {
    Ok(None)
  }
}

#[async_trait]
impl QuickSearchClient for YouTubeExtension {
  async fn quick_search(&self, query: &str) -> Result<Vec<QuickSearchItem>, ExtensionError> {
    Ok(self.search.quick_search(query).await)
  }

  async fn delete_quick_search(&self, _item: &QuickSearchItem) -> Result<(), ExtensionError> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::sources::youtube::{resolver::tests::FakePlayer, search::tests::FakeEngine};

  fn extension(engine: FakeEngine) -> YouTubeExtension {
    YouTubeExtension::with_engine(
      &YouTubeConfig::default(),
      Arc::new(engine),
      Arc::new(FakePlayer::default()),
    )
  }

  #[tokio::test]
  async fn test_initialize_checks_engine_version() {
    assert!(extension(FakeEngine::default()).on_initialize().await.is_ok());

    let err = extension(FakeEngine {
      version: ENGINE_API_VERSION + 1,
      ..Default::default()
    })
    .on_initialize()
    .await
    .unwrap_err();
    assert!(matches!(
      err,
      ExtensionError::UnsupportedEngine { expected: ENGINE_API_VERSION, .. }
    ));
  }

  #[tokio::test]
  async fn test_search_then_load_reports_playability() {
    let ext = extension(FakeEngine::default());
    let feed = ext.load_search_feed("test").await.unwrap();
    let tracks: Vec<Track> = feed.tracks().cloned().collect();
    assert!(!tracks.is_empty() && tracks.len() <= 20);

    for track in tracks.iter().take(4) {
      let loaded = ext.load_track(track, false).await.unwrap();
      assert_eq!(loaded.is_playable(), !loaded.streamables.is_empty());
    }

    let even = ext.load_track(&tracks[0], false).await.unwrap();
    let odd = ext.load_track(&tracks[1], false).await.unwrap();
    assert!(even.is_playable());
    assert!(!odd.is_playable());
  }

  #[tokio::test]
  async fn test_cipher_rendition_gets_signature() {
    let ext = extension(FakeEngine::default());
    let feed = ext.load_search_feed("test").await.unwrap();
    let track = ext
      .load_track(feed.tracks().next().unwrap(), false)
      .await
      .unwrap();

    let streamable = track
      .streamables
      .iter()
      .find(|s| s.id == "audio_140_128")
      .unwrap();
    let media = ext.load_streamable_media(streamable, false).await.unwrap();
    assert!(media.uri.contains("sig=XYZ"));
  }

  #[tokio::test]
  async fn test_placeholder_uses_preferred_bitrate() {
    let ext = extension(FakeEngine::default());
    let feed = ext.load_search_feed("test").await.unwrap();
    let placeholder = feed.tracks().next().unwrap().streamables[0].clone();

    let media = ext.load_streamable_media(&placeholder, false).await.unwrap();
    assert!(media.uri.contains("sig=XYZ"));

    ext.set_settings(&Settings(BTreeMap::from([(
      PREFERRED_BITRATE_KEY.to_string(),
      "192".to_string(),
    )])));
    let media = ext.load_streamable_media(&placeholder, false).await.unwrap();
    assert_eq!(media.uri, "https://rr1.googlevideo.com/251");

    ext.set_settings(&Settings::default());
    assert_eq!(ext.preferred_bitrate(), 128);
  }

  #[tokio::test]
  async fn test_refresh_keeps_the_same_itag() {
    let ext = extension(FakeEngine::default());
    let feed = ext.load_search_feed("test").await.unwrap();
    let track = ext
      .load_track(feed.tracks().next().unwrap(), false)
      .await
      .unwrap();
    let low = track
      .streamables
      .iter()
      .find(|s| s.id == "audio_249_50")
      .unwrap();

    let media = ext.load_streamable_media(low, true).await.unwrap();
    assert_eq!(media.uri, "https://rr1.googlevideo.com/249");
  }

  #[tokio::test]
  async fn test_unplayable_placeholder_fails() {
    let ext = extension(FakeEngine::default());
    let feed = ext.load_search_feed("test").await.unwrap();
    let placeholder = feed.tracks().nth(1).unwrap().streamables[0].clone();

    let err = ext
      .load_streamable_media(&placeholder, false)
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      ExtensionError::Conversion(ConversionError::NoPlayableRenditions { .. })
    ));
  }

  #[tokio::test]
  async fn test_host_surface_defaults() {
    let ext = extension(FakeEngine::default());
    let track = ext.load_search_feed("test").await.unwrap().tracks().next().cloned().unwrap();

    assert!(ext.load_feed(&track).await.unwrap().is_none());
    assert!(ext.quick_search("").await.unwrap().is_empty());

    let item = QuickSearchItem::Query {
      query: "lofi".into(),
      searched: true,
      extras: Default::default(),
    };
    assert!(ext.delete_quick_search(&item).await.is_ok());

    let items = ext.get_setting_items();
    assert_eq!(items[0].key, PREFERRED_BITRATE_KEY);
    assert_eq!(items[0].default_value, "128");
  }

  #[tokio::test]
  async fn test_load_track_propagates_errors() {
    let ext = extension(FakeEngine::default());
    let mut track = ext.load_search_feed("test").await.unwrap().tracks().next().cloned().unwrap();
    track.id = "https://www.youtube.com/watch?v=notanumber".into();

    assert!(ext.load_track(&track, false).await.is_err());
  }
}
