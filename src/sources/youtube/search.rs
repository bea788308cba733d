use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{
  common::ExtensionError,
  configs::sources::YouTubeConfig,
  protocol::{
    feed::{Feed, QuickSearchItem},
    tracks::{Extras, Track},
  },
  sources::youtube::{converter::YouTubeConverter, engine::ExtractionEngine},
};

/// Queries shorter than this only get suggestions in quick search.
const MIN_MEDIA_QUERY_LEN: usize = 3;

fn hint_extras(kind: &str) -> Extras {
  Extras::from([
    ("source".to_string(), "youtube".to_string()),
    ("type".to_string(), kind.to_string()),
  ])
}

pub struct SearchOrchestrator {
  engine: Arc<dyn ExtractionEngine>,
  converter: YouTubeConverter,
  search_limit: usize,
  media_limit: usize,
  suggestion_limit: usize,
}

impl SearchOrchestrator {
  pub fn new(engine: Arc<dyn ExtractionEngine>, converter: YouTubeConverter, config: &YouTubeConfig) -> Self {
    Self {
      engine,
      converter,
      search_limit: config.search_limit,
      media_limit: config.quick_search_media_limit,
      suggestion_limit: config.suggestion_limit,
    }
  }

  /// First page of results as tracks, in engine order.
  pub async fn search(&self, query: &str) -> Result<Vec<Track>, ExtensionError> {
    let query = query.trim();
    if query.is_empty() {
      return Ok(Vec::new());
    }

    let page = self.engine.search(query).await?;
    Ok(
      page
        .streams()
        .take(self.search_limit)
        .map(|item| self.converter.to_track(item))
        .collect(),
    )
  }

  /// Never fails: a broken search shows up as an empty feed.
  pub async fn search_feed(&self, query: &str) -> Feed {
    match self.search(query).await {
      Ok(tracks) => {
        debug!("Search feed for '{}' has {} tracks", query, tracks.len());
        Feed::search(tracks)
      }
      Err(e) => {
        error!("Search for '{}' failed: {}", query, e);
        Feed::empty()
      }
    }
  }

  async fn suggestion_hints(&self, query: &str) -> Vec<QuickSearchItem> {
    match self.engine.suggestions(query).await {
      Ok(suggestions) => suggestions
        .into_iter()
        .take(self.suggestion_limit)
        .map(|query| QuickSearchItem::Query {
          query,
          searched: false,
          extras: hint_extras("suggestion"),
        })
        .collect(),
      Err(e) => {
        warn!("Suggestions for '{}' unavailable: {}", query, e);
        Vec::new()
      }
    }
  }

  async fn media_items(&self, query: &str) -> Vec<QuickSearchItem> {
    if query.chars().count() < MIN_MEDIA_QUERY_LEN {
      return Vec::new();
    }

    match self.search(query).await {
      Ok(tracks) => tracks
        .into_iter()
        .take(self.media_limit)
        .map(|track| QuickSearchItem::Media {
          media: Box::new(track),
          searched: false,
        })
        .collect(),
      Err(e) => {
        warn!("Quick search for '{}' fell back: {}", query, e);
        let mut extras = hint_extras("fallback");
        extras.insert("error".to_string(), e.to_string());
        vec![QuickSearchItem::Query {
          query: query.to_string(),
          searched: false,
          extras,
        }]
      }
    }
  }

  /// Query hints first, then up to `quick_search_media_limit` tracks.
  pub async fn quick_search(&self, query: &str) -> Vec<QuickSearchItem> {
    let query = query.trim();
    if query.is_empty() {
      return Vec::new();
    }

    let (mut items, media) = tokio::join!(self.suggestion_hints(query), self.media_items(query));
    items.extend(media);
    items
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;

  use super::*;
  use crate::{
    common::{ExtensionError, RateLimitedError},
    sources::youtube::{
      engine::{
        ENGINE_API_VERSION, InfoItem, RenditionSource, SearchPage, StreamInfo, StreamInfoItem,
      },
      resolver::{
        StreamResolver,
        tests::{FakePlayer, rendition},
      },
    },
  };

  /// Engine returning `results` canned videos; the second of every pair only
  /// offers a cipher blob without `sp`, so it never resolves.
  pub(crate) struct FakeEngine {
    pub version: u32,
    pub results: usize,
    pub fail_search: bool,
    pub fail_suggestions: bool,
    pub calls: AtomicUsize,
  }

  impl Default for FakeEngine {
    fn default() -> Self {
      Self {
        version: ENGINE_API_VERSION,
        results: 25,
        fail_search: false,
        fail_suggestions: false,
        calls: AtomicUsize::new(0),
      }
    }
  }

  pub(crate) fn video_id(i: usize) -> String {
    format!("vid{:08}", i)
  }

  #[async_trait]
  impl ExtractionEngine for FakeEngine {
    fn api_version(&self) -> u32 {
      self.version
    }

    async fn search(&self, query: &str) -> Result<SearchPage, ExtensionError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_search {
        return Err(
          RateLimitedError {
            url: "https://www.youtube.com/youtubei/v1/search".into(),
          }
          .into(),
        );
      }

      let mut items = vec![InfoItem::Channel {
        url: "https://www.youtube.com/channel/UC1".into(),
        name: "A channel".into(),
      }];
      items.extend((0..self.results).map(|i| {
        InfoItem::Stream(StreamInfoItem {
          url: format!("https://www.youtube.com/watch?v={}", video_id(i)),
          name: format!("{} #{}", query, i),
          uploader_name: Some("Uploader".into()),
          duration: Some(200),
          ..Default::default()
        })
      }));
      Ok(SearchPage { items })
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<String>, ExtensionError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_suggestions {
        return Err(ExtensionError::NotFound("suggestions".into()));
      }
      Ok((0..8).map(|i| format!("{} {}", query, i)).collect())
    }

    async fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtensionError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let index: usize = url
        .rsplit("vid")
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| ExtensionError::NotFound(url.to_string()))?;

      let audio_streams = if index % 2 == 0 {
        vec![
          rendition(
            140,
            128,
            RenditionSource::Cipher(
              "s=ZYX&sp=sig&url=https%3A%2F%2Frr1.googlevideo.com%2Fvideoplayback%3Fitag%3D140"
                .into(),
            ),
          ),
          rendition(251, 160, RenditionSource::Direct("https://rr1.googlevideo.com/251".into())),
          rendition(249, 50, RenditionSource::Direct("https://rr1.googlevideo.com/249".into())),
        ]
      } else {
        vec![rendition(140, 128, RenditionSource::Cipher("s=ZYX".into()))]
      };

      Ok(StreamInfo {
        id: video_id(index),
        url: url.to_string(),
        name: format!("Video {}", index),
        length: 200,
        audio_streams,
        ..Default::default()
      })
    }
  }

  fn orchestrator(engine: FakeEngine) -> (SearchOrchestrator, Arc<FakeEngine>) {
    let engine = Arc::new(engine);
    let converter = YouTubeConverter::new(StreamResolver::new(Arc::new(FakePlayer::default())));
    (
      SearchOrchestrator::new(engine.clone(), converter, &YouTubeConfig::default()),
      engine,
    )
  }

  #[tokio::test]
  async fn test_search_is_capped_and_skips_non_streams() {
    let (search, _) = orchestrator(FakeEngine::default());
    let tracks = search.search("test").await.unwrap();

    assert_eq!(tracks.len(), 20);
    assert_eq!(tracks[0].title, "test #0");
    assert!(tracks.iter().all(|t| t.is_playable()));
  }

  #[tokio::test]
  async fn test_blank_queries_make_no_calls() {
    let (search, engine) = orchestrator(FakeEngine::default());

    assert!(search.quick_search("").await.is_empty());
    assert!(search.quick_search("   ").await.is_empty());
    assert!(search.search("").await.unwrap().is_empty());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_quick_search_hints_before_media() {
    let (search, _) = orchestrator(FakeEngine::default());
    let items = search.quick_search("lofi").await;

    assert_eq!(items.len(), 5 + 3);
    assert!(items[..5].iter().all(QuickSearchItem::is_query));
    assert!(items[5..].iter().all(|i| !i.is_query()));
    match &items[0] {
      QuickSearchItem::Query { extras, .. } => {
        assert_eq!(extras["source"], "youtube");
        assert_eq!(extras["type"], "suggestion");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_short_query_gets_only_hints() {
    let (search, engine) = orchestrator(FakeEngine::default());
    let items = search.quick_search("lo").await;

    assert!(items.iter().all(QuickSearchItem::is_query));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_suggestions_degrade_to_media_only() {
    let (search, _) = orchestrator(FakeEngine {
      fail_suggestions: true,
      ..Default::default()
    });
    let items = search.quick_search("lofi").await;

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| !i.is_query()));
  }

  #[tokio::test]
  async fn test_failed_search_yields_fallback_hint() {
    let (search, _) = orchestrator(FakeEngine {
      fail_search: true,
      fail_suggestions: true,
      ..Default::default()
    });
    let items = search.quick_search("lofi").await;

    assert_eq!(items.len(), 1);
    match &items[0] {
      QuickSearchItem::Query { query, extras, .. } => {
        assert_eq!(query, "lofi");
        assert_eq!(extras["type"], "fallback");
        assert!(extras["error"].contains("reCaptcha"));
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_failed_search_feed_is_empty() {
    let (search, _) = orchestrator(FakeEngine {
      fail_search: true,
      ..Default::default()
    });
    let feed = search.search_feed("lofi").await;

    assert_eq!(feed.tabs.len(), 3);
    assert!(feed.shelves.is_empty());
  }
}
