use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
  common::ExtensionError,
  protocol::{
    feed::{Feed, QuickSearchItem},
    tracks::{Streamable, StreamableMedia, Track},
  },
};

/// A setting the host renders for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingItem {
  pub key: String,
  pub title: String,
  pub summary: Option<String>,
  pub default_value: String,
}

/// Values the host stored for our [`SettingItem`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings(pub BTreeMap<String, String>);

impl Settings {
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  /// `None` when absent or not a number.
  pub fn get_u32(&self, key: &str) -> Option<u32> {
    self.get(key).and_then(|v| v.trim().parse().ok())
  }
}

/// Lifecycle hooks every extension implements.
#[async_trait]
pub trait ExtensionClient: Send + Sync {
  async fn on_initialize(&self) -> Result<(), ExtensionError>;

  fn set_settings(&self, settings: &Settings);

  fn get_setting_items(&self) -> Vec<SettingItem>;
}

#[async_trait]
pub trait SearchFeedClient: Send + Sync {
  async fn load_search_feed(&self, query: &str) -> Result<Feed, ExtensionError>;
}

#[async_trait]
pub trait TrackClient: Send + Sync {
  async fn load_track(&self, track: &Track, refresh: bool) -> Result<Track, ExtensionError>;

  async fn load_streamable_media(
    &self,
    streamable: &Streamable,
    refresh: bool,
  ) -> Result<StreamableMedia, ExtensionError>;

  /// Related feed shown under a track, if the source has one.
  async fn load_feed(&self, track: &Track) -> Result<Option<Feed>, ExtensionError>;
}

#[async_trait]
pub trait QuickSearchClient: Send + Sync {
  async fn quick_search(&self, query: &str) -> Result<Vec<QuickSearchItem>, ExtensionError>;

  async fn delete_quick_search(&self, item: &QuickSearchItem) -> Result<(), ExtensionError>;
}
