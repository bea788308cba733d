use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String-keyed metadata attached to host entities.
pub type Extras = BTreeMap<String, String>;

/// An artist as shown by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
  /// Channel URL, empty when the upstream did not report one.
  pub id: String,
  pub name: String,
  pub cover: Option<String>,
  #[serde(default)]
  pub extras: Extras,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
  pub id: String,
  pub title: String,
  pub cover: Option<String>,
  pub artists: Vec<Artist>,
  /// Duration in milliseconds.
  pub duration: Option<u64>,
  pub description: Option<String>,
  pub subtitle: Option<String>,
  #[serde(default)]
  pub extras: Extras,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackType {
  Song,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Playable {
  Yes,
  No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamableType {
  /// Served over plain HTTP by a remote server.
  Server,
}

/// Something the host can ask us to turn into [`StreamableMedia`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streamable {
  pub id: String,
  /// Bitrate in kbps.
  pub quality: u32,
  #[serde(rename = "type")]
  pub kind: StreamableType,
  pub title: Option<String>,
  #[serde(default)]
  pub extras: Extras,
}

impl Streamable {
  pub fn server(id: impl Into<String>, quality: u32, title: impl Into<String>, extras: Extras) -> Self {
    Self {
      id: id.into(),
      quality,
      kind: StreamableType::Server,
      title: Some(title.into()),
      extras,
    }
  }
}

/// Progressive HTTP audio source handed to the host player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamableMedia {
  pub uri: String,
  /// Request headers, in the order they should be sent.
  pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
  /// Source URL of the video.
  pub id: String,
  pub title: String,
  #[serde(rename = "type")]
  pub kind: TrackType,
  pub cover: Option<String>,
  pub artists: Vec<Artist>,
  pub album: Option<Album>,
  /// Duration in milliseconds.
  pub duration: Option<u64>,
  pub plays: Option<u64>,
  pub description: Option<String>,
  pub subtitle: Option<String>,
  pub is_explicit: bool,
  #[serde(default)]
  pub extras: Extras,
  pub is_playable: Playable,
  /// Sorted by descending quality.
  pub streamables: Vec<Streamable>,
}

impl Track {
  pub fn is_playable(&self) -> bool {
    self.is_playable == Playable::Yes
  }
}
