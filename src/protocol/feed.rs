use serde::{Deserialize, Serialize};

use super::tracks::{Extras, Track};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
  pub id: String,
  pub title: String,
}

impl Tab {
  pub fn new(id: &str, title: &str) -> Self {
    Self {
      id: id.to_string(),
      title: title.to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buttons {
  pub show_search: bool,
  pub show_sort: bool,
  pub show_play_and_shuffle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Shelf {
  Item(Track),
}

/// One page of shelves plus the buttons the host should offer for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedData {
  pub shelves: Vec<Shelf>,
  pub buttons: Option<Buttons>,
}

/// A tabbed feed. Every tab currently shows the same single page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
  pub tabs: Vec<Tab>,
  pub shelves: Vec<Shelf>,
}

impl Feed {
  pub const SONGS: &'static str = "songs";
  pub const VIDEOS: &'static str = "videos";
  pub const PLAYLISTS: &'static str = "playlists";

  pub fn search(tracks: Vec<Track>) -> Self {
    Self {
      tabs: vec![
        Tab::new(Self::SONGS, "Songs"),
        Tab::new(Self::VIDEOS, "Videos"),
        Tab::new(Self::PLAYLISTS, "Playlists"),
      ],
      shelves: tracks.into_iter().map(Shelf::Item).collect(),
    }
  }

  pub fn empty() -> Self {
    Self::search(Vec::new())
  }

  pub fn data(&self, tab_id: Option<&str>) -> FeedData {
    let buttons = match tab_id {
      Some(Self::SONGS) => Some(Buttons {
        show_search: true,
        show_sort: true,
        show_play_and_shuffle: true,
      }),
      Some(Self::VIDEOS) | Some(Self::PLAYLISTS) => Some(Buttons {
        show_search: true,
        show_sort: true,
        show_play_and_shuffle: false,
      }),
      _ => None,
    };

    FeedData {
      shelves: self.shelves.clone(),
      buttons,
    }
  }

  pub fn tracks(&self) -> impl Iterator<Item = &Track> {
    self.shelves.iter().map(|shelf| match shelf {
      Shelf::Item(track) => track,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuickSearchItem {
  Query {
    query: String,
    searched: bool,
    #[serde(default)]
    extras: Extras,
  },
  Media {
    media: Box<Track>,
    searched: bool,
  },
}

impl QuickSearchItem {
  pub fn title(&self) -> &str {
    match self {
      Self::Query { query, .. } => query,
      Self::Media { media, .. } => &media.title,
    }
  }

  pub fn is_query(&self) -> bool {
    matches!(self, Self::Query { .. })
  }
}
