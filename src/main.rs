use echotube::{
  common::types::AnyResult,
  configs::Config,
  protocol::tracks::Track,
  sources::{ExtensionClient, QuickSearchClient, SearchFeedClient, TrackClient, YouTubeExtension},
};
use serde::Serialize;
use tracing::info;

const USAGE: &str = "usage: echotube <search|quick|track|media> <query or url>";

fn print_json<T: Serialize>(value: &T) -> AnyResult<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> AnyResult<()> {
  let config = Config::load()?;
  echotube::common::logger::init(&config);

  let mut args = std::env::args().skip(1);
  let (Some(command), Some(argument)) = (args.next(), args.next()) else {
    eprintln!("{}", USAGE);
    std::process::exit(2);
  };

  let extension = YouTubeExtension::new(config.youtube.clone())?;
  extension.on_initialize().await?;
  info!("Running {} for '{}'", command, argument);

  match command.as_str() {
    "search" => print_json(&extension.load_search_feed(&argument).await?.data(None)),
    "quick" => print_json(&extension.quick_search(&argument).await?),
    "track" | "media" => {
      let stub = Track {
        id: argument,
        ..placeholder_track()
      };
      let track = extension.load_track(&stub, false).await?;
      if command == "track" {
        return print_json(&track);
      }
      let Some(best) = track.streamables.first() else {
        return Err(format!("{} has no playable renditions", track.id).into());
      };
      print_json(&extension.load_streamable_media(best, false).await?)
    }
    _ => {
      eprintln!("{}", USAGE);
      std::process::exit(2);
    }
  }
}

fn placeholder_track() -> Track {
  Track {
    id: String::new(),
    title: String::new(),
    kind: echotube::protocol::tracks::TrackType::Song,
    cover: None,
    artists: Vec::new(),
    album: None,
    duration: None,
    plays: None,
    description: None,
    subtitle: None,
    is_explicit: false,
    extras: Default::default(),
    is_playable: echotube::protocol::tracks::Playable::No,
    streamables: Vec::new(),
  }
}
