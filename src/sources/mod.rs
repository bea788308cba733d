pub mod plugin;
pub mod youtube;

pub use plugin::{ExtensionClient, QuickSearchClient, SearchFeedClient, TrackClient};
pub use youtube::YouTubeExtension;
