pub mod feed;
pub mod tracks;

pub use feed::*;
pub use tracks::*;
