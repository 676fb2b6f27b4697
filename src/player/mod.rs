pub mod plex;
pub mod traits;

pub use plex::PlexClient;
pub use traits::{
    MediaInfo, PlaybackState, PlayerCommand, RemoteClient, RepeatMode, ServerConfig, Snapshot,
    Track,
};

use std::sync::Arc;

/// Builds the remote client shared by every task.
pub fn get_remote(http: reqwest::Client, player_url: &str) -> Arc<dyn RemoteClient> {
    Arc::new(PlexClient::new(http, player_url))
}
