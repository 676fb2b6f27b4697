//! HTTP client for the Plexamp player and its Plex Media Server.

pub mod xml;

use crate::error::{RemoteError, RemoteResult};
use crate::player::traits::{PlayerCommand, RemoteClient, ServerConfig, Snapshot, Track};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PLAYER_URL: &str = "http://localhost:32500";
const CLIENT_IDENTIFIER: &str = "com.ampdeck.streamdeck";
const LIBRARY_IDENTIFIER: &str = "com.plexapp.plugins.library";

const PLAYER_TIMEOUT: Duration = Duration::from_secs(1);
const SERVER_TIMEOUT: Duration = Duration::from_secs(2);
const TIMELINE_TIMEOUT: Duration = Duration::from_secs(5);
const LIBRARY_TIMEOUT: Duration = Duration::from_secs(5);

type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone)]
struct Endpoints {
    server_url: Option<String>,
    token: Option<String>,
    player_url: String,
}

pub struct PlexClient {
    http: Client,
    endpoints: RwLock<Endpoints>,
    default_player_url: String,
    command_id: AtomicU64,
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl PlexClient {
    pub fn new(http: Client, default_player_url: &str) -> Self {
        let default_player_url = trim_url(default_player_url);
        Self {
            http,
            endpoints: RwLock::new(Endpoints {
                server_url: None,
                token: None,
                player_url: default_player_url.clone(),
            }),
            default_player_url,
            command_id: AtomicU64::new(0),
        }
    }

    fn endpoints(&self) -> Endpoints {
        self.endpoints
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Server URL and token, both required for anything that touches the library.
    fn server(&self) -> RemoteResult<(String, String)> {
        let endpoints = self.endpoints();
        match (endpoints.server_url, endpoints.token) {
            (Some(url), Some(token)) => Ok((url, token)),
            _ => Err(RemoteError::NotConfigured("plex server")),
        }
    }

    fn next_command_id(&self) -> u64 {
        self.command_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.http
            .get(url)
            .timeout(timeout)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .header("X-Plex-Product", "Ampdeck")
            .header("X-Plex-Version", env!("CARGO_PKG_VERSION"))
            .header("X-Plex-Platform", "Stream Deck")
            .header("X-Plex-Device", "Stream Deck")
    }

    async fn send(url: &str, request: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::http(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn library_text(&self, path: &str) -> RemoteResult<String> {
        let (server_url, token) = self.server()?;
        let url = format!("{}{}", server_url, path);
        let request = self
            .get(&url, LIBRARY_TIMEOUT)
            .header("X-Plex-Token", token);
        Self::send(&url, request)
            .await?
            .text()
            .await
            .map_err(|e| RemoteError::http(&url, e))
    }

    async fn send_player(&self, command: PlayerCommand) -> RemoteResult<()> {
        let url = format!("{}{}", self.endpoints().player_url, command.path());
        let mut query: Query = vec![("commandID", self.next_command_id().to_string())];
        query.extend(command.params());
        Self::send(&url, self.get(&url, PLAYER_TIMEOUT).query(&query)).await?;
        Ok(())
    }

    /// Relays a command through the server to the player identified by `target`.
    async fn send_server(&self, path: &str, extra: Query, target: Option<&str>) -> RemoteResult<()> {
        let target = target.ok_or(RemoteError::NoTargetClient)?;
        let (server_url, token) = self.server()?;
        let url = format!("{}{}", server_url, path);

        let mut query: Query = vec![
            ("commandID", "1".to_string()),
            ("X-Plex-Target-Client-Identifier", target.to_string()),
        ];
        query.extend(extra);

        let request = self
            .get(&url, SERVER_TIMEOUT)
            .header("X-Plex-Token", token)
            .query(&query);
        Self::send(&url, request).await?;
        debug!("Server command ok: {}", path);
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for PlexClient {
    fn configure(&self, config: ServerConfig) {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        endpoints.server_url = config.server_url.as_deref().map(trim_url).filter(|u| !u.is_empty());
        endpoints.token = config.token.filter(|t| !t.is_empty());
        endpoints.player_url = config
            .player_url
            .as_deref()
            .map(trim_url)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_player_url.clone());
    }

    async fn fetch_timeline(&self) -> RemoteResult<Option<Snapshot>> {
        let (_, token) = self.server()?;
        let url = format!("{}/player/timeline/poll", self.endpoints().player_url);
        let query: Query = vec![
            ("commandID", self.next_command_id().to_string()),
            ("X-Plex-Token", token),
        ];
        let body = Self::send(&url, self.get(&url, TIMELINE_TIMEOUT).query(&query))
            .await?
            .text()
            .await
            .map_err(|e| RemoteError::http(&url, e))?;
        xml::parse_timeline(&body)
    }

    async fn fetch_metadata(&self, rating_key: &str) -> RemoteResult<Option<Track>> {
        debug!("Fetching metadata for {}", rating_key);
        let body = self
            .library_text(&format!("/library/metadata/{}", rating_key))
            .await?;
        xml::parse_metadata(&body)
    }

    async fn fetch_child_count(&self, parent_key: &str) -> RemoteResult<Option<u32>> {
        let body = self
            .library_text(&format!("/library/metadata/{}/children", parent_key))
            .await?;
        xml::count_children(&body).map(Some)
    }

    async fn fetch_art(&self, path: &str) -> RemoteResult<Vec<u8>> {
        let (server_url, token) = self.server()?;
        let url = format!("{}{}", server_url, path);
        let request = self.http.get(&url).timeout(LIBRARY_TIMEOUT).header("X-Plex-Token", token);
        let bytes = Self::send(&url, request)
            .await?
            .bytes()
            .await
            .map_err(|e| RemoteError::http(&url, e))?;
        Ok(bytes.to_vec())
    }

    async fn player_command(&self, command: PlayerCommand, target: Option<&str>) -> RemoteResult<()> {
        match self.send_player(command).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Player command {:?} failed ({}), relaying through server", command, e);
                self.send_server(command.path(), command.params(), target).await
            }
        }
    }

    async fn rate(&self, rating_key: &str, rating: u8, target: Option<&str>) -> RemoteResult<()> {
        let extra: Query = vec![
            ("key", rating_key.to_string()),
            ("identifier", LIBRARY_IDENTIFIER.to_string()),
            ("rating", rating.to_string()),
        ];
        self.send_server("/:/rate", extra, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PlexClient {
        PlexClient::new(Client::new(), DEFAULT_PLAYER_URL)
    }

    #[test]
    fn test_configure_trims_urls() {
        let plex = client();
        plex.configure(ServerConfig {
            server_url: Some("http://nas:32400/ ".into()),
            token: Some("abc".into()),
            player_url: Some(String::new()),
        });
        let endpoints = plex.endpoints();
        assert_eq!(endpoints.server_url.as_deref(), Some("http://nas:32400"));
        assert_eq!(endpoints.player_url, DEFAULT_PLAYER_URL);
        assert!(plex.server().is_ok());
    }

    #[test]
    fn test_unconfigured_server() {
        let plex = client();
        assert!(matches!(plex.server(), Err(RemoteError::NotConfigured(_))));
    }

    #[test]
    fn test_command_ids_increase() {
        let plex = client();
        assert_eq!(plex.next_command_id(), 1);
        assert_eq!(plex.next_command_id(), 2);
    }

    #[tokio::test]
    async fn test_relay_requires_target() {
        let plex = client();
        plex.configure(ServerConfig {
            server_url: Some("http://nas:32400".into()),
            token: Some("abc".into()),
            player_url: None,
        });
        let result = plex.rate("42", 8, None).await;
        assert!(matches!(result, Err(RemoteError::NoTargetClient)));
    }
}
