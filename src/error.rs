use thiserror::Error;

/// Socket-level failures on the Stream Deck link. Never fatal: they feed the
/// reconnect backoff.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures talking to the Plex player or server.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed payload: {0}")]
    Parse(#[from] quick_xml::de::DeError),
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("no target client identifier for server-relayed command")]
    NoTargetClient,
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RemoteError {
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// True when the player could not be reached at all (connection refused,
    /// DNS failure). Timeouts and HTTP errors do not count.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_connect())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
