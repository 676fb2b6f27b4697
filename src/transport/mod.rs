//! The Stream Deck WebSocket link.
//!
//! Socket I/O lives in a spawned task per connection attempt. Every attempt
//! gets a generation number, and events from a superseded attempt are
//! ignored, so a late close from an old socket can never tear down a new one.

pub mod protocol;

use crate::app::events::{AppEvent, EventSender};
use crate::error::TransportError;
use crate::timer::{self, TimerHandle};
use futures::{SinkExt, StreamExt};
use protocol::{Inbound, Outbound};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// `min(base * 2^(attempt-1), max)`, attempt counted from 1.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempts: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        let factor = 1u32.checked_shl(self.attempts - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Where and how to register with the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub port: u16,
    pub uuid: String,
    pub register_event: String,
}

impl Endpoint {
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

#[derive(Debug)]
pub enum TransportEvent {
    Opened { generation: u64 },
    Closed { generation: u64, reason: String },
    Message { generation: u64, text: String },
    ReconnectDue,
}

/// Everything a socket task needs: where to dial, what to send, and where
/// to report.
pub struct SocketLink {
    pub url: String,
    pub generation: u64,
    pub outbound: mpsc::UnboundedReceiver<String>,
    pub events: EventSender,
}

/// Opens sockets. Swapped out in tests.
pub trait Dialer: Send {
    fn dial(&self, link: SocketLink) -> JoinHandle<()>;
}

pub struct WsDialer;

impl Dialer for WsDialer {
    fn dial(&self, link: SocketLink) -> JoinHandle<()> {
        tokio::spawn(run_socket(link))
    }
}

async fn run_socket(link: SocketLink) {
    let SocketLink {
        url,
        generation,
        mut outbound,
        events,
    } = link;
    let report = |event: TransportEvent| {
        let _ = events.send(AppEvent::Transport(event));
    };

    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let reason = TransportError::from(e).to_string();
            report(TransportEvent::Closed { generation, reason });
            return;
        }
    };
    report(TransportEvent::Opened { generation });

    let (mut sink, mut source) = stream.split();
    let reason = loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break TransportError::from(e).to_string();
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break "closed locally".to_string();
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => report(TransportEvent::Message {
                    generation,
                    text: text.as_str().to_owned(),
                }),
                Some(Ok(Message::Close(_))) | None => break "closed by host".to_string(),
                Some(Ok(_)) => {}
                Some(Err(e)) => break TransportError::from(e).to_string(),
            },
        }
    };
    report(TransportEvent::Closed { generation, reason });
}

pub struct Transport {
    dialer: Box<dyn Dialer>,
    events: EventSender,
    endpoint: Option<Endpoint>,
    state: ConnectionState,
    backoff: Backoff,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    socket: Option<JoinHandle<()>>,
    reconnect: Option<TimerHandle>,
    pending_delay: Option<Duration>,
    intentional_close: bool,
}

impl Transport {
    pub fn new(dialer: Box<dyn Dialer>, events: EventSender, backoff: Backoff) -> Self {
        Self {
            dialer,
            events,
            endpoint: None,
            state: ConnectionState::Closed,
            backoff,
            generation: 0,
            outbound: None,
            socket: None,
            reconnect: None,
            pending_delay: None,
            intentional_close: false,
        }
    }

    pub fn connect(&mut self, endpoint: Endpoint) {
        info!("Connecting to Stream Deck at {}", endpoint.url());
        self.endpoint = Some(endpoint);
        self.intentional_close = false;
        self.reconnect = None;
        self.pending_delay = None;
        self.dial();
    }

    fn dial(&mut self) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        if let Some(old) = self.socket.take() {
            old.abort();
        }
        self.generation += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let link = SocketLink {
            url: endpoint.url(),
            generation: self.generation,
            outbound: rx,
            events: self.events.clone(),
        };
        self.state = ConnectionState::Connecting;
        self.outbound = Some(tx);
        self.socket = Some(self.dialer.dial(link));
    }

    /// Feeds a socket event through the state machine. Returns the parsed
    /// message for `Message` events from the live socket.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<Inbound> {
        match event {
            TransportEvent::Opened { generation } if generation == self.generation => {
                self.on_open();
                None
            }
            TransportEvent::Closed { generation, reason } if generation == self.generation => {
                self.on_close(&reason);
                None
            }
            TransportEvent::Message { generation, text } if generation == self.generation => {
                match Inbound::parse(&text) {
                    Ok(inbound) => Some(inbound),
                    Err(e) => {
                        warn!("Dropping malformed message: {}", TransportError::from(e));
                        None
                    }
                }
            }
            TransportEvent::ReconnectDue => {
                self.reconnect = None;
                self.pending_delay = None;
                if !self.intentional_close && self.state == ConnectionState::Closed {
                    self.dial();
                }
                None
            }
            stale => {
                debug!("Ignoring event from a superseded socket: {:?}", stale);
                None
            }
        }
    }

    fn on_open(&mut self) {
        info!("Stream Deck connection open");
        self.state = ConnectionState::Open;
        self.backoff.reset();
        if let Some(endpoint) = self.endpoint.clone() {
            self.send(&Outbound::register(&endpoint.register_event, &endpoint.uuid));
            self.send(&Outbound::get_global_settings(&endpoint.uuid));
        }
    }

    fn on_close(&mut self, reason: &str) {
        self.state = ConnectionState::Closed;
        self.outbound = None;
        self.socket = None;
        if self.intentional_close {
            info!("Stream Deck connection closed");
        } else {
            warn!("Stream Deck connection lost: {}", reason);
            self.schedule_reconnect();
        }
    }

    /// At most one reconnect may be pending.
    fn schedule_reconnect(&mut self) {
        if self.reconnect.is_some() {
            return;
        }
        let delay = self.backoff.next_delay();
        info!(
            "Reconnecting in {:?} (attempt {})",
            delay,
            self.backoff.attempts()
        );
        self.pending_delay = Some(delay);
        self.reconnect = Some(timer::after(
            delay,
            &self.events,
            AppEvent::Transport(TransportEvent::ReconnectDue),
        ));
    }

    /// Dispatches immediately or not at all: nothing is queued while the
    /// link is down.
    pub fn send(&self, message: &Outbound) -> bool {
        if self.state != ConnectionState::Open {
            return false;
        }
        let Some(outbound) = &self.outbound else {
            return false;
        };
        match message.to_json() {
            Ok(text) => outbound.send(text).is_ok(),
            Err(e) => {
                warn!("Failed to encode {}: {}", message.event, e);
                false
            }
        }
    }

    /// Shuts the link down for good; no reconnect follows.
    pub fn close(&mut self) {
        self.intentional_close = true;
        self.reconnect = None;
        self.pending_delay = None;
        if self.outbound.take().is_some() {
            self.state = ConnectionState::Closing;
        } else {
            self.state = ConnectionState::Closed;
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_reconnect(&self) -> Option<Duration> {
        self.pending_delay
    }

    pub fn uuid(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.uuid.as_str())
    }
}
