use crate::artwork::Artwork;
use crate::commands::Rollback;
use crate::error::{RemoteError, RemoteResult};
use crate::player::{PlayerCommand, Snapshot, Track};
use crate::transport::TransportEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything the event loop reacts to. Spawned tasks and timers only ever
/// talk to the app through this enum.
#[derive(Debug)]
pub enum AppEvent {
    Transport(TransportEvent),
    PollTick,
    RenderTick,
    Timeline(RemoteResult<Option<Snapshot>>),
    Metadata {
        rating_key: String,
        result: RemoteResult<Option<Track>>,
    },
    ChildCount {
        parent_key: String,
        count: Option<u32>,
    },
    Artwork {
        path: String,
        art: Option<Arc<Artwork>>,
    },
    CommandFailed {
        command: PlayerCommand,
        rollback: Rollback,
        error: RemoteError,
    },
    RatingDue {
        rating_key: String,
        rating: u8,
    },
    HoldThreshold {
        context: String,
        press: u64,
    },
    HoldRepeat {
        context: String,
        press: u64,
    },
    OverlayExpired {
        context: String,
        serial: u64,
    },
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;
