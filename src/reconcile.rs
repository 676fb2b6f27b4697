//! Merges polled server truth with locally pending writes.

use crate::app::state::StateStore;
use crate::error::RemoteError;
use crate::player::{Snapshot, Track};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Same track, nothing to fetch.
    Unchanged,
    /// New identity: fetch its metadata.
    LoadTrack(String),
    /// Same identity with a rating write outstanding: re-read the server
    /// rating to see whether it has caught up.
    ProbeRating(String),
    NoSession { cleared: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    Discarded,
    RatingReconciled { rating: u8 },
    Loaded {
        fetch_children: Option<String>,
        fetch_art: Option<String>,
    },
}

/// Folds one poll result into the store.
pub fn apply_snapshot(store: &mut StateStore, snapshot: Option<Snapshot>, now: Instant) -> SnapshotOutcome {
    let Some(snapshot) = snapshot.filter(Snapshot::has_session) else {
        return SnapshotOutcome::NoSession {
            cleared: handle_no_session(store),
        };
    };

    if let Some(volume) = snapshot.volume {
        if !store.offer_polled_volume(volume, now) {
            debug!("Polled volume {} held off by local command", volume);
        }
    }
    store.player.shuffle = snapshot.shuffle;
    store.player.repeat = snapshot.repeat;
    if snapshot.machine_identifier.is_some() {
        store.player.machine_identifier = snapshot.machine_identifier.clone();
    }
    store.apply_timeline(snapshot.state, snapshot.position_ms, snapshot.duration_ms, now);

    let Some(key) = snapshot.rating_key else {
        store.set_timeline_key(None);
        return SnapshotOutcome::Unchanged;
    };
    store.set_timeline_key(Some(key.clone()));

    if store.session().track_key() == Some(key.as_str()) {
        if store.pending_rating(&key).is_some() {
            SnapshotOutcome::ProbeRating(key)
        } else {
            SnapshotOutcome::Unchanged
        }
    } else {
        SnapshotOutcome::LoadTrack(key)
    }
}

/// A failed poll only ends the session when the player is plainly not
/// there. Timeouts, HTTP errors and garbage leave state untouched.
pub fn apply_poll_error(store: &mut StateStore, error: &RemoteError) -> Option<SnapshotOutcome> {
    if error.is_unreachable() {
        Some(SnapshotOutcome::NoSession {
            cleared: handle_no_session(store),
        })
    } else {
        debug!("Timeline poll failed: {}", error);
        None
    }
}

/// Clears the session once; repeated empty polls are no-ops.
pub fn handle_no_session(store: &mut StateStore) -> bool {
    let cleared = store.clear_session();
    if cleared {
        info!("Playback session ended, state cleared");
    }
    cleared
}

/// Applies fetched metadata for `requested_key`. Results for an identity
/// the timeline has already moved past are dropped.
pub fn apply_metadata(store: &mut StateStore, requested_key: &str, track: Option<Track>) -> MetadataOutcome {
    let Some(track) = track.filter(|t| t.rating_key == requested_key) else {
        debug!("No metadata for {}", requested_key);
        return MetadataOutcome::Discarded;
    };

    if store.session().track_key() == Some(requested_key) {
        let rating = reconcile_rating(store, requested_key, track.user_rating);
        return MetadataOutcome::RatingReconciled { rating };
    }

    if store.session().timeline_key.as_deref() != Some(requested_key) {
        debug!("Discarding metadata for superseded track {}", requested_key);
        return MetadataOutcome::Discarded;
    }

    let previous_parent = store
        .track()
        .and_then(|t| t.parent_rating_key.clone());
    let track = store.set_track(track);
    info!(
        "Now playing: {} - {}",
        track.grandparent_title, track.title
    );
    reconcile_rating(store, &track.rating_key, track.user_rating);

    let fetch_children = track.parent_rating_key.clone().filter(|parent| {
        previous_parent.as_ref() != Some(parent) || store.session().album_track_count.is_none()
    });
    let art_path = track.art_path();
    let fetch_art = if store.request_art(art_path) {
        art_path.map(str::to_string)
    } else {
        None
    };

    MetadataOutcome::Loaded {
        fetch_children,
        fetch_art,
    }
}

/// 1. pending equals server: drop pending, show server.
/// 2. pending differs: server lags, keep showing pending.
/// 3. nothing pending: show server.
pub fn reconcile_rating(store: &mut StateStore, rating_key: &str, server: u8) -> u8 {
    let shown = match store.pending_rating(rating_key) {
        Some(pending) if pending == server => {
            store.clear_pending_rating(rating_key);
            debug!("Server rating caught up for {}", rating_key);
            server
        }
        Some(pending) => {
            debug!("Server rating {} lags pending {}", server, pending);
            pending
        }
        None => server,
    };
    if store.session().track_key() == Some(rating_key) {
        store.set_rating(shown);
    }
    shown
}
