//! User commands: optimistic local update, remote dispatch, rollback on
//! failure.
//!
//! Volume failures restore the previous level and drop the guard. Rating
//! failures are only logged and the pending value stays, so the display
//! keeps what the user chose until the server agrees or the session ends.

use crate::app::config::Timing;
use crate::app::events::{AppEvent, EventSender};
use crate::app::state::StateStore;
use crate::error::RemoteError;
use crate::player::{PlaybackState, PlayerCommand, RemoteClient, RepeatMode};
use crate::timer::{self, TimerHandle};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// How to undo an optimistic update if its command fails. Each variant
/// carries enough to tell whether something newer has since overwritten it.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback {
    None,
    Playback {
        previous: PlaybackState,
        applied: PlaybackState,
    },
    Seek {
        previous_ms: u64,
        revision: u64,
    },
    Volume {
        previous: u8,
        seq: u64,
    },
    Shuffle {
        previous: bool,
    },
    Repeat {
        previous: RepeatMode,
        applied: RepeatMode,
    },
}

pub struct CommandExecutor {
    remote: Arc<dyn RemoteClient>,
    events: EventSender,
    timing: Timing,
    rating_timer: Option<TimerHandle>,
}

impl CommandExecutor {
    pub fn new(remote: Arc<dyn RemoteClient>, events: EventSender, timing: Timing) -> Self {
        Self {
            remote,
            events,
            timing,
            rating_timer: None,
        }
    }

    fn dispatch(&self, store: &StateStore, command: PlayerCommand, rollback: Rollback) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        let target = store.player.machine_identifier.clone();
        debug!("Dispatching {:?}", command);
        tokio::spawn(async move {
            if let Err(error) = remote.player_command(command, target.as_deref()).await {
                let _ = events.send(AppEvent::CommandFailed {
                    command,
                    rollback,
                    error,
                });
            }
        });
    }

    /// Play/pause. Does nothing without a session.
    pub fn toggle(&self, store: &mut StateStore, now: Instant) -> bool {
        match store.session().playback {
            PlaybackState::Stopped => {
                debug!("Toggle ignored: nothing playing");
                false
            }
            PlaybackState::Playing => self.pause(store, now),
            PlaybackState::Paused => self.play(store, now),
        }
    }

    pub fn play(&self, store: &mut StateStore, now: Instant) -> bool {
        self.set_playback(store, PlaybackState::Playing, PlayerCommand::Play, now)
    }

    pub fn pause(&self, store: &mut StateStore, now: Instant) -> bool {
        self.set_playback(store, PlaybackState::Paused, PlayerCommand::Pause, now)
    }

    fn set_playback(&self, store: &mut StateStore, target: PlaybackState, command: PlayerCommand, now: Instant) -> bool {
        let previous = store.session().playback;
        let rollback = if store.has_session() && previous != target {
            store.set_playback(target, now);
            Rollback::Playback {
                previous,
                applied: target,
            }
        } else {
            Rollback::None
        };
        self.dispatch(store, command, rollback);
        true
    }

    pub fn next(&self, store: &StateStore) {
        self.dispatch(store, PlayerCommand::SkipNext, Rollback::None);
    }

    pub fn previous(&self, store: &StateStore) {
        self.dispatch(store, PlayerCommand::SkipPrevious, Rollback::None);
    }

    /// Seeks to an absolute position, clamped to the track.
    pub fn seek_to(&self, store: &mut StateStore, position_ms: i64, now: Instant) -> Option<u64> {
        if !store.has_session() {
            return None;
        }
        let previous_ms = store.displayed_position(now);
        let target = store.session().clamp_position(position_ms);
        let revision = store.set_position(target, now);
        self.dispatch(
            store,
            PlayerCommand::SeekTo(target),
            Rollback::Seek {
                previous_ms,
                revision,
            },
        );
        Some(target)
    }

    pub fn seek_by(&self, store: &mut StateStore, delta_ms: i64, now: Instant) -> Option<u64> {
        let current = store.displayed_position(now) as i64;
        self.seek_to(store, current + delta_ms, now)
    }

    pub fn set_volume(&self, store: &mut StateStore, volume: i32, now: Instant) -> u8 {
        let previous = store.player.volume;
        let volume = volume.clamp(0, 100) as u8;
        let seq = store.set_local_volume(volume, now);
        self.dispatch(
            store,
            PlayerCommand::SetVolume(volume),
            Rollback::Volume { previous, seq },
        );
        volume
    }

    /// `steps` of the configured volume step; negative turns it down.
    pub fn adjust_volume(&self, store: &mut StateStore, steps: i32, now: Instant) -> u8 {
        let delta = steps.saturating_mul(self.timing.volume_step as i32);
        let target = (store.player.volume as i32).saturating_add(delta);
        self.set_volume(store, target, now)
    }

    pub fn toggle_shuffle(&self, store: &mut StateStore) -> bool {
        let previous = store.player.shuffle;
        store.player.shuffle = !previous;
        self.dispatch(
            store,
            PlayerCommand::SetShuffle(!previous),
            Rollback::Shuffle { previous },
        );
        !previous
    }

    /// off -> all -> one -> off
    pub fn cycle_repeat(&self, store: &mut StateStore) -> RepeatMode {
        let previous = store.player.repeat;
        let applied = previous.next();
        store.player.repeat = applied;
        self.dispatch(
            store,
            PlayerCommand::SetRepeat(applied),
            Rollback::Repeat { previous, applied },
        );
        applied
    }

    /// Steps the rating of the current track and (re)starts the debounce.
    /// Buttons wrap past five stars back to zero; dials clamp.
    pub fn adjust_rating(&mut self, store: &mut StateStore, delta: i32, wrap: bool, now: Instant) -> Option<u8> {
        let rating_key = store.track()?.rating_key.clone();
        let mut rating = (store.session().rating as i32).saturating_add(delta);
        if wrap && rating > 10 {
            rating = 0;
        }
        let rating = rating.clamp(0, 10) as u8;

        store.set_pending_rating(&rating_key, rating, now);
        self.rating_timer = Some(timer::after(
            self.timing.rating_debounce(),
            &self.events,
            AppEvent::RatingDue { rating_key, rating },
        ));
        Some(rating)
    }

    pub fn rating_write_pending(&self) -> bool {
        self.rating_timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Drops a debounced rating write that has not fired yet.
    pub fn cancel_rating(&mut self) {
        if self.rating_timer.take().is_some() {
            debug!("Pending rating write cancelled");
        }
    }

    /// The debounce elapsed: write the rating once, unless the track it was
    /// meant for is no longer current.
    pub fn on_rating_due(&mut self, store: &StateStore, rating_key: String, rating: u8) {
        self.rating_timer = None;
        if store.track().map(|t| t.rating_key.as_str()) != Some(rating_key.as_str()) {
            debug!("Dropping rating write for {}: track no longer current", rating_key);
            return;
        }
        let remote = Arc::clone(&self.remote);
        let target = store.player.machine_identifier.clone();
        tokio::spawn(async move {
            match remote.rate(&rating_key, rating, target.as_deref()).await {
                Ok(()) => info!("Rated {} at {} stars", rating_key, rating as f32 / 2.0),
                Err(e) => error!("Failed to rate {}: {}", rating_key, e),
            }
        });
    }

    pub fn on_command_failed(
        &self,
        store: &mut StateStore,
        command: PlayerCommand,
        rollback: Rollback,
        error: &RemoteError,
        now: Instant,
    ) {
        error!("Command {:?} failed: {}", command, error);
        match rollback {
            Rollback::None => {}
            Rollback::Playback { previous, applied } => {
                if store.session().playback == applied {
                    store.set_playback(previous, now);
                }
            }
            Rollback::Seek {
                previous_ms,
                revision,
            } => {
                if store.position_revision() == revision {
                    store.set_position(previous_ms, now);
                }
            }
            Rollback::Volume { previous, seq } => {
                store.rollback_volume(previous, seq);
            }
            Rollback::Shuffle { previous } => {
                if store.player.shuffle != previous {
                    store.player.shuffle = previous;
                }
            }
            Rollback::Repeat { previous, applied } => {
                if store.player.repeat == applied {
                    store.player.repeat = previous;
                }
            }
        }
    }
}
