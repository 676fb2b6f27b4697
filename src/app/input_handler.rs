//! Inbound Stream Deck events.

use crate::app::config::{ActionKind, DialAction};
use crate::app::App;
use crate::gesture::GestureEffect;
use crate::transport::protocol::{Inbound, Outbound, Settings};
use crate::ui::{self, ViewModel};
use tokio::time::Instant;
use tracing::{debug, info};

impl App {
    pub(super) fn handle_inbound(&mut self, inbound: Inbound, now: Instant) {
        match inbound {
            Inbound::WillAppear {
                action,
                context,
                payload,
            } => self.on_will_appear(&action, &context, payload.settings, now),
            Inbound::WillDisappear { context } => self.on_will_disappear(&context),
            Inbound::DidReceiveGlobalSettings { payload } => {
                if self.store.global.merge(&payload.settings) {
                    debug!("Global settings updated");
                }
                self.apply_global_settings();
                self.store.contexts.invalidate_all();
                self.render_all(now);
                if self.store.global.is_configured() {
                    self.poll();
                }
            }
            Inbound::DidReceiveSettings { context, payload } => {
                self.promote_settings(&payload.settings);
                if self.store.contexts.update_settings(&context, payload.settings) {
                    self.render_context(&context, now);
                }
            }
            Inbound::KeyDown { context } => {
                if let Some(kind) = self.store.contexts.kind(&context) {
                    self.holds.press(&context, kind, &self.events);
                }
            }
            Inbound::KeyUp { context } => match self.holds.release(&context) {
                Some(GestureEffect::Tap(kind)) => self.tap(&context, kind, now),
                Some(effect) => self.apply_gesture(&context, vec![effect], now),
                None => {}
            },
            Inbound::DialRotate { context, payload } => self.on_dial_rotate(&context, payload.ticks, now),
            Inbound::DialDown { context } | Inbound::TouchTap { context } => {
                if self.store.contexts.kind(&context) == Some(ActionKind::Strip) {
                    self.executor.toggle(&mut self.store, now);
                    self.render_all(now);
                }
            }
            Inbound::Other => {}
        }
    }

    fn on_will_appear(&mut self, action: &str, context: &str, settings: Settings, now: Instant) {
        debug!("{} appeared as {}", action, context);
        self.promote_settings(&settings);
        if self.store.contexts.add(context, action, settings) {
            info!("First action visible, starting loops");
        }
        self.scheduler.start(&self.events);
        self.render_context(context, now);
    }

    fn on_will_disappear(&mut self, context: &str) {
        self.holds.cancel(context);
        self.store.contexts.remove(context);
        if self.store.contexts.is_empty() {
            self.scheduler.stop();
        }
    }

    /// Global keys typed into a key's property inspector become plugin-wide
    /// and are written back to the host.
    fn promote_settings(&mut self, settings: &Settings) {
        if !self.store.global.promote(settings) {
            return;
        }
        info!("Promoted per-key settings to global settings");
        self.apply_global_settings();
        self.save_global_settings();
    }

    fn apply_global_settings(&mut self) {
        self.remote.configure(self.store.global.server_config());
        if let Some(log) = &self.log {
            log.set_debug(self.store.global.debug_mode());
        }
    }

    fn save_global_settings(&self) {
        let Some(uuid) = self.transport.uuid() else {
            return;
        };
        let message = Outbound::set_global_settings(uuid, self.store.global.as_map());
        if !self.transport.send(&message) {
            debug!("Global settings not saved: link down");
        }
    }

    /// A short press.
    pub(super) fn tap(&mut self, context: &str, kind: ActionKind, now: Instant) {
        match kind {
            ActionKind::AlbumArt | ActionKind::PlayPause => {
                self.executor.toggle(&mut self.store, now);
            }
            ActionKind::Play => {
                self.executor.play(&mut self.store, now);
            }
            ActionKind::Pause => {
                self.executor.pause(&mut self.store, now);
            }
            ActionKind::Next => self.executor.next(&self.store),
            ActionKind::Previous => self.executor.previous(&self.store),
            ActionKind::Shuffle => {
                self.executor.toggle_shuffle(&mut self.store);
            }
            ActionKind::Repeat => {
                self.executor.cycle_repeat(&mut self.store);
            }
            ActionKind::Rating => {
                let step = self
                    .store
                    .contexts
                    .get(context)
                    .map_or(1, |e| e.settings.rating_mode.step());
                self.executor
                    .adjust_rating(&mut self.store, step as i32, true, now);
            }
            ActionKind::Time => {
                if let Some(entry) = self.store.contexts.get_mut(context) {
                    entry.show_remaining = !entry.show_remaining;
                }
            }
            ActionKind::Info | ActionKind::Strip | ActionKind::Unknown => return,
        }
        self.render_all(now);
    }

    fn on_dial_rotate(&mut self, context: &str, ticks: i32, now: Instant) {
        let Some(entry) = self.store.contexts.get(context) else {
            return;
        };
        if entry.kind != ActionKind::Strip || ticks == 0 {
            return;
        }
        let action = entry.settings.dial_action;
        let rating_mode = entry.settings.rating_mode;

        match action {
            DialAction::None => return,
            DialAction::Skip if ticks > 0 => self.executor.next(&self.store),
            DialAction::Skip => self.executor.previous(&self.store),
            DialAction::Volume => {
                self.executor.adjust_volume(&mut self.store, ticks, now);
            }
            DialAction::Rating => {
                let delta = ticks.saturating_mul(rating_mode.step() as i32);
                if self
                    .executor
                    .adjust_rating(&mut self.store, delta, false, now)
                    .is_none()
                {
                    return;
                }
            }
        }

        let view = ViewModel::capture(&self.store, now);
        if let Some((title, value)) = ui::dial_overlay(action, &view, ticks, rating_mode) {
            self.store
                .contexts
                .show_overlay(context, &title, &value, self.timing.overlay(), &self.events);
            self.render_context(context, now);
        }
    }
}
