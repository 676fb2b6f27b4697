//! Registry of visible keys and dials.

use crate::app::config::{ActionKind, ActionSettings};
use crate::app::events::{AppEvent, EventSender};
use crate::timer::{self, TimerHandle};
use crate::transport::protocol::{Outbound, Settings};
use std::collections::BTreeMap;
use std::time::Duration;

/// A short-lived message on a touch strip (volume level, skip arrow...).
#[derive(Debug)]
pub struct Overlay {
    pub title: String,
    pub value: String,
    pub serial: u64,
    _expiry: TimerHandle,
}

#[derive(Debug)]
pub struct ContextEntry {
    pub action: String,
    pub kind: ActionKind,
    pub raw_settings: Settings,
    pub settings: ActionSettings,
    pub overlay: Option<Overlay>,
    /// Time keys toggle between elapsed and remaining.
    pub show_remaining: bool,
    /// Last feedback layout sent to a strip.
    pub layout: Option<&'static str>,
    /// Last messages sent, so identical frames are not resent.
    pub last_render: Vec<Outbound>,
}

impl ContextEntry {
    fn new(action: &str, settings: Settings) -> Self {
        Self {
            action: action.to_string(),
            kind: ActionKind::from_uuid(action),
            settings: ActionSettings::from_map(&settings),
            raw_settings: settings,
            overlay: None,
            show_remaining: false,
            layout: None,
            last_render: Vec::new(),
        }
    }

    /// Forget what was sent so the next frame goes out in full.
    pub fn invalidate(&mut self) {
        self.layout = None;
        self.last_render.clear();
    }
}

#[derive(Debug, Default)]
pub struct ContextRegistry {
    entries: BTreeMap<String, ContextEntry>,
    overlay_serial: u64,
}

impl ContextRegistry {
    /// Returns true when this is the first visible context.
    pub fn add(&mut self, context: &str, action: &str, settings: Settings) -> bool {
        let first = self.entries.is_empty();
        self.entries
            .insert(context.to_string(), ContextEntry::new(action, settings));
        first
    }

    pub fn remove(&mut self, context: &str) -> Option<ContextEntry> {
        self.entries.remove(context)
    }

    pub fn update_settings(&mut self, context: &str, settings: Settings) -> bool {
        let Some(entry) = self.entries.get_mut(context) else {
            return false;
        };
        entry.settings = ActionSettings::from_map(&settings);
        entry.raw_settings = settings;
        entry.invalidate();
        true
    }

    pub fn get(&self, context: &str) -> Option<&ContextEntry> {
        self.entries.get(context)
    }

    pub fn get_mut(&mut self, context: &str) -> Option<&mut ContextEntry> {
        self.entries.get_mut(context)
    }

    pub fn kind(&self, context: &str) -> Option<ActionKind> {
        self.entries.get(context).map(|e| e.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ContextEntry)> {
        self.entries.iter_mut()
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.invalidate();
        }
    }

    /// Shows (or restarts) an overlay. A newer overlay replaces the older
    /// one along with its expiry timer.
    pub fn show_overlay(
        &mut self,
        context: &str,
        title: &str,
        value: &str,
        duration: Duration,
        events: &EventSender,
    ) -> Option<u64> {
        let entry = self.entries.get_mut(context)?;
        self.overlay_serial += 1;
        let serial = self.overlay_serial;
        let expiry = timer::after(
            duration,
            events,
            AppEvent::OverlayExpired {
                context: context.to_string(),
                serial,
            },
        );
        entry.overlay = Some(Overlay {
            title: title.to_string(),
            value: value.to_string(),
            serial,
            _expiry: expiry,
        });
        entry.last_render.clear();
        Some(serial)
    }

    /// Stale expiries (from an overlay since replaced) are ignored.
    pub fn expire_overlay(&mut self, context: &str, serial: u64) -> bool {
        let Some(entry) = self.entries.get_mut(context) else {
            return false;
        };
        if entry.overlay.as_ref().map(|o| o.serial) != Some(serial) {
            return false;
        }
        entry.overlay = None;
        entry.invalidate();
        true
    }

    pub fn has_overlay(&self, context: &str) -> bool {
        self.entries
            .get(context)
            .is_some_and(|e| e.overlay.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_add_reports_first() {
        let mut contexts = ContextRegistry::default();
        assert!(contexts.add("a", "com.ampdeck.time", Settings::new()));
        assert!(!contexts.add("b", "com.ampdeck.next", Settings::new()));
        assert_eq!(contexts.kind("b"), Some(ActionKind::Next));
        contexts.remove("a");
        contexts.remove("b");
        assert!(contexts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_restart_ignores_stale_expiry() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut contexts = ContextRegistry::default();
        contexts.add("strip", "com.ampdeck.strip", Settings::new());

        let first = contexts
            .show_overlay("strip", "VOLUME", "55%", Duration::from_millis(1500), &tx)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let second = contexts
            .show_overlay("strip", "VOLUME", "60%", Duration::from_millis(1500), &tx)
            .unwrap();

        assert!(!contexts.expire_overlay("strip", first));
        assert!(contexts.has_overlay("strip"));

        // Only the restarted timer fires, 1.5s after the second rotation.
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(200)).await;
        match rx.try_recv() {
            Ok(AppEvent::OverlayExpired { serial, .. }) => assert_eq!(serial, second),
            other => panic!("unexpected {:?}", other),
        }
        assert!(contexts.expire_overlay("strip", second));
        assert!(!contexts.has_overlay("strip"));
    }
}
