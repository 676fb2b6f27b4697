//! Press, hold and hold-to-seek on the next/previous keys.
//!
//! ```text
//! Idle --press--> Pressed --threshold--> Holding --boundary--> Settled
//!                    |                      |                     |
//!                 release (tap)          release               release
//!                    v                      v                     v
//!                  Idle                   Idle                  Idle
//! ```

use crate::app::config::{ActionKind, Timing};
use crate::app::state::clamp_to_track;
use crate::app::events::{AppEvent, EventSender};
use crate::timer::{self, TimerHandle};
use std::collections::HashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    Pressed,
    /// Seeking on a repeat timer.
    Holding,
    /// Hit a track boundary; waiting for release.
    Settled,
}

#[derive(Debug)]
struct Hold {
    press: u64,
    kind: ActionKind,
    phase: HoldPhase,
    /// Not clamped, so a boundary hit is detectable.
    target_ms: i64,
    frame: u32,
    timer: Option<TimerHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEffect {
    Seek(u64),
    Tap(ActionKind),
    Animate { frame: u32 },
    Settle,
}

pub struct HoldTracker {
    timing: Timing,
    holds: HashMap<String, Hold>,
    presses: u64,
}

impl HoldTracker {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            holds: HashMap::new(),
            presses: 0,
        }
    }

    /// Key down. Only seekable keys arm the hold threshold; everything
    /// else just waits for release.
    pub fn press(&mut self, context: &str, kind: ActionKind, events: &EventSender) {
        self.presses += 1;
        let press = self.presses;
        let timer = kind.seek_direction().map(|_| {
            timer::after(
                self.timing.hold_threshold(),
                events,
                AppEvent::HoldThreshold {
                    context: context.to_string(),
                    press,
                },
            )
        });
        self.holds.insert(
            context.to_string(),
            Hold {
                press,
                kind,
                phase: HoldPhase::Pressed,
                target_ms: 0,
                frame: 0,
                timer,
            },
        );
    }

    /// The threshold passed with the key still down: seed the target from the
    /// displayed position, take the first step and start repeating.
    pub fn on_threshold(
        &mut self,
        context: &str,
        press: u64,
        position_ms: u64,
        duration_ms: u64,
        events: &EventSender,
    ) -> Vec<GestureEffect> {
        let seek_step = self.timing.seek_step_ms as i64;
        let interval = self.timing.seek_interval();
        let Some(hold) = self.holds.get_mut(context) else {
            return Vec::new();
        };
        if hold.press != press || hold.phase != HoldPhase::Pressed {
            return Vec::new();
        }
        let Some(direction) = hold.kind.seek_direction() else {
            return Vec::new();
        };

        hold.phase = HoldPhase::Holding;
        hold.frame = 0;
        hold.target_ms = position_ms as i64 + direction * seek_step;
        let first = clamp_to_track(hold.target_ms, duration_ms);

        let context_id = context.to_string();
        hold.timer = Some(timer::every(
            Instant::now() + interval,
            interval,
            events,
            move || AppEvent::HoldRepeat {
                context: context_id.clone(),
                press,
            },
        ));

        vec![GestureEffect::Seek(first), GestureEffect::Animate { frame: 0 }]
    }

    /// One repeat step. Reaching either end of the track stops the repeat
    /// without seeking past it.
    pub fn on_repeat(&mut self, context: &str, press: u64, duration_ms: u64) -> Vec<GestureEffect> {
        let seek_step = self.timing.seek_step_ms as i64;
        let Some(hold) = self.holds.get_mut(context) else {
            return Vec::new();
        };
        if hold.press != press || hold.phase != HoldPhase::Holding {
            return Vec::new();
        }
        let Some(direction) = hold.kind.seek_direction() else {
            return Vec::new();
        };

        hold.frame += 1;
        hold.target_ms += direction * seek_step;
        let clamped = clamp_to_track(hold.target_ms, duration_ms);
        if clamped as i64 != hold.target_ms {
            hold.phase = HoldPhase::Settled;
            hold.timer = None;
            return vec![GestureEffect::Settle];
        }
        vec![
            GestureEffect::Animate { frame: hold.frame },
            GestureEffect::Seek(clamped),
        ]
    }

    /// Key up. A release before the threshold is a tap; after it, the seek
    /// just ends.
    pub fn release(&mut self, context: &str) -> Option<GestureEffect> {
        let hold = self.holds.remove(context)?;
        match hold.phase {
            HoldPhase::Pressed => Some(GestureEffect::Tap(hold.kind)),
            HoldPhase::Holding => Some(GestureEffect::Settle),
            HoldPhase::Settled => None,
        }
    }

    /// The owning key went away.
    pub fn cancel(&mut self, context: &str) {
        self.holds.remove(context);
    }

    /// Seek animation is on screen; renders must leave the key alone.
    pub fn is_animating(&self, context: &str) -> bool {
        self.holds
            .get(context)
            .is_some_and(|h| h.phase == HoldPhase::Holding)
    }

    pub fn phase(&self, context: &str) -> Option<HoldPhase> {
        self.holds.get(context).map(|h| h.phase)
    }
}
