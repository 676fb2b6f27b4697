//! The poll and render loops.

use crate::app::config::Timing;
use crate::app::events::{AppEvent, EventSender};
use crate::timer::{self, TimerHandle};
use tokio::time::Instant;
use tracing::{debug, info};

pub struct Scheduler {
    timing: Timing,
    poll: Option<TimerHandle>,
    render: Option<TimerHandle>,
    poll_in_flight: bool,
}

impl Scheduler {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            poll: None,
            render: None,
            poll_in_flight: false,
        }
    }

    /// Starts both loops. Calling it again while running is a no-op and
    /// returns false.
    pub fn start(&mut self, events: &EventSender) -> bool {
        if self.is_running() {
            return false;
        }
        let now = Instant::now();
        // First poll goes out immediately.
        self.poll = Some(timer::every(now, self.timing.poll_interval(), events, || {
            AppEvent::PollTick
        }));
        let render_period = self.timing.render_interval();
        self.render = Some(timer::every(now + render_period, render_period, events, || {
            AppEvent::RenderTick
        }));
        info!("Polling started");
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.poll = None;
        self.render = None;
        info!("Polling stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.poll.is_some()
    }

    /// Claims the poll slot. A tick that arrives while a poll chain is still
    /// in flight is absorbed.
    pub fn begin_poll(&mut self) -> bool {
        if self.poll_in_flight {
            debug!("Poll tick absorbed: previous poll still in flight");
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    pub fn finish_poll(&mut self) {
        self.poll_in_flight = false;
    }
}
