// Capture / retake / reset workflow around the BackgroundStore.
//
//   Idle --capture--> Capturing --delay elapsed--> Active
//   Active --retake--> Capturing --delay elapsed--> Active
//   any --reset--> Idle

use crate::background::BackgroundStore;
use crate::types::FrameBuffer;
use std::fmt;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Pause between a capture request and the actual copy, so the HUD can show
/// "CAPTURING" (and the user can step out of frame).
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloakState {
    Idle,
    Capturing { requested_at: Instant },
    Active,
}

impl CloakState {
    pub fn name(&self) -> &'static str {
        match self {
            CloakState::Idle => "IDLE",
            CloakState::Capturing { .. } => "CAPTURING",
            CloakState::Active => "ACTIVE",
        }
    }
}

impl fmt::Display for CloakState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Published to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloakEvent {
    StateChanged { from: CloakState, to: CloakState },
    BackgroundCaptured { width: usize, height: usize },
}

pub struct CloakController {
    state: CloakState,
    store: BackgroundStore,
    capture_delay: Duration,
    subscribers: Vec<mpsc::Sender<CloakEvent>>,
}

impl CloakController {
    pub fn new(capture_delay: Duration) -> Self {
        Self {
            state: CloakState::Idle,
            store: BackgroundStore::new(),
            capture_delay,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> CloakState {
        self.state
    }

    pub fn store(&self) -> &BackgroundStore {
        &self.store
    }

    /// Receive every transition from now on. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::Receiver<CloakEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Ask for a (re)capture. Ignored while one is already pending.
    pub fn request_capture(&mut self, now: Instant) {
        if matches!(self.state, CloakState::Capturing { .. }) {
            return;
        }
        if self.store.is_populated() {
            log::debug!("retake requested; keying against the previous background meanwhile");
        }
        self.transition(CloakState::Capturing { requested_at: now });
    }

    /// Call once per tick, before compositing. Performs a pending capture
    /// from `live` once the delay has elapsed.
    pub fn poll(&mut self, now: Instant, live: &FrameBuffer) {
        let CloakState::Capturing { requested_at } = self.state else {
            return;
        };
        if now.saturating_duration_since(requested_at) < self.capture_delay {
            return;
        }

        self.store.capture(live);
        self.publish(CloakEvent::BackgroundCaptured { width: live.width, height: live.height });
        self.transition(CloakState::Active);
    }

    /// Drop the background and go back to plain live video.
    pub fn reset(&mut self) {
        self.store.clear();
        if self.state != CloakState::Idle {
            self.transition(CloakState::Idle);
        }
    }

    fn transition(&mut self, to: CloakState) {
        let from = self.state;
        self.state = to;
        log::info!("cloak: {from} -> {to}");
        self.publish(CloakEvent::StateChanged { from, to });
    }

    fn publish(&mut self, event: CloakEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

impl Default for CloakController {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_DELAY)
    }
}
