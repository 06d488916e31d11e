//! Notification boundary between the authority and everything that only watches.
//!
//! The simulation calls [`GameObserver::notify`] synchronously right after each
//! committed mutation, so observers see events in commit order.

use shared::GameEvent;

pub trait GameObserver {
    fn notify(&mut self, event: GameEvent);
}

/// Buffers events until the network layer drains them into a broadcast.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl GameObserver for EventQueue {
    fn notify(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
