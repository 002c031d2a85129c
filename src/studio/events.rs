use std::sync::{Arc, Mutex};

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtEvent {
    /// An artwork was stored on the server under `id`.
    Saved { id: String },
}

/// Fan-out notification channel between studio components.
///
/// Each subscriber gets its own receiver; subscribers that went away are
/// pruned on the next emit.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<ArtEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ArtEvent> {
        let (tx, rx) = unbounded();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => warn!("Event bus lock poisoned; subscriber not registered"),
        }
        rx
    }

    /// Returns how many subscribers received the event.
    pub fn emit(&self, event: ArtEvent) -> usize {
        let Ok(mut subs) = self.subscribers.lock() else {
            warn!("Event bus lock poisoned; dropping {event:?}");
            return 0;
        };
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(subscribers = subs.len(), ?event, "Emitted event");
        subs.len()
    }
}
