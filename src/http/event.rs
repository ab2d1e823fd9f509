//! Log listeners notified before every outbound request.

use std::sync::{Arc, Mutex, PoisonError};

use log::Level;

use super::options::RequestOptions;

/// Message carried by the event emitted for every call.
pub const NEW_REQUEST_MESSAGE: &str = "New HTTP request";

/// A diagnostic notification handed to registered listeners.
#[derive(Debug, Clone, Copy)]
pub struct LogEvent<'a> {
    pub level: Level,
    pub message: &'a str,
    pub payload: &'a RequestOptions,
}

pub type LogListener = Arc<dyn Fn(&LogEvent<'_>) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(ListenerId, LogListener)>,
}

#[derive(Default)]
pub(crate) struct Listeners {
    registry: Mutex<Registry>,
}

impl Listeners {
    pub fn subscribe(&self, listener: LogListener) -> ListenerId {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| *entry != id);
        registry.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Calls every listener in subscription order.
    ///
    /// The lock is released before the first call, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &LogEvent<'_>) {
        let snapshot: Vec<LogListener> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }
}
