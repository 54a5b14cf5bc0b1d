use std::sync::Arc;

use parking_lot::Mutex;

/// A side effect observed by one of the in-memory adapters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LedgerSubmitted { hash: String },
    LedgerConfirmed { hash: String },
    Stored { cid: String },
    Fetched { cid: String },
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.inner.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().clone()
    }

    /// Position of the first event matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        self.inner.lock().iter().position(predicate)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
