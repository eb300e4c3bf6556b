//! Session-change fan-out from a backend to its subscribers.
//!
//! DESIGN
//! ======
//! Each subscriber owns an unbounded channel, so notifications are never
//! dropped and arrive in emission order. A subscriber leaves by dropping its
//! [`Subscription`]; closed channels are pruned on the next emit.

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::model::{Session, SessionEvent};

/// One session-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

/// Receiving end of a backend subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SessionChange>,
}

impl Subscription {
    /// Next notification, or `None` once the backend is gone.
    pub async fn next(&mut self) -> Option<SessionChange> {
        self.rx.recv().await
    }

    /// Explicit form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

/// Registry of live subscribers.
#[derive(Debug, Default)]
pub struct SessionBroadcaster {
    senders: Mutex<Vec<mpsc::UnboundedSender<SessionChange>>>,
}

impl SessionBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        Subscription { rx }
    }

    /// Deliver `change` to every live subscriber.
    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        let change = SessionChange { event, session };
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Number of subscribers that have not been dropped.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.iter().filter(|tx| !tx.is_closed()).count()
    }
}
