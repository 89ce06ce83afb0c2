//! In-process status change notification
//!
//! Delivery path for Namf_Communication AMFStatusChange toward consumers
//! living in this process. Subscribers register at startup; the shutdown
//! sequence notifies them that the served GUAMIs became unavailable.

use anyhow::Result;

use nova5gc_sbi::Guami;

/// Availability reported to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfAvailability {
    Available,
    Unavailable,
}

/// An in-process consumer of AMF status changes
pub trait StatusSubscriber: Send + Sync {
    fn on_status_change(&self, status: NfAvailability, guami_list: &[Guami]) -> Result<()>;
}

/// The set of subscribed consumers
#[derive(Default)]
pub struct StatusSubscribers {
    subscribers: Vec<(String, Box<dyn StatusSubscriber>)>,
}

impl StatusSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, name: impl Into<String>, subscriber: Box<dyn StatusSubscriber>) {
        self.subscribers.push((name.into(), subscriber));
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver a status change to every subscriber. A subscriber error is
    /// logged and delivery continues with the rest.
    pub fn notify_status_change(&self, status: NfAvailability, guami_list: &[Guami]) {
        for (name, subscriber) in &self.subscribers {
            if let Err(e) = subscriber.on_status_change(status, guami_list) {
                log::warn!("Status subscriber '{name}' failed: {e}");
            }
        }
    }
}
