//! Connectivity observation.
//!
//! A [`ConnectivityMonitor`] reports the current online state and hands out
//! subscriptions that receive discrete transition events. Dropping a
//! subscription (or calling [`ConnectivitySubscription::unsubscribe`])
//! deregisters it.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl ConnectivityEvent {
    fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// Source of the device's online/offline state.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current online state.
    fn is_online(&self) -> bool;

    /// Register for transition events.
    fn subscribe(&self) -> ConnectivitySubscription;
}

/// Registration for connectivity transition events.
pub struct ConnectivitySubscription {
    rx: Option<broadcast::Receiver<ConnectivityEvent>>,
}

impl ConnectivitySubscription {
    fn new(rx: broadcast::Receiver<ConnectivityEvent>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A subscription that never yields an event.
    pub fn inert() -> Self {
        Self { rx: None }
    }

    /// Wait for the next transition.
    ///
    /// Returns `None` once the monitor is gone or for an inert subscription.
    pub async fn recv(&mut self) -> Option<ConnectivityEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Connectivity subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Deregister from the monitor.
    pub fn unsubscribe(self) {}
}

/// Monitor whose state is set explicitly by the embedding platform layer.
///
/// Only real transitions are broadcast; setting the current value again is
/// silent.
pub struct ManualConnectivity {
    online: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ManualConnectivity {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            online: AtomicBool::new(online),
            events,
        }
    }

    /// Update the online state, notifying subscribers on a transition.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        debug!("Connectivity changed: online = {}", online);
        // No subscribers is not an error.
        let _ = self.events.send(ConnectivityEvent::from_online(online));
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> ConnectivitySubscription {
        ConnectivitySubscription::new(self.events.subscribe())
    }
}

/// Stand-in used when the platform provides no monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl ConnectivityMonitor for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }

    fn subscribe(&self) -> ConnectivitySubscription {
        ConnectivitySubscription::inert()
    }
}
