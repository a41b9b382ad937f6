//! Notification bus interface and an in-process implementation

use super::Notification;
use crate::core::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Listener callback; errors propagate to the publisher
pub type Callback = Arc<dyn Fn(&Notification) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Identifies one registered listener
///
/// `origin` names the library or module that registered the listener and
/// is what the subscription manager uses to tell host defaults apart from
/// third-party listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberHandle {
    pub id: SubscriptionId,
    pub channel: String,
    pub origin: String,
}

/// What the pipeline needs from the host's notification system
pub trait NotificationBus: Send + Sync {
    fn subscribe(&self, channel: &str, origin: &str, callback: Callback) -> SubscriberHandle;
    fn subscribers(&self, channel: &str) -> Vec<SubscriberHandle>;
    fn unsubscribe(&self, handle: &SubscriberHandle);
    /// Every channel that currently has listeners
    fn channels(&self) -> Vec<String>;
}

struct Listener {
    handle: SubscriberHandle,
    callback: Callback,
}

/// Synchronous in-process bus
///
/// Listeners run on the publishing thread, in registration order.
///
/// # Example
///
/// ```
/// use stasher::notifications::{InMemoryBus, NotificationBus, Notification, RedirectPayload};
/// use std::sync::Arc;
///
/// let bus = InMemoryBus::new();
/// bus.subscribe("redirect_to.action_controller", "MyApp::Audit", Arc::new(|_: &Notification| Ok(())));
///
/// bus.publish(&Notification::RedirectTo(RedirectPayload {
///     location: "http://example.com".to_string(),
///     status: Some(302),
/// }))
/// .unwrap();
/// ```
pub struct InMemoryBus {
    listeners: RwLock<BTreeMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver `notification` on its canonical channel
    pub fn publish(&self, notification: &Notification) -> Result<()> {
        self.publish_to(notification.channel(), notification)
    }

    /// Deliver `notification` to every listener of `channel`
    ///
    /// Stops at the first listener error and returns it.
    pub fn publish_to(&self, channel: &str, notification: &Notification) -> Result<()> {
        // Callbacks are cloned out so listeners may (un)subscribe while running.
        let callbacks: Vec<Callback> = self
            .listeners
            .read()
            .get(channel)
            .map(|listeners| listeners.iter().map(|l| Arc::clone(&l.callback)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(notification)?;
        }
        Ok(())
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.listeners.read().get(channel).map_or(0, Vec::len)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let handles: Vec<&SubscriberHandle> = listeners
            .values()
            .flat_map(|ls| ls.iter().map(|l| &l.handle))
            .collect();
        f.debug_struct("InMemoryBus").field("listeners", &handles).finish()
    }
}

impl NotificationBus for InMemoryBus {
    fn subscribe(&self, channel: &str, origin: &str, callback: Callback) -> SubscriberHandle {
        let handle = SubscriberHandle {
            id: SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            channel: channel.to_string(),
            origin: origin.to_string(),
        };

        self.listeners
            .write()
            .entry(channel.to_string())
            .or_default()
            .push(Listener {
                handle: handle.clone(),
                callback,
            });

        handle
    }

    fn subscribers(&self, channel: &str) -> Vec<SubscriberHandle> {
        self.listeners
            .read()
            .get(channel)
            .map(|listeners| listeners.iter().map(|l| l.handle.clone()).collect())
            .unwrap_or_default()
    }

    fn unsubscribe(&self, handle: &SubscriberHandle) {
        let mut listeners = self.listeners.write();
        if let Some(channel) = listeners.get_mut(&handle.channel) {
            channel.retain(|l| l.handle.id != handle.id);
            if channel.is_empty() {
                listeners.remove(&handle.channel);
            }
        }
    }

    fn channels(&self) -> Vec<String> {
        self.listeners.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StasherError;
    use crate::notifications::{RedirectPayload, REDIRECT_TO};
    use std::sync::atomic::AtomicUsize;

    fn redirect() -> Notification {
        Notification::RedirectTo(RedirectPayload {
            location: "http://example.com".to_string(),
            status: Some(302),
        })
    }

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: Callback = Arc::new(move |_: &Notification| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (count, callback)
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = InMemoryBus::new();
        let (count, callback) = counter();
        bus.subscribe(REDIRECT_TO, "test", callback);

        bus.publish(&redirect()).unwrap();
        bus.publish(&redirect()).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = InMemoryBus::new();
        let (count, callback) = counter();
        let handle = bus.subscribe(REDIRECT_TO, "test", callback);

        bus.unsubscribe(&handle);
        bus.publish(&redirect()).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(bus.subscribers(REDIRECT_TO).is_empty());
        assert!(bus.channels().is_empty());
    }

    #[test]
    fn test_subscribers_carry_origin() {
        let bus = InMemoryBus::new();
        bus.subscribe(
            REDIRECT_TO,
            "ActionController::LogSubscriber",
            Arc::new(|_: &Notification| Ok(())),
        );
        bus.subscribe(REDIRECT_TO, "MyApp::Audit", Arc::new(|_: &Notification| Ok(())));

        let origins: Vec<String> = bus
            .subscribers(REDIRECT_TO)
            .into_iter()
            .map(|h| h.origin)
            .collect();
        assert_eq!(origins, ["ActionController::LogSubscriber", "MyApp::Audit"]);
    }

    #[test]
    fn test_listener_error_propagates() {
        let bus = InMemoryBus::new();
        bus.subscribe(
            REDIRECT_TO,
            "test",
            Arc::new(|_: &Notification| Err(StasherError::sink("memory", "closed"))),
        );

        let result = bus.publish(&redirect());
        assert!(matches!(result, Err(StasherError::SinkError { .. })));
    }
}
