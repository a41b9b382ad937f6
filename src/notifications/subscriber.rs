//! Attaching the pipeline to host channels
//!
//! The host ships its own log subscribers for the same channels. Leaving
//! them attached would log every request twice, so they are detached before
//! the pipeline subscribes. Listeners added by other libraries stay.

use super::bus::{NotificationBus, SubscriberHandle};
use super::{namespace_channels, Notification};
use crate::core::{Pipeline, Result, StasherError};
use std::sync::Arc;

/// Origin marker of the pipeline's own listeners
pub const PIPELINE_ORIGIN: &str = "Stasher::LogSubscriber";

/// Origin markers of the host's default log subscribers
pub const DEFAULT_HOST_ORIGINS: [&str; 3] = [
    "ActionController::LogSubscriber",
    "ActionView::LogSubscriber",
    "ActiveRecord::LogSubscriber",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionManager {
    host_origins: Vec<String>,
}

impl SubscriptionManager {
    pub fn new<I, S>(host_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host_origins: host_origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn host_origins(&self) -> &[String] {
        &self.host_origins
    }

    pub fn is_host_default(&self, handle: &SubscriberHandle) -> bool {
        self.host_origins.iter().any(|origin| *origin == handle.origin)
    }

    /// Detach host default listeners from one channel
    ///
    /// Returns how many listeners were removed.
    pub fn remove_host_subscribers(&self, bus: &dyn NotificationBus, channel: &str) -> usize {
        let defaults: Vec<SubscriberHandle> = bus
            .subscribers(channel)
            .into_iter()
            .filter(|handle| self.is_host_default(handle))
            .collect();

        for handle in &defaults {
            bus.unsubscribe(handle);
        }
        defaults.len()
    }

    /// Detach host default listeners from every channel the bus knows
    pub fn remove_existing_subscriptions(&self, bus: &dyn NotificationBus) -> usize {
        bus.channels()
            .iter()
            .map(|channel| self.remove_host_subscribers(bus, channel))
            .sum()
    }

    /// Subscribe `pipeline` to each channel after detaching the host defaults
    ///
    /// Channels that already carry a pipeline listener are left as they are.
    /// Returns the handles that were registered by this call.
    pub fn attach(
        &self,
        bus: &dyn NotificationBus,
        channels: &[&str],
        pipeline: &Arc<Pipeline>,
    ) -> Vec<SubscriberHandle> {
        let mut attached = Vec::with_capacity(channels.len());

        for channel in channels {
            self.remove_host_subscribers(bus, channel);

            let already_attached = bus
                .subscribers(channel)
                .iter()
                .any(|handle| handle.origin == PIPELINE_ORIGIN);
            if already_attached {
                continue;
            }

            let pipeline = Arc::clone(pipeline);
            attached.push(bus.subscribe(
                channel,
                PIPELINE_ORIGIN,
                Arc::new(move |notification: &Notification| pipeline.handle(notification)),
            ));
        }

        attached
    }

    /// Attach to every channel of a host namespace such as `active_record`
    pub fn attach_to(
        &self,
        bus: &dyn NotificationBus,
        namespace: &str,
        pipeline: &Arc<Pipeline>,
    ) -> Result<Vec<SubscriberHandle>> {
        let channels = namespace_channels(namespace).ok_or_else(|| {
            StasherError::config("attach_to", format!("unknown namespace '{}'", namespace))
        })?;
        Ok(self.attach(bus, channels, pipeline))
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_ORIGINS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{InMemoryBus, PROCESS_ACTION, SQL};
    use crate::sinks::MemorySink;

    const RENDER_TEMPLATE: &str = "render_template.action_view";

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(
            Pipeline::builder()
                .source("source")
                .sink(MemorySink::new())
                .build()
                .expect("valid pipeline"),
        )
    }

    fn host_bus() -> InMemoryBus {
        let bus = InMemoryBus::new();
        bus.subscribe(
            PROCESS_ACTION,
            "ActionController::LogSubscriber",
            Arc::new(|_: &Notification| Ok(())),
        );
        bus.subscribe(
            RENDER_TEMPLATE,
            "ActionView::LogSubscriber",
            Arc::new(|_: &Notification| Ok(())),
        );
        bus
    }

    #[test]
    fn test_removes_controller_subscribers() {
        let bus = host_bus();
        let removed = SubscriptionManager::default().remove_host_subscribers(&bus, PROCESS_ACTION);

        assert_eq!(removed, 1);
        assert!(bus.subscribers(PROCESS_ACTION).is_empty());
    }

    #[test]
    fn test_removes_subscribers_for_all_channels() {
        let bus = host_bus();
        SubscriptionManager::default().remove_existing_subscriptions(&bus);

        assert!(bus.subscribers(RENDER_TEMPLATE).is_empty());
        assert!(bus.subscribers(PROCESS_ACTION).is_empty());
    }

    #[test]
    fn test_keeps_third_party_subscribers() {
        let bus = host_bus();
        bus.subscribe(PROCESS_ACTION, "MyApp::Audit", Arc::new(|_: &Notification| Ok(())));

        SubscriptionManager::default().remove_existing_subscriptions(&bus);

        let remaining = bus.subscribers(PROCESS_ACTION);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].origin, "MyApp::Audit");
    }

    #[test]
    fn test_attach_replaces_host_default() {
        let bus = host_bus();
        let handles = SubscriptionManager::default().attach(&bus, &[PROCESS_ACTION], &pipeline());

        assert_eq!(handles.len(), 1);
        let origins: Vec<String> = bus
            .subscribers(PROCESS_ACTION)
            .into_iter()
            .map(|h| h.origin)
            .collect();
        assert_eq!(origins, [PIPELINE_ORIGIN]);
    }

    #[test]
    fn test_attach_twice_does_not_duplicate() {
        let bus = InMemoryBus::new();
        let manager = SubscriptionManager::default();
        let pipeline = pipeline();

        manager.attach(&bus, &[SQL], &pipeline);
        let second = manager.attach(&bus, &[SQL], &pipeline);

        assert!(second.is_empty());
        assert_eq!(bus.listener_count(SQL), 1);
    }

    #[test]
    fn test_attach_to_namespace() {
        let bus = InMemoryBus::new();
        let handles = SubscriptionManager::default()
            .attach_to(&bus, "action_controller", &pipeline())
            .unwrap();

        assert_eq!(handles.len(), 3);
        assert_eq!(bus.channels().len(), 3);
    }

    #[test]
    fn test_attach_to_unknown_namespace_fails() {
        let bus = InMemoryBus::new();
        let result = SubscriptionManager::default().attach_to(&bus, "action_mailer", &pipeline());

        assert!(matches!(result, Err(StasherError::InvalidConfiguration { .. })));
    }
}
