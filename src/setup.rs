//! One-time pipeline initialization

use crate::config::Config;
use crate::core::{Pipeline, PipelineBuilder, Result, SeverityLogger, StasherError};
use crate::notifications::{namespace_channels, NotificationBus, SubscriptionManager};
use std::sync::Arc;

/// Build the pipeline from `config` and hook it into the host
///
/// `builder` carries what configuration files cannot express: the sink and
/// optionally a clock or custom-fields hook. Source, level, parameter filter
/// and timestamp format come from `config`.
///
/// In order: validates every configured namespace, builds the pipeline
/// (enabled), installs the `log` bridge when `redirect_logger` is set,
/// detaches the host's default subscribers when `suppress_app_log` is set,
/// and attaches to each namespace. Misconfiguration and an already installed
/// host logger fail here, before anything is subscribed.
///
/// # Example
///
/// ```
/// use stasher::prelude::*;
///
/// let bus = InMemoryBus::new();
/// let config = Config {
///     source: Some("rails://web-1/shop".to_string()),
///     ..Default::default()
/// };
///
/// let pipeline = stasher::setup(&config, Pipeline::builder().sink(MemorySink::new()), &bus).unwrap();
/// assert!(pipeline.is_enabled());
/// assert_eq!(bus.channels().len(), 4);
/// ```
pub fn setup(
    config: &Config,
    builder: PipelineBuilder,
    bus: &dyn NotificationBus,
) -> Result<Arc<Pipeline>> {
    if let Some(unknown) = config
        .attach_to
        .iter()
        .find(|namespace| namespace_channels(namespace).is_none())
    {
        return Err(StasherError::config(
            "attach_to",
            format!("unknown namespace '{}'", unknown),
        ));
    }

    let pipeline = Arc::new(
        builder
            .source(config.resolved_source()?)
            .min_level(config.level())
            .enabled(true)
            .filter_parameters(config.filter_parameters.iter().cloned())
            .timestamp_format(config.timestamp_format.clone())
            .build()?,
    );

    if config.redirect_logger {
        SeverityLogger::new(Arc::clone(&pipeline)).install()?;
    }

    let manager = SubscriptionManager::new(config.host_origins.iter().cloned());
    if config.suppress_app_log {
        manager.remove_existing_subscriptions(bus);
    }
    for namespace in &config.attach_to {
        manager.attach_to(bus, namespace, &pipeline)?;
    }

    Ok(pipeline)
}
