//! Host notifications consumed by the pipeline
//!
//! Each host channel the pipeline understands maps onto one variant of
//! [`Notification`] with a strongly-typed payload.

pub mod bus;
pub mod extract;
pub mod subscriber;

pub use bus::{Callback, InMemoryBus, NotificationBus, SubscriberHandle, SubscriptionId};
pub use extract::ParamFilter;
pub use subscriber::SubscriptionManager;

use crate::core::{ErrorReport, Fields, Message, Severity};
use std::time::Duration;

pub const START_PROCESSING: &str = "start_processing.action_controller";
pub const PROCESS_ACTION: &str = "process_action.action_controller";
pub const REDIRECT_TO: &str = "redirect_to.action_controller";
pub const SQL: &str = "sql.active_record";
pub const LOG: &str = "log.stasher";

const ACTION_CONTROLLER_CHANNELS: &[&str] = &[START_PROCESSING, PROCESS_ACTION, REDIRECT_TO];
const ACTIVE_RECORD_CHANNELS: &[&str] = &[SQL];

/// Channels the pipeline subscribes to for a host namespace
pub fn namespace_channels(namespace: &str) -> Option<&'static [&'static str]> {
    match namespace {
        "action_controller" => Some(ACTION_CONTROLLER_CHANNELS),
        "active_record" => Some(ACTIVE_RECORD_CHANNELS),
        _ => None,
    }
}

/// Request metadata reported at the start and end of a request
///
/// Runtimes are in milliseconds, as the host reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPayload {
    pub method: Option<String>,
    pub path: Option<String>,
    pub params: Fields,
    /// Mime type string, e.g. `application/json`
    pub format: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
    pub remote_ip: Option<String>,
    /// Raw `X-Forwarded-For` header
    pub forwarded_for: Option<String>,
    pub request_id: Option<String>,
    pub status: Option<u16>,
    pub view_runtime: Option<f64>,
    pub db_runtime: Option<f64>,
    pub exception: Option<ErrorReport>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlPayload {
    pub name: String,
    pub sql: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectPayload {
    pub location: String,
    pub status: Option<u16>,
}

/// Host lifecycle notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StartProcessing(RequestPayload),
    ProcessAction {
        payload: RequestPayload,
        duration: Duration,
    },
    Sql(SqlPayload),
    RedirectTo(RedirectPayload),
    Log {
        severity: Severity,
        message: Message,
    },
    /// Channel the pipeline has no handler for
    Other { name: String, payload: Fields },
}

impl Notification {
    /// Canonical channel this notification is published on
    pub fn channel(&self) -> &str {
        match self {
            Notification::StartProcessing(_) => START_PROCESSING,
            Notification::ProcessAction { .. } => PROCESS_ACTION,
            Notification::Sql(_) => SQL,
            Notification::RedirectTo(_) => REDIRECT_TO,
            Notification::Log { .. } => LOG,
            Notification::Other { name, .. } => name,
        }
    }
}
