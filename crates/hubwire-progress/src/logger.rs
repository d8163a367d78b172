//! Sinks for progress delivery failures.

use crate::error::DeliveryError;
use serde::{Deserialize, Serialize};

/// Write-only sink for delivery failures.
///
/// Reporters hold loggers through a `Weak` handle, so a sink that has been
/// dropped by its owner simply stops receiving failures.
pub trait DeliveryLogger: Send + Sync {
    /// Record one failed delivery of a value of type `value_type`.
    fn delivery_failed(&self, value_type: &'static str, error: &DeliveryError);
}

/// Level at which [`TracingDeliveryLogger`] emits failure events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

/// Logger that turns delivery failures into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeliveryLogger {
    level: FailureLevel,
}

impl TracingDeliveryLogger {
    pub fn new(level: FailureLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> FailureLevel {
        self.level
    }
}

impl DeliveryLogger for TracingDeliveryLogger {
    fn delivery_failed(&self, value_type: &'static str, error: &DeliveryError) {
        let code = error.code();
        match self.level {
            FailureLevel::Debug => {
                tracing::debug!(value_type, code, error = %error, "progress delivery failed")
            }
            FailureLevel::Info => {
                tracing::info!(value_type, code, error = %error, "progress delivery failed")
            }
            FailureLevel::Warn => {
                tracing::warn!(value_type, code, error = %error, "progress delivery failed")
            }
            FailureLevel::Error => {
                tracing::error!(value_type, code, error = %error, "progress delivery failed")
            }
        }
    }
}

/// Logger that discards everything.
pub struct NullDeliveryLogger;

impl DeliveryLogger for NullDeliveryLogger {
    fn delivery_failed(&self, _value_type: &'static str, _error: &DeliveryError) {}
}
