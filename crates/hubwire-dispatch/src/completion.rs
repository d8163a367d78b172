//! RAII completion of an invocation's reporter.
//!
//! The dispatcher must mark the reporter complete exactly once after the
//! handler's result is final, including when the handler panics or its
//! future is dropped mid-flight.

use crate::invocation::InvocationId;
use hubwire_progress::InvocationReporter;
use std::sync::Arc;

/// Completes the wrapped reporter when consumed or dropped.
///
/// ```ignore
/// let guard = CompletionGuard::new(id, reporter.clone());
/// let result = handler(reporter).await;
/// guard.complete(); // or let it drop
/// ```
pub struct CompletionGuard {
    invocation_id: InvocationId,
    reporter: Option<Arc<dyn InvocationReporter>>,
}

impl CompletionGuard {
    pub fn new(invocation_id: InvocationId, reporter: Arc<dyn InvocationReporter>) -> Self {
        Self {
            invocation_id,
            reporter: Some(reporter),
        }
    }

    pub fn invocation_id(&self) -> &InvocationId {
        &self.invocation_id
    }

    /// The guarded reporter, for handing to the handler.
    pub fn reporter(&self) -> Option<Arc<dyn InvocationReporter>> {
        self.reporter.clone()
    }

    /// Mark the invocation as returned and consume the guard.
    pub fn complete(mut self) {
        if let Some(reporter) = self.reporter.take() {
            reporter.set_complete();
            tracing::debug!(invocation_id = %self.invocation_id, "invocation completed");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(reporter) = self.reporter.take() {
            reporter.set_complete();
            tracing::debug!(
                invocation_id = %self.invocation_id,
                "invocation completed by guard drop (panic or cancellation)"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubwire_progress::{discard, HubProgress, ProgressError};
    use serde_json::Value;

    fn reporter() -> Arc<dyn InvocationReporter> {
        Arc::new(HubProgress::<u32>::new(discard()))
    }

    #[test]
    fn test_explicit_complete() {
        let reporter = reporter();
        let guard = CompletionGuard::new("inv_1".into(), reporter.clone());
        assert!(!reporter.is_complete());

        guard.complete();
        assert!(reporter.is_complete());
        assert_eq!(
            reporter.report_value(Value::from(1)),
            Err(ProgressError::InvalidState)
        );
    }

    #[test]
    fn test_drop_completes() {
        let reporter = reporter();
        {
            let _guard = CompletionGuard::new("inv_2".into(), reporter.clone());
        }
        assert!(reporter.is_complete());
    }

    #[test]
    fn test_panic_unwinding_completes() {
        let reporter = reporter();
        let guarded = reporter.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = CompletionGuard::new("inv_3".into(), guarded);
            panic!("handler failed");
        }));

        assert!(result.is_err());
        assert!(reporter.is_complete());
    }

    #[test]
    fn test_guard_exposes_reporter() {
        let reporter = reporter();
        let guard = CompletionGuard::new("inv_4".into(), reporter.clone());
        let handed_out = guard.reporter().expect("reporter");

        assert!(Arc::ptr_eq(&handed_out, &reporter));
        assert_eq!(guard.invocation_id().as_str(), "inv_4");
    }
}
