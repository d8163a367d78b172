//! The send callback a reporter is bound to.

use crate::error::DeliveryError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Pending delivery of one progress value.
pub type DeliveryFuture = BoxFuture<'static, Result<(), DeliveryError>>;

/// Delivers a progress value to the remote peer.
///
/// The callback is invoked synchronously while the reporter holds its lock,
/// so it must return quickly and must not call back into the same reporter.
/// The returned future is queued behind the reporter's earlier deliveries and
/// run to completion on the ambient tokio runtime, one at a time, in `report`
/// order. Its error, if any, goes to the reporter's logger.
///
/// Without a tokio runtime at `report` time the future is dropped unpolled
/// and only `DeliveryError::NoRuntime` is logged. A callback that does its
/// work inside the future (the usual shape for [`send_fn`]) then delivers
/// nothing; only the synchronous part of the callback has run.
pub type SendProgress = Arc<dyn Fn(Value) -> DeliveryFuture + Send + Sync>;

/// Wrap an async closure as a [`SendProgress`].
pub fn send_fn<F, Fut>(f: F) -> SendProgress
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    Arc::new(move |value| f(value).boxed())
}

/// A callback that accepts and drops every value.
pub fn discard() -> SendProgress {
    Arc::new(|_| futures::future::ready(Ok(())).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_send_fn_forwards_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let send = send_fn(move |value| {
            sink.lock().unwrap().push(value);
            async { Ok(()) }
        });

        send(serde_json::json!({"pct": 10})).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!({"pct": 10})]);
    }

    #[tokio::test]
    async fn test_discard_always_succeeds() {
        let send = discard();
        assert!(send(Value::Null).await.is_ok());
    }
}
