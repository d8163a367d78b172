//! Per-invocation progress gate.
//!
//! A reporter starts `Active` and moves to `Completed` exactly once, when the
//! dispatcher observes that the invocation has returned. Every report checks
//! the state and starts the delivery under the same lock acquisition, so no
//! value is ever handed to the transport after completion.
//!
//! Pending deliveries go through a per-reporter queue that a single task
//! drains, so the returned futures run one at a time in `report` order.

use crate::error::{DeliveryError, ProgressError};
use crate::logger::DeliveryLogger;
use crate::sink::{DeliveryFuture, SendProgress};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

/// Lifecycle of a reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Active,
    Completed,
}

/// Typed capability handed to handler code.
pub trait Progress<T>: Send + Sync {
    /// Push one progress value to the remote peer.
    fn report(&self, value: T) -> Result<(), ProgressError>;

    /// Like [`Progress::report`], but treats a completed invocation as
    /// informational. Returns whether the value was accepted.
    fn report_lossy(&self, value: T) -> bool {
        match self.report(value) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "discarding progress value");
                false
            }
        }
    }
}

/// Type-erased reporter handle held by the dispatcher.
pub trait InvocationReporter: Send + Sync + 'static {
    /// Report an already-serialized value.
    fn report_value(&self, value: Value) -> Result<(), ProgressError>;

    /// Mark the owning invocation as returned. Idempotent.
    fn set_complete(&self);

    fn is_complete(&self) -> bool;

    /// Name of the progress value type this reporter was built for.
    fn value_type(&self) -> &'static str;

    /// Attach (or clear) the failure logger. Only called before the reporter
    /// is shared.
    fn attach_logger(&mut self, logger: Option<Weak<dyn DeliveryLogger>>);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

struct Gate {
    state: ProgressState,
    /// Feeds the drain task; created on the first accepted report.
    queue: Option<mpsc::UnboundedSender<DeliveryFuture>>,
}

/// Untyped state machine shared by every [`HubProgress`].
pub struct InvocationProgress {
    gate: Mutex<Gate>,
    send: SendProgress,
    logger: Option<Weak<dyn DeliveryLogger>>,
    value_type: &'static str,
}

impl InvocationProgress {
    pub fn new(send: SendProgress, value_type: &'static str) -> Self {
        Self {
            gate: Mutex::new(Gate {
                state: ProgressState::Active,
                queue: None,
            }),
            send,
            logger: None,
            value_type,
        }
    }

    pub fn set_logger(&mut self, logger: Option<Weak<dyn DeliveryLogger>>) {
        self.logger = logger;
    }

    pub fn state(&self) -> ProgressState {
        self.lock_gate().state
    }

    pub fn is_complete(&self) -> bool {
        self.state() == ProgressState::Completed
    }

    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Close the gate. Deliveries already queued still run; the drain task
    /// exits once it has worked through them.
    pub fn set_complete(&self) {
        let mut gate = self.lock_gate();
        gate.state = ProgressState::Completed;
        gate.queue = None;
    }

    /// Gate one report. `prepared` is the serialized value, or the error
    /// that prevented serializing it.
    pub fn report_prepared(
        &self,
        prepared: Result<Value, DeliveryError>,
    ) -> Result<(), ProgressError> {
        let rejected = {
            let mut gate = self.lock_gate();
            if gate.state == ProgressState::Completed {
                return Err(ProgressError::InvalidState);
            }
            match prepared {
                Ok(value) => {
                    let delivery = (self.send)(value);
                    self.enqueue(&mut gate, delivery)
                }
                Err(err) => Some(err),
            }
        };

        // Loggers are foreign code; keep them outside the critical section.
        if let Some(err) = rejected {
            self.log_failure(&err);
        }
        Ok(())
    }

    // A panicking send callback poisons the mutex; the gate holds no
    // half-updated invariants, so recover the guard.
    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the pending delivery behind earlier ones. Returns the failure to
    /// log when it cannot be run at all.
    fn enqueue(&self, gate: &mut Gate, delivery: DeliveryFuture) -> Option<DeliveryError> {
        let delivery = match &gate.queue {
            Some(queue) => match queue.send(delivery) {
                Ok(()) => return None,
                // The drain task is gone (its runtime shut down, or a
                // delivery panicked); start a fresh one below.
                Err(mpsc::error::SendError(delivery)) => delivery,
            },
            None => delivery,
        };
        gate.queue = None;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (queue, pending) = mpsc::unbounded_channel();
                let rejected = queue.send(delivery).err().map(|_| DeliveryError::NoRuntime);
                handle.spawn(drain(pending, self.logger.clone(), self.value_type));
                gate.queue = Some(queue);
                rejected
            }
            Err(_) => {
                drop(delivery);
                Some(DeliveryError::NoRuntime)
            }
        }
    }

    fn log_failure(&self, err: &DeliveryError) {
        forward_failure(self.logger.as_ref(), self.value_type, err);
    }
}

impl std::fmt::Debug for InvocationProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationProgress")
            .field("state", &self.state())
            .field("value_type", &self.value_type)
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}

async fn drain(
    mut pending: mpsc::UnboundedReceiver<DeliveryFuture>,
    logger: Option<Weak<dyn DeliveryLogger>>,
    value_type: &'static str,
) {
    while let Some(delivery) = pending.recv().await {
        if let Err(err) = delivery.await {
            forward_failure(logger.as_ref(), value_type, &err);
        }
    }
}

fn forward_failure(
    logger: Option<&Weak<dyn DeliveryLogger>>,
    value_type: &'static str,
    err: &DeliveryError,
) {
    if let Some(logger) = logger.and_then(Weak::upgrade) {
        logger.delivery_failed(value_type, err);
    }
}

/// Reporter for progress values of type `T`.
pub struct HubProgress<T> {
    inner: InvocationProgress,
    _value: PhantomData<fn(T)>,
}

impl<T> HubProgress<T>
where
    T: Serialize + 'static,
{
    pub fn new(send: SendProgress) -> Self {
        Self {
            inner: InvocationProgress::new(send, std::any::type_name::<T>()),
            _value: PhantomData,
        }
    }

    pub fn with_logger(mut self, logger: Option<Weak<dyn DeliveryLogger>>) -> Self {
        self.inner.set_logger(logger);
        self
    }

    pub fn report(&self, value: T) -> Result<(), ProgressError> {
        let prepared = serde_json::to_value(&value).map_err(DeliveryError::from);
        self.inner.report_prepared(prepared)
    }

    pub fn set_complete(&self) {
        self.inner.set_complete();
    }

    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    pub fn state(&self) -> ProgressState {
        self.inner.state()
    }
}

impl<T> std::fmt::Debug for HubProgress<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HubProgress").field(&self.inner).finish()
    }
}

impl<T> Progress<T> for HubProgress<T>
where
    T: Serialize + 'static,
{
    fn report(&self, value: T) -> Result<(), ProgressError> {
        HubProgress::report(self, value)
    }
}

impl<T> InvocationReporter for HubProgress<T>
where
    T: Serialize + 'static,
{
    fn report_value(&self, value: Value) -> Result<(), ProgressError> {
        self.inner.report_prepared(Ok(value))
    }

    fn set_complete(&self) {
        self.inner.set_complete();
    }

    fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    fn value_type(&self) -> &'static str {
        self.inner.value_type()
    }

    fn attach_logger(&mut self, logger: Option<Weak<dyn DeliveryLogger>>) {
        self.inner.set_logger(logger);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Recover the typed view of a reporter built for `T`.
pub fn downcast_progress<T>(reporter: Arc<dyn InvocationReporter>) -> Option<Arc<HubProgress<T>>>
where
    T: Serialize + 'static,
{
    reporter.into_any().downcast::<HubProgress<T>>().ok()
}
