//! Progress reporting for long-running remote invocations.
//!
//! A handler may push intermediate values to the client while its invocation
//! runs, and is refused once the invocation has returned:
//!
//! ```text
//!  dispatcher                       handler                 transport
//!      │ registry.create(ty, send)     │                        │
//!      │──────────────┐                │                        │
//!      │  reporter    │                │                        │
//!      │◀─────────────┘                │                        │
//!      │ run(handler, reporter) ──────▶│ report(v) ───────────▶ │ send(v)
//!      │                               │ report(v) ───────────▶ │ send(v)
//!      │◀───────────── returns ────────│                        │
//!      │ set_complete()                │                        │
//!      │                               │ report(v) ✗ InvalidState
//! ```
//!
//! Delivery is fire-and-forget: failures are routed to a [`DeliveryLogger`]
//! and never reach the handler.

pub mod error;
pub mod logger;
pub mod registry;
pub mod reporter;
pub mod sink;

pub use error::{DeliveryError, ProgressError};
pub use logger::{DeliveryLogger, FailureLevel, NullDeliveryLogger, TracingDeliveryLogger};
pub use registry::{ProgressFactory, ProgressFactoryRegistry, ProgressType};
pub use reporter::{
    downcast_progress, HubProgress, InvocationProgress, InvocationReporter, Progress,
    ProgressState,
};
pub use sink::{discard, send_fn, DeliveryFuture, SendProgress};
