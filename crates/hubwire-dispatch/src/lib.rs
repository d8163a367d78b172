//! Dispatcher-side integration of invocation progress.
//!
//! The dispatcher resolves a reporter for each invocation whose handler
//! declares a progress type, hands it to the handler, and marks it complete
//! once the handler's result is final. Completion is tied to a
//! [`CompletionGuard`], so early returns, panics and dropped futures all
//! close the progress window.

pub mod completion;
pub mod config;
pub mod dispatcher;
pub mod invocation;

pub use completion::CompletionGuard;
pub use config::{ConfigError, DispatchConfig};
pub use dispatcher::InvocationDispatcher;
pub use invocation::{Invocation, InvocationId};
