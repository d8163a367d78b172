//! Runs handlers with a progress reporter bound to their invocation.

use crate::completion::CompletionGuard;
use crate::config::DispatchConfig;
use crate::invocation::Invocation;
use hubwire_progress::{
    DeliveryLogger, HubProgress, InvocationReporter, ProgressFactoryRegistry, SendProgress,
    TracingDeliveryLogger,
};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::Instrument;

pub struct InvocationDispatcher {
    registry: Arc<ProgressFactoryRegistry>,
    /// Strong owner of the failure logger; reporters only get `Weak` handles.
    logger: Option<Arc<dyn DeliveryLogger>>,
    config: DispatchConfig,
}

impl InvocationDispatcher {
    /// Dispatcher backed by the process-wide registry.
    pub fn new(config: DispatchConfig) -> Self {
        let logger = if config.log_delivery_failures {
            let logger: Arc<dyn DeliveryLogger> =
                Arc::new(TracingDeliveryLogger::new(config.failure_level));
            Some(logger)
        } else {
            None
        };

        Self {
            registry: ProgressFactoryRegistry::global(),
            logger,
            config,
        }
    }

    pub fn with_registry(mut self, registry: Arc<ProgressFactoryRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the failure logger. Takes effect even when
    /// `log_delivery_failures` is off.
    pub fn with_logger(mut self, logger: Arc<dyn DeliveryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProgressFactoryRegistry> {
        &self.registry
    }

    fn logger_handle(&self) -> Option<Weak<dyn DeliveryLogger>> {
        self.logger.as_ref().map(Arc::downgrade)
    }

    /// Resolve the reporter for `invocation` and wrap it in a guard.
    ///
    /// Returns `None` when the handler declares no progress type. The caller
    /// owns the guard and must keep it alive until the handler's result is
    /// final.
    pub fn begin(&self, invocation: &Invocation, send: SendProgress) -> Option<CompletionGuard> {
        let progress_type = invocation.progress.as_ref()?;
        let reporter = self
            .registry
            .create(progress_type, send, self.logger_handle());
        Some(CompletionGuard::new(invocation.id.clone(), reporter))
    }

    /// Run `handler` for `invocation`, completing its reporter afterwards.
    pub async fn dispatch<F, Fut, R>(
        &self,
        invocation: Invocation,
        send: SendProgress,
        handler: F,
    ) -> R
    where
        F: FnOnce(Option<Arc<dyn InvocationReporter>>) -> Fut,
        Fut: Future<Output = R>,
    {
        let span = tracing::info_span!(
            "invocation",
            invocation_id = %invocation.id,
            method = %invocation.method,
            progress_type = invocation.progress.map(|t| t.name()).unwrap_or("none")
        );

        let guard = span.in_scope(|| self.begin(&invocation, send));
        let reporter = guard.as_ref().and_then(CompletionGuard::reporter);

        let output = handler(reporter).instrument(span.clone()).await;

        if let Some(guard) = guard {
            span.in_scope(|| guard.complete());
        }
        output
    }

    /// Run `handler` with a reporter for a progress type known at compile
    /// time. The reporter is built directly, without the registry cache.
    pub async fn dispatch_typed<T, F, Fut, R>(
        &self,
        invocation: Invocation,
        send: SendProgress,
        handler: F,
    ) -> R
    where
        T: Serialize + 'static,
        F: FnOnce(Arc<HubProgress<T>>) -> Fut,
        Fut: Future<Output = R>,
    {
        let span = tracing::info_span!(
            "invocation",
            invocation_id = %invocation.id,
            method = %invocation.method,
            progress_type = std::any::type_name::<T>()
        );

        let progress = Arc::new(
            ProgressFactoryRegistry::create_typed::<T>(send).with_logger(self.logger_handle()),
        );
        let guard = CompletionGuard::new(invocation.id.clone(), progress.clone());

        let output = handler(progress).instrument(span.clone()).await;

        span.in_scope(|| guard.complete());
        output
    }
}

impl Default for InvocationDispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubwire_progress::{discard, ProgressType};

    #[test]
    fn test_logger_follows_config() {
        let quiet = InvocationDispatcher::new(DispatchConfig {
            log_delivery_failures: false,
            ..DispatchConfig::default()
        });
        assert!(quiet.logger_handle().is_none());

        let loud = InvocationDispatcher::default();
        assert!(loud.logger_handle().is_some());
    }

    #[test]
    fn test_begin_without_progress_type() {
        let dispatcher = InvocationDispatcher::default()
            .with_registry(Arc::new(ProgressFactoryRegistry::new()));
        assert!(dispatcher
            .begin(&Invocation::new("ping"), discard())
            .is_none());
        assert_eq!(dispatcher.registry().factories_built(), 0);
    }

    #[test]
    fn test_begin_resolves_through_registry() {
        let registry = Arc::new(ProgressFactoryRegistry::new());
        let dispatcher = InvocationDispatcher::default().with_registry(registry.clone());
        let invocation = Invocation::new("reindex").with_progress(ProgressType::of::<u32>());

        let guard = dispatcher.begin(&invocation, discard()).expect("guard");
        let reporter = guard.reporter().expect("reporter");
        assert_eq!(reporter.value_type(), "u32");
        assert_eq!(registry.factories_built(), 1);

        drop(guard);
        assert!(reporter.is_complete());
    }
}
