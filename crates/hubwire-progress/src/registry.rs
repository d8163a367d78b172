//! Reporter construction for progress types only known at runtime.
//!
//! A dispatcher learns a handler's progress value type from its metadata, as a
//! [`ProgressType`]. The registry turns that descriptor into a factory closure
//! once per type and reuses it for every later invocation.

use crate::logger::DeliveryLogger;
use crate::reporter::{HubProgress, InvocationReporter};
use crate::sink::SendProgress;
use moka::sync::Cache;
use serde::Serialize;
use std::any::TypeId;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Builds a fresh reporter bound to a send callback.
pub type ProgressFactory = Arc<dyn Fn(SendProgress) -> Box<dyn InvocationReporter> + Send + Sync>;

/// Runtime descriptor of a progress value type.
#[derive(Clone, Copy)]
pub struct ProgressType {
    id: TypeId,
    name: &'static str,
    build: fn() -> ProgressFactory,
}

impl ProgressType {
    pub fn of<T>() -> Self
    where
        T: Serialize + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            build: build_factory::<T>,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ProgressType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProgressType {}

impl Hash for ProgressType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for ProgressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProgressType").field(&self.name).finish()
    }
}

fn build_factory<T>() -> ProgressFactory
where
    T: Serialize + 'static,
{
    Arc::new(|send: SendProgress| -> Box<dyn InvocationReporter> {
        Box::new(HubProgress::<T>::new(send))
    })
}

/// Cache of reporter factories keyed by progress value type.
pub struct ProgressFactoryRegistry {
    factories: Cache<TypeId, ProgressFactory>,
    built: AtomicUsize,
}

impl ProgressFactoryRegistry {
    pub fn new() -> Self {
        Self {
            // No capacity bound: entries are immutable and live as long as
            // the registry.
            factories: Cache::builder().build(),
            built: AtomicUsize::new(0),
        }
    }

    /// Process-wide registry.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ProgressFactoryRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Build a reporter for `progress_type`, bound to `send`, logging
    /// delivery failures to `logger`.
    pub fn create(
        &self,
        progress_type: &ProgressType,
        send: SendProgress,
        logger: Option<Weak<dyn DeliveryLogger>>,
    ) -> Arc<dyn InvocationReporter> {
        let factory = self.factory(progress_type);
        let mut reporter = factory(send);
        reporter.attach_logger(logger);
        Arc::from(reporter)
    }

    /// Build a reporter when `T` is known at compile time. Skips the cache.
    pub fn create_typed<T>(send: SendProgress) -> HubProgress<T>
    where
        T: Serialize + 'static,
    {
        HubProgress::new(send)
    }

    /// Cached factory for `progress_type`, built on first use.
    pub fn factory(&self, progress_type: &ProgressType) -> ProgressFactory {
        self.factories.get_with(progress_type.id(), || {
            self.built.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                progress_type = progress_type.name(),
                "building progress reporter factory"
            );
            (progress_type.build)()
        })
    }

    pub fn contains(&self, progress_type: &ProgressType) -> bool {
        self.factories.contains_key(&progress_type.id())
    }

    /// How many factories this registry has constructed so far.
    pub fn factories_built(&self) -> usize {
        self.built.load(Ordering::Relaxed)
    }
}

impl Default for ProgressFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
