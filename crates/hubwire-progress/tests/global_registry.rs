use hubwire_progress::{discard, ProgressFactoryRegistry, ProgressType};
use serial_test::serial;
use std::sync::Arc;

#[derive(serde::Serialize)]
struct IndexingStep {
    done: usize,
    total: usize,
}

#[test]
#[serial]
fn test_global_registry_is_shared() {
    let a = ProgressFactoryRegistry::global();
    let b = ProgressFactoryRegistry::global();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
#[serial]
fn test_global_registry_caches_across_callers() {
    let ty = ProgressType::of::<IndexingStep>();

    // No other test touches this type, so the first create is a cache miss.
    assert!(!ProgressFactoryRegistry::global().contains(&ty));
    let before = ProgressFactoryRegistry::global().factories_built();
    let first = ProgressFactoryRegistry::global().create(&ty, discard(), None);
    let after_first = ProgressFactoryRegistry::global().factories_built();
    let second = ProgressFactoryRegistry::global().create(&ty, discard(), None);
    let after_second = ProgressFactoryRegistry::global().factories_built();

    assert_eq!(after_first, before + 1);
    assert_eq!(after_first, after_second);
    assert!(ProgressFactoryRegistry::global().contains(&ty));

    first.set_complete();
    assert!(!second.is_complete());
}
