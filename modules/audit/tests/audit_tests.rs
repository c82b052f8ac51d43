//! Wires the audit trail through a real container over the linked modules.

use audit::{AuditError, Clock, SystemClock};
use injectkit::{Container, Instance, ModuleSet, Priority, ProviderType, Resolution};
use kv_store::{FileStore, MemStore, Store};

// Keep both plugin crates linked so their registrations are visible.
#[allow(dead_code)]
fn _ensure_modules_linked() {
    let _ = std::any::type_name::<MemStore>();
    let _ = std::any::type_name::<SystemClock>();
}

#[test]
fn audit_trail_end_to_end() {
    // Not wired yet.
    assert!(matches!(audit::record("too early"), Err(AuditError::NotInjected("store"))));

    let container = Container::new();
    let report = container.start_injection(&ModuleSet::new(["kv_store", "audit"]));

    assert!(report.is_complete(), "unresolved: {:?}", report.unresolved);
    // RemoteStore needs KV_STORE_REMOTE_URL and stays out quietly.
    assert_eq!(report.load.unprovidable(), 1);
    assert_eq!(report.load.loaded(), 3);

    let store = report.resolved_site("audit::trail", "STORE").unwrap();
    assert_eq!(store.provider, std::any::type_name::<MemStore>());
    assert_eq!(store.resolution, Resolution::BestMatch);
    assert_eq!(
        report.resolved_site("audit::trail", "CONTAINER").unwrap().resolution,
        Resolution::Exact
    );

    let first = audit::record("user alice logged in").unwrap();
    audit::record("user alice logged out").unwrap();
    assert_eq!(first.backend, "memory");

    let events = audit::recent(10).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message, "user alice logged in");
    assert_eq!(audit::recent(1).unwrap()[0].message, "user alice logged out");

    // A store pushed at runtime replaces the injected one without registering.
    let dir = tempfile::tempdir().unwrap();
    let file = file_store(dir.path());
    let runtime = container.inject_at_runtime(&file, &ModuleSet::new(["audit"]));
    assert_eq!(
        runtime.resolved_site("audit::trail", "STORE").unwrap().resolution,
        Resolution::Runtime
    );
    assert_eq!(audit::record("rotated").unwrap().backend, "file");
    assert_eq!(container.get::<dyn Store>().unwrap().backend(), "memory");

    // Explicit registration at a higher priority wins the next pass.
    container.register_injection_with(file, Priority::Highest);
    container.start_injection(&ModuleSet::new(["audit"]));
    assert_eq!(audit::recent(5).unwrap().len(), 1);

    let clock = container.get::<dyn Clock>().unwrap();
    assert!(clock.now() <= chrono::Utc::now());
}

fn file_store(root: &std::path::Path) -> Instance {
    ProviderType::of::<FileStore>()
        .implements::<dyn Store>(|it| it)
        .instance(FileStore::new(root))
}
