//! Registration through `#[provides]` and `#[inject]`, discovered via inventory.

use injectkit::{Container, InventoryDiscovery, ModuleSet, Priority, Resolution, TypeDiscovery};

// ---------- Test modules (must be at module scope for `inventory`) ----------

mod greeting {
    use injectkit::{inject, provides, Inject, ProvideError};

    pub trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Default)]
    #[provides(implements = [dyn Greeter])]
    pub struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[provides(priority = High, implements = [dyn Greeter], ctor = French::new("bonjour"))]
    pub struct French {
        word: &'static str,
    }

    impl French {
        fn new(word: &'static str) -> Self {
            Self { word }
        }
    }

    impl Greeter for French {
        fn greet(&self) -> String {
            self.word.to_string()
        }
    }

    #[provides(priority = Highest, implements = [dyn Greeter], fallible, ctor = Klingon::summon())]
    pub struct Klingon;

    impl Klingon {
        fn summon() -> Result<Self, ProvideError> {
            Err(ProvideError::quietly_unprovidable("no translator on board"))
        }
    }

    impl Greeter for Klingon {
        fn greet(&self) -> String {
            "nuqneH".into()
        }
    }

    #[inject]
    pub static GREETER: Inject<dyn Greeter> = Inject::new();

    #[inject]
    pub static ENGLISH: Inject<English> = Inject::new();
}

mod orphan {
    use injectkit::{inject, Inject};

    pub struct Unprovided;

    #[inject]
    pub static MISSING: Inject<Unprovided> = Inject::new();
}

#[test]
fn inventory_discovery_sees_macro_registrations() {
    let set = ModuleSet::new(["macro_tests::greeting"]);
    let providers: Vec<_> = InventoryDiscovery
        .providers_in(&set)
        .into_iter()
        .map(|p| p.expect("linked provider"))
        .collect();

    let names: Vec<_> = providers.iter().map(|p| p.type_name()).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&std::any::type_name::<greeting::French>()));

    let french = providers
        .iter()
        .find(|p| p.type_name() == std::any::type_name::<greeting::French>())
        .unwrap();
    assert_eq!(french.priority(), Priority::High);
    assert_eq!(french.module(), "macro_tests::greeting");

    let sites = InventoryDiscovery.injection_sites_in(&set);
    assert_eq!(sites.len(), 2);
    assert!(InventoryDiscovery
        .injection_sites_in(&ModuleSet::new(["macro_tests::nowhere"]))
        .is_empty());
}

#[test]
fn macro_registered_providers_are_injected() {
    let container = Container::new();
    let report = container.start_injection(&ModuleSet::new(["macro_tests::greeting"]));

    assert!(report.is_complete(), "unresolved: {:?}", report.unresolved);
    assert_eq!(report.load.unprovidable(), 1);
    assert_eq!(greeting::GREETER.get().unwrap().greet(), "bonjour");
    assert!(greeting::ENGLISH.is_resolved());
    assert_eq!(
        report
            .resolved_site("macro_tests::greeting", "GREETER")
            .unwrap()
            .resolution,
        Resolution::BestMatch
    );

    let orphan_report = container.start_injection(&ModuleSet::new(["macro_tests::orphan"]));
    assert_eq!(orphan_report.unresolved.len(), 1);
    assert!(!orphan::MISSING.is_resolved());
}
