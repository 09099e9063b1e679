use std::cell::Cell;
use std::rc::Rc;

use ado_core::Result;
use ado_core::config::AdoSettings;
use ado_core::error::VcsError;
use ado_core::host::HostClient;
use ado_core::host::memory::MemoryHost;
use ado_core::service::{Connector, ServiceConfig, ServiceRegistry};

#[derive(Debug)]
struct CountingConnector {
    host: Rc<MemoryHost>,
    connects: Rc<Cell<usize>>,
}

impl Connector for CountingConnector {
    fn connect(&self, _service: &ServiceConfig) -> Result<Rc<dyn HostClient>> {
        self.connects.set(self.connects.get() + 1);
        let client: Rc<dyn HostClient> = self.host.clone();
        Ok(client)
    }
}

fn registry(capacity: usize) -> (ServiceRegistry, Rc<MemoryHost>, Rc<Cell<usize>>) {
    let host = Rc::new(MemoryHost::new());
    host.add_repository("proj", "repo", "main");
    host.add_repository("proj", "other", "main");
    let connects = Rc::new(Cell::new(0));
    let registry = ServiceRegistry::with_cache_capacity(
        vec![
            ServiceConfig::new("main", "https://dev.azure.com/org").with_token("secret"),
            ServiceConfig::new("legacy", "https://legacy.visualstudio.com/"),
        ],
        Box::new(CountingConnector {
            host: host.clone(),
            connects: connects.clone(),
        }),
        AdoSettings::default(),
        capacity,
    )
    .unwrap();
    (registry, host, connects)
}

#[test]
fn service_lookup_by_host_and_owner() {
    let (registry, _, _) = registry(4);

    let found = registry
        .get_service_for_url("ctx", "https://dev.azure.com/org/proj/_git/repo")
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "main");

    let missing = registry
        .get_service_for_url("ctx", "https://dev.azure.com/elsewhere/proj/_git/repo")
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn unknown_url_is_a_resolution_error() {
    let (registry, _, connects) = registry(4);

    let err = registry
        .get_repository("ctx", "https://dev.azure.com/elsewhere/proj/_git/repo")
        .unwrap_err();

    assert!(matches!(err, VcsError::Resolution(ref m) if m.starts_with("Could not find a service for URL")));
    assert_eq!(connects.get(), 0);
}

#[test]
fn duplicate_services_are_rejected() {
    let host = Rc::new(MemoryHost::new());
    let result = ServiceRegistry::new(
        vec![
            ServiceConfig::new("one", "https://dev.azure.com/org"),
            ServiceConfig::new("two", "https://dev.azure.com/org/"),
        ],
        Box::new(CountingConnector {
            host,
            connects: Rc::new(Cell::new(0)),
        }),
        AdoSettings::default(),
    );

    let err = result.unwrap_err();
    assert!(matches!(err, VcsError::Validation(ref m) if m.starts_with("Duplicate service URL")));
}

#[test]
fn repositories_are_cached_per_context() {
    let (registry, host, connects) = registry(4);
    let url = "https://dev.azure.com/org/proj/_git/repo";

    let first = registry.get_repository("ctx", url).unwrap();
    let again = registry.get_repository("ctx", url).unwrap();
    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(host.calls("get_repository"), 1);

    let other_context = registry.get_repository("other", url).unwrap();
    assert!(!Rc::ptr_eq(&first, &other_context));
    assert_eq!(host.calls("get_repository"), 2);

    // One connection per service regardless of repository lookups.
    registry
        .get_repository("ctx", "https://dev.azure.com/org/proj/_git/other")
        .unwrap();
    assert_eq!(connects.get(), 1);
    assert_eq!(registry.repository_cache().len(), 3);
}

#[test]
fn repository_cache_is_bounded() {
    let (registry, host, _) = registry(1);
    let repo_url = "https://dev.azure.com/org/proj/_git/repo";
    let other_url = "https://dev.azure.com/org/proj/_git/other";

    registry.get_repository("ctx", repo_url).unwrap();
    registry.get_repository("ctx", other_url).unwrap();
    registry.get_repository("ctx", repo_url).unwrap();

    assert_eq!(registry.repository_cache().capacity(), 1);
    assert_eq!(registry.repository_cache().len(), 1);
    assert_eq!(host.calls("get_repository"), 3);
}

#[test]
fn token_is_never_serialized() {
    let service = ServiceConfig::new("main", "https://dev.azure.com/org").with_token("secret");
    let json = serde_json::to_string(&service).unwrap();
    assert!(!json.contains("secret"));
}
