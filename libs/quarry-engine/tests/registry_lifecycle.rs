use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use quarry_api::entity::{ColumnDetail, EntityDetail, SourceKind, TypeDiscovery};
use quarry_api::error::CollaboratorError;
use quarry_api::filter::{Filter, RegistryHandle};
use quarry_api::sql::SqlType;
use quarry_engine::accessor::TableFilterSourceAccessor;
use quarry_engine::catalog::{EntityCatalog, TypeCatalog};
use quarry_engine::error::EngineError;
use quarry_engine::registry::{FilterRegistry, RegistryState};

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Captured {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl Captured {
    fn count(&self, level: Level) -> usize {
        self.events.lock().unwrap().iter().filter(|(l, _)| *l == level).count()
    }

    fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

/// Run `f` with a subscriber that records every event.
fn capture<R>(f: impl FnOnce() -> R) -> (R, Captured) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured)
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Type catalog that counts scans and fails on one namespace.
struct ScanCounter {
    catalog: TypeCatalog,
    scans: AtomicUsize,
    broken: Option<&'static str>,
}

impl ScanCounter {
    fn new(broken: Option<&'static str>) -> Self {
        Self {
            catalog: TypeCatalog::new()
                .with("app.model.Customer")
                .with("app.model.Order"),
            scans: AtomicUsize::new(0),
            broken,
        }
    }
}

impl TypeDiscovery for ScanCounter {
    fn discover(&self, namespace: &str) -> Result<Vec<SourceKind>, CollaboratorError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.broken == Some(namespace) {
            return Err(CollaboratorError::discovery("classpath index unreadable"));
        }
        self.catalog.discover(namespace)
    }

    fn resolve(&self, name: &str) -> Option<SourceKind> {
        self.catalog.resolve(name)
    }
}

fn entities() -> EntityCatalog {
    EntityCatalog::new()
        .with(
            EntityDetail::new(SourceKind::new("app.model.Customer"), "customers")
                .column(ColumnDetail::new("id", "id", SqlType::BigInt)),
        )
        .with(
            EntityDetail::new(SourceKind::new("app.model.Order"), "orders")
                .column(ColumnDetail::new("id", "id", SqlType::BigInt))
                .column(ColumnDetail::new("total", "total", SqlType::Decimal)),
        )
}

struct CountingFilter {
    kind: &'static str,
    inits: Arc<AtomicUsize>,
}

impl CountingFilter {
    fn boxed(kind: &'static str) -> (Box<dyn Filter>, Arc<AtomicUsize>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let filter = Box::new(Self {
            kind,
            inits: inits.clone(),
        });
        (filter, inits)
    }
}

impl Filter for CountingFilter {
    fn kind(&self) -> &str {
        self.kind
    }

    fn attach(&mut self, _registry: RegistryHandle) {}

    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn new_filter(&self) -> Box<dyn Filter> {
        Box::new(Self {
            kind: self.kind,
            inits: self.inits.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Filter whose first `initialize()` fails.
struct FailsOnceFilter {
    calls: Arc<AtomicUsize>,
}

impl Filter for FailsOnceFilter {
    fn kind(&self) -> &str {
        "fails_once"
    }

    fn attach(&mut self, _registry: RegistryHandle) {}

    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(CollaboratorError::logic("warming up"));
        }
        Ok(())
    }

    fn new_filter(&self) -> Box<dyn Filter> {
        Box::new(Self {
            calls: self.calls.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn initialize_without_namespaces_warns_once() {
    let discovery = Arc::new(ScanCounter::new(None));
    let mut registry = FilterRegistry::new(discovery.clone(), Arc::new(entities()));
    let (a, a_inits) = CountingFilter::boxed("a");
    let (b, b_inits) = CountingFilter::boxed("b");
    registry.set_filters(vec![a, b]).unwrap();

    let (result, logs) = capture(|| registry.initialize());
    result.unwrap();

    assert_eq!(logs.count(Level::WARN), 1);
    assert_eq!(logs.count(Level::ERROR), 0);
    assert_eq!(a_inits.load(Ordering::SeqCst), 1);
    assert_eq!(b_inits.load(Ordering::SeqCst), 1);
    assert!(registry.source_kinds().is_empty());
    assert_eq!(discovery.scans.load(Ordering::SeqCst), 0);
    assert_eq!(registry.state(), RegistryState::Initialized);
}

#[test]
fn second_initialize_does_not_rescan() {
    let discovery = Arc::new(ScanCounter::new(None));
    let mut registry = FilterRegistry::new(discovery.clone(), Arc::new(entities()));
    registry.set_namespaces(Some(vec!["app.model".into()]));
    let (a, a_inits) = CountingFilter::boxed("a");
    registry.set_filters(vec![a]).unwrap();

    registry.initialize().unwrap();
    let (result, logs) = capture(|| registry.initialize());
    result.unwrap();

    assert_eq!(discovery.scans.load(Ordering::SeqCst), 1);
    assert_eq!(a_inits.load(Ordering::SeqCst), 1);
    assert_eq!(logs.count(Level::WARN), 0);
    assert_eq!(
        registry.source_kinds(),
        [SourceKind::new("app.model.Customer"), SourceKind::new("app.model.Order")]
    );
}

#[test]
fn duplicate_kind_replaces_with_warning() {
    let mut registry = FilterRegistry::new(Arc::new(ScanCounter::new(None)), Arc::new(entities()));
    let (first, first_inits) = CountingFilter::boxed("a");
    let (second, second_inits) = CountingFilter::boxed("a");

    let (result, logs) = capture(|| registry.set_filters(vec![first, second]));
    result.unwrap();
    assert_eq!(logs.count(Level::WARN), 1);
    assert!(logs.messages(Level::WARN)[0].contains("registered twice"));

    registry.initialize().unwrap();
    assert_eq!(registry.filter_kinds(), ["a"]);
    assert_eq!(first_inits.load(Ordering::SeqCst), 0);
    assert_eq!(second_inits.load(Ordering::SeqCst), 1);
}

#[test]
fn discovery_failure_aborts_without_rollback() {
    let discovery = Arc::new(ScanCounter::new(Some("app.broken")));
    let mut registry = FilterRegistry::new(discovery, Arc::new(entities()));
    registry.set_namespaces(Some(vec!["app.model".into(), "app.broken".into()]));
    let (a, a_inits) = CountingFilter::boxed("a");
    registry.set_filters(vec![a]).unwrap();

    let (result, logs) = capture(|| registry.initialize());
    let err = result.unwrap_err();

    match &err {
        EngineError::Discovery { namespace, source } => {
            assert_eq!(namespace, "app.broken");
            assert_eq!(source.message, "classpath index unreadable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("'app.broken'"));
    assert_eq!(logs.count(Level::ERROR), 1);

    // Sources from the first namespace stay registered; filters never ran.
    assert_eq!(registry.source_kinds().len(), 2);
    assert_eq!(a_inits.load(Ordering::SeqCst), 0);
    assert_eq!(registry.state(), RegistryState::Configured);
}

#[test]
fn missing_metadata_aborts_with_the_namespace() {
    let mut registry = FilterRegistry::new(Arc::new(ScanCounter::new(None)), Arc::new(EntityCatalog::new()));
    registry.set_namespaces(Some(vec!["app.model".into()]));

    let err = registry.initialize().unwrap_err();
    match err {
        EngineError::Discovery { namespace, source } => {
            assert_eq!(namespace, "app.model");
            assert!(source.message.starts_with("app.model.Customer: no entity metadata"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_lookups() {
    let registry = FilterRegistry::new(Arc::new(ScanCounter::new(None)), Arc::new(entities()));

    assert!(registry.find_filter("unregistered").is_none());
    assert!(matches!(
        registry.new_filter("unregistered"),
        Err(EngineError::UnknownFilterKind(_))
    ));

    let detail = EntityDetail::new(SourceKind::new("not.a.real.Type"), "ghosts");
    let err = registry
        .add_filter_source_accessor("not.a.real.Type", Arc::new(TableFilterSourceAccessor::new(detail)))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to find type 'not.a.real.Type' when caching filter sources"
    );
    assert!(registry.source_kinds().is_empty());
}

#[test]
fn handle_outlives_registry_safely() {
    let registry = FilterRegistry::new(Arc::new(ScanCounter::new(None)), Arc::new(entities()));
    let handle = registry.handle();
    assert!(handle.is_attached());

    drop(registry);
    assert!(!handle.is_attached());
    assert!(handle.filter_source_accessor_by_name("app.model.Customer").is_none());
}

#[test]
fn retry_after_filter_failure_initializes_each_prototype_once() {
    let discovery = Arc::new(ScanCounter::new(None));
    let mut registry = FilterRegistry::new(discovery.clone(), Arc::new(entities()));
    registry.set_namespaces(Some(vec!["app.model".into()]));
    let (a, a_inits) = CountingFilter::boxed("a");
    let b_calls = Arc::new(AtomicUsize::new(0));
    let b: Box<dyn Filter> = Box::new(FailsOnceFilter { calls: b_calls.clone() });
    registry.set_filters(vec![a, b]).unwrap();

    let err = registry.initialize().unwrap_err();
    assert!(matches!(err, EngineError::FilterInit { ref kind, .. } if kind == "fails_once"));
    assert_eq!(registry.state(), RegistryState::Configured);

    registry.initialize().unwrap();
    assert_eq!(registry.state(), RegistryState::Initialized);
    assert_eq!(a_inits.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 2);
    assert_eq!(discovery.scans.load(Ordering::SeqCst), 1);
}
