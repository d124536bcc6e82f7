use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use quarry_api::entity::{EntityMetadataProvider, SourceKind, TypeDiscovery};
use quarry_api::error::CollaboratorError;
use quarry_api::filter::{Filter, FilterSourceAccessor, FilterSourceLookup, RegistryHandle};

use crate::accessor::TableFilterSourceAccessor;
use crate::error::EngineError;

/// Lifecycle of a [`FilterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Constructed, no prototypes yet.
    Uninitialized,
    /// Prototypes set, sources not scanned.
    Configured,
    /// Sources scanned and prototypes initialized. Read-only from here on.
    Initialized,
}

/// Accessor table shared with filters through [`RegistryHandle`].
#[derive(Default)]
struct SourceTable {
    accessors: RwLock<HashMap<SourceKind, Arc<dyn FilterSourceAccessor>>>,
}

impl SourceTable {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<SourceKind, Arc<dyn FilterSourceAccessor>>> {
        match self.accessors.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("filter source table read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SourceKind, Arc<dyn FilterSourceAccessor>>> {
        match self.accessors.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("filter source table write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl FilterSourceLookup for SourceTable {
    fn filter_source_accessor(&self, kind: &SourceKind) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.read().get(kind).cloned()
    }

    fn filter_source_accessor_by_name(&self, name: &str) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.read().get(&SourceKind::new(name)).cloned()
    }
}

/// One registered prototype.
struct Prototype {
    kind: String,
    filter: Box<dyn Filter>,
    /// Set once `initialize()` succeeded; a retried registry initialization
    /// skips it.
    initialized: bool,
}

/// Registry of filter prototypes and filter-source accessors.
///
/// - Configuration phase (`&mut self`): `set_namespaces()`, `set_filters()`,
///   `initialize()`. Expected to run to completion before any lookup.
/// - Lookup phase (`&self`): `find_filter()`, `new_filter()`,
///   `filter_source_accessor()`. Safe to share across threads.
pub struct FilterRegistry {
    /// Prototypes in insertion order, keyed by their own kind.
    filters: Vec<Prototype>,
    sources: Arc<SourceTable>,
    /// Every namespace was scanned successfully.
    scanned: bool,
    namespaces: Option<Vec<String>>,
    discovery: Arc<dyn TypeDiscovery>,
    metadata: Arc<dyn EntityMetadataProvider>,
    state: RegistryState,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("state", &self.state)
            .field("namespaces", &self.namespaces)
            .field("filters", &self.filter_kinds())
            .field("sources", &self.source_kinds())
            .finish()
    }
}

impl FilterRegistry {
    pub fn new(discovery: Arc<dyn TypeDiscovery>, metadata: Arc<dyn EntityMetadataProvider>) -> Self {
        Self {
            filters: Vec::new(),
            sources: Arc::new(SourceTable::default()),
            scanned: false,
            namespaces: None,
            discovery,
            metadata,
            state: RegistryState::Uninitialized,
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn namespaces(&self) -> Option<&[String]> {
        self.namespaces.as_deref()
    }

    /// Namespaces scanned by `initialize()`. `None` disables discovery.
    pub fn set_namespaces(&mut self, namespaces: Option<Vec<String>>) {
        self.namespaces = namespaces;
    }

    /// Non-owning handle to this registry's source table.
    pub fn handle(&self) -> RegistryHandle {
        let weak: Weak<SourceTable> = Arc::downgrade(&self.sources);
        RegistryHandle::new(weak)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Replace the prototype mapping.
    ///
    /// - Empty list: no-op, the previous mapping is kept.
    /// - Otherwise every filter is attached to this registry and stored under
    ///   its own kind. A later prototype of an existing kind replaces the
    ///   earlier one (keeping its position) and logs a warning.
    pub fn set_filters(&mut self, filters: Vec<Box<dyn Filter>>) -> Result<(), EngineError> {
        if self.state == RegistryState::Initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        if filters.is_empty() {
            tracing::debug!("empty filter list, keeping current prototypes");
            return Ok(());
        }

        let mut entries: Vec<Prototype> = Vec::with_capacity(filters.len());
        for mut filter in filters {
            filter.attach(self.handle());
            let kind = filter.kind().to_string();
            if let Some(entry) = entries.iter_mut().find(|p| p.kind == kind) {
                tracing::warn!(kind = %kind, "filter kind registered twice, replacing earlier prototype");
                entry.filter = filter;
            } else {
                entries.push(Prototype {
                    kind,
                    filter,
                    initialized: false,
                });
            }
        }

        self.filters = entries;
        self.state = RegistryState::Configured;
        Ok(())
    }

    /// Scan namespaces for filter sources, then initialize every prototype.
    ///
    /// 1. No namespaces → one warning, discovery skipped.
    /// 2. Per namespace: discover → entity metadata → accessor → `setup()` →
    ///    register. The first failure aborts; accessors registered before it
    ///    stay in place.
    /// 3. `initialize()` on every prototype, in insertion order. The first
    ///    failure aborts.
    ///
    /// Runs once: calling it on an initialized registry does nothing. After a
    /// failure it may be called again; a completed scan is not repeated and
    /// prototypes that already initialized are skipped.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.state == RegistryState::Initialized {
            tracing::debug!("filter registry already initialized, skipping scan");
            return Ok(());
        }

        if !self.scanned {
            match self.namespaces.clone() {
                Some(namespaces) if !namespaces.is_empty() => {
                    for namespace in &namespaces {
                        self.process_namespace(namespace)?;
                    }
                }
                _ => {
                    tracing::warn!("no namespaces configured, skipping filter source discovery");
                }
            }
            self.scanned = true;
        }

        for prototype in self.filters.iter_mut().filter(|p| !p.initialized) {
            let kind = &prototype.kind;
            prototype.filter.initialize().map_err(|source| {
                tracing::error!(kind = %kind, error = %source, "filter initialization failed");
                EngineError::FilterInit {
                    kind: kind.clone(),
                    source,
                }
            })?;
            prototype.initialized = true;
        }

        self.state = RegistryState::Initialized;
        tracing::info!(
            filters = self.filters.len(),
            sources = self.sources.read().len(),
            "filter registry initialized"
        );
        Ok(())
    }

    fn process_namespace(&self, namespace: &str) -> Result<(), EngineError> {
        let fail = |source: CollaboratorError| {
            tracing::error!(namespace, error = %source, "filter source discovery failed");
            EngineError::Discovery {
                namespace: namespace.to_string(),
                source,
            }
        };

        let kinds = self.discovery.discover(namespace).map_err(fail)?;
        tracing::debug!(namespace, count = kinds.len(), "discovered filter sources");

        for kind in kinds {
            let detail = self
                .metadata
                .entity_detail(&kind)
                .map_err(|e| fail(e.with_context(&kind)))?;

            let mut accessor = TableFilterSourceAccessor::new(detail);
            accessor.setup().map_err(|source| {
                tracing::error!(kind = %kind, error = %source, "filter source setup failed");
                EngineError::SourceSetup {
                    kind: kind.to_string(),
                    source,
                }
            })?;

            self.add_filter_source_accessor(kind.name(), Arc::new(accessor))?;
        }
        Ok(())
    }

    /// Register an accessor under the kind `type_name` resolves to.
    ///
    /// Fails with [`EngineError::TypeNotFound`] when the name is unknown to
    /// the discovery collaborator; the mapping is left unchanged.
    pub fn add_filter_source_accessor(
        &self,
        type_name: &str,
        accessor: Arc<dyn FilterSourceAccessor>,
    ) -> Result<(), EngineError> {
        let kind = self
            .discovery
            .resolve(type_name)
            .ok_or_else(|| EngineError::TypeNotFound(type_name.to_string()))?;

        tracing::info!(kind = %kind, table = accessor.table_name(), "registered filter source");
        if self.sources.write().insert(kind, accessor).is_some() {
            tracing::debug!(type_name, "replaced filter source accessor");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Registered prototype of `kind`, if any.
    pub fn find_filter(&self, kind: &str) -> Option<&dyn Filter> {
        self.filters
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.filter.as_ref())
    }

    /// Registered prototype of `kind` as its concrete type.
    pub fn find_filter_as<T: Filter>(&self, kind: &str) -> Option<&T> {
        self.find_filter(kind)?.as_any().downcast_ref::<T>()
    }

    /// Fresh working instance cloned from the prototype of `kind`.
    pub fn new_filter(&self, kind: &str) -> Result<Box<dyn Filter>, EngineError> {
        self.find_filter(kind)
            .map(|prototype| prototype.new_filter())
            .ok_or_else(|| EngineError::UnknownFilterKind(kind.to_string()))
    }

    /// Like [`new_filter`](Self::new_filter), downcast to the concrete type.
    pub fn new_filter_as<T: Filter>(&self, kind: &str) -> Result<Box<T>, EngineError> {
        self.new_filter(kind)?
            .into_any()
            .downcast::<T>()
            .map_err(|_| EngineError::FilterTypeMismatch {
                kind: kind.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Prototypes in insertion order.
    pub fn filters(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|p| p.filter.as_ref())
    }

    pub fn filter_kinds(&self) -> Vec<&str> {
        self.filters.iter().map(|p| p.kind.as_str()).collect()
    }

    pub fn filter_source_accessor(&self, kind: &SourceKind) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.sources.filter_source_accessor(kind)
    }

    pub fn filter_source_accessor_by_name(&self, name: &str) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.sources.filter_source_accessor_by_name(name)
    }

    /// Registered source kinds, sorted by name.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.sources.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
