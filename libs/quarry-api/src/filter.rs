use std::any::Any;
use std::sync::{Arc, Weak};

use crate::entity::SourceKind;
use crate::error::CollaboratorError;
use crate::sql::SqlType;
use crate::value::ValueType;

/// A column that filters may constrain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterableColumn {
    /// Dotted property path, the name filters use.
    pub path: String,
    pub column_name: String,
    pub sql_type: SqlType,
    /// `None` when the SQL type has no known in-memory representation.
    pub value_type: Option<ValueType>,
    pub nullable: bool,
}

/// Read-only view of one entity's filterable columns.
///
/// Lifecycle:
/// 1. constructed from entity metadata;
/// 2. `setup()` derives and caches the column set (pure, no I/O);
/// 3. registered and shared, never mutated again.
pub trait FilterSourceAccessor: Send + Sync {
    fn setup(&mut self) -> Result<(), CollaboratorError>;

    fn source_kind(&self) -> &SourceKind;

    fn table_name(&self) -> &str;

    /// Columns in declaration order. Empty before `setup()`.
    fn columns(&self) -> &[FilterableColumn];

    fn column(&self, path: &str) -> Option<&FilterableColumn> {
        self.columns().iter().find(|c| c.path == path)
    }
}

/// Read access to the registry's accessor table.
///
/// Implemented by the registry; filters reach it only through a
/// [`RegistryHandle`].
pub trait FilterSourceLookup: Send + Sync {
    fn filter_source_accessor(&self, kind: &SourceKind) -> Option<Arc<dyn FilterSourceAccessor>>;

    fn filter_source_accessor_by_name(&self, name: &str) -> Option<Arc<dyn FilterSourceAccessor>>;
}

/// Non-owning association from a filter back to its registry.
///
/// Holding a handle never keeps the registry alive; lookups return `None`
/// once the registry is dropped.
#[derive(Clone, Default)]
pub struct RegistryHandle {
    lookup: Option<Weak<dyn FilterSourceLookup>>,
}

impl RegistryHandle {
    pub fn new(lookup: Weak<dyn FilterSourceLookup>) -> Self {
        Self { lookup: Some(lookup) }
    }

    /// A handle attached to nothing. Every lookup returns `None`.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.lookup.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    pub fn filter_source_accessor(&self, kind: &SourceKind) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.lookup.as_ref()?.upgrade()?.filter_source_accessor(kind)
    }

    pub fn filter_source_accessor_by_name(&self, name: &str) -> Option<Arc<dyn FilterSourceAccessor>> {
        self.lookup.as_ref()?.upgrade()?.filter_source_accessor_by_name(name)
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Stateful, cloneable query-fragment builder keyed by kind.
///
/// The registry keeps one prototype per kind:
/// - `attach()` receives the registry handle when the prototype is registered;
/// - `initialize()` is called once, after filter sources were discovered;
/// - `new_filter()` returns a fresh working instance seeded from the prototype.
///   The clone must not share mutable state with the prototype or other clones.
pub trait Filter: Send + Sync + 'static {
    fn kind(&self) -> &str;

    fn attach(&mut self, registry: RegistryHandle);

    fn initialize(&mut self) -> Result<(), CollaboratorError>;

    fn new_filter(&self) -> Box<dyn Filter>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoSources;

    impl FilterSourceLookup for NoSources {
        fn filter_source_accessor(&self, _kind: &SourceKind) -> Option<Arc<dyn FilterSourceAccessor>> {
            None
        }

        fn filter_source_accessor_by_name(&self, _name: &str) -> Option<Arc<dyn FilterSourceAccessor>> {
            None
        }
    }

    #[test]
    fn handle_does_not_keep_registry_alive() {
        let lookup: Arc<dyn FilterSourceLookup> = Arc::new(NoSources);
        let handle = RegistryHandle::new(Arc::downgrade(&lookup));
        assert!(handle.is_attached());

        drop(lookup);
        assert!(!handle.is_attached());
        assert!(handle.filter_source_accessor_by_name("a.B").is_none());
    }

    #[test]
    fn detached_handle_finds_nothing() {
        let handle = RegistryHandle::detached();
        assert!(!handle.is_attached());
        assert!(handle.filter_source_accessor(&SourceKind::new("a.B")).is_none());
    }
}
