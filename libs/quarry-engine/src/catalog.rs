//! Explicit registration tables for the discovery and metadata collaborators.
//!
//! Filter-source kinds are registered up front, at configuration time; the
//! registry never resolves types by reflection.

use std::collections::{BTreeMap, HashMap};

use quarry_api::entity::{EntityDetail, EntityMetadataProvider, SourceKind, TypeDiscovery};
use quarry_api::error::CollaboratorError;

/// Registered filter-source kinds, by fully-qualified name.
#[derive(Debug, Default, Clone)]
pub struct TypeCatalog {
    // Ordered so that discovery is deterministic.
    kinds: BTreeMap<String, SourceKind>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. Registering the same name twice is a no-op.
    pub fn register(&mut self, name: impl AsRef<str>) -> SourceKind {
        let name = name.as_ref();
        self.kinds
            .entry(name.to_string())
            .or_insert_with(|| SourceKind::new(name))
            .clone()
    }

    pub fn with(mut self, name: impl AsRef<str>) -> Self {
        self.register(name);
        self
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl TypeDiscovery for TypeCatalog {
    /// Kinds whose namespace is `namespace` or nested below it.
    fn discover(&self, namespace: &str) -> Result<Vec<SourceKind>, CollaboratorError> {
        let namespace = namespace.trim().trim_end_matches('.');
        if namespace.is_empty() {
            return Err(CollaboratorError::discovery("namespace is empty"));
        }
        let prefix = format!("{namespace}.");
        Ok(self
            .kinds
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .map(|(_, kind)| kind.clone())
            .collect())
    }

    fn resolve(&self, name: &str) -> Option<SourceKind> {
        self.kinds.get(name).cloned()
    }
}

/// In-memory entity metadata, keyed by kind.
#[derive(Debug, Default, Clone)]
pub struct EntityCatalog {
    entities: HashMap<SourceKind, EntityDetail>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the metadata of `detail.kind`.
    pub fn insert(&mut self, detail: EntityDetail) {
        self.entities.insert(detail.kind.clone(), detail);
    }

    pub fn with(mut self, detail: EntityDetail) -> Self {
        self.insert(detail);
        self
    }
}

impl EntityMetadataProvider for EntityCatalog {
    fn entity_detail(&self, kind: &SourceKind) -> Result<EntityDetail, CollaboratorError> {
        self.entities
            .get(kind)
            .cloned()
            .ok_or_else(|| CollaboratorError::metadata(format!("no entity metadata for '{kind}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with("app.model.Customer")
            .with("app.model.Order")
            .with("app.model.billing.Invoice")
            .with("app.modelx.Stray")
            .with("other.Thing")
    }

    #[test]
    fn discover_includes_nested_namespaces_only() {
        let names: Vec<_> = catalog()
            .discover("app.model")
            .unwrap()
            .into_iter()
            .map(|k| k.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["app.model.Customer", "app.model.Order", "app.model.billing.Invoice"]
        );
    }

    #[test]
    fn discover_unknown_namespace_is_empty() {
        assert!(catalog().discover("nowhere").unwrap().is_empty());
        assert!(catalog().discover("  ").is_err());
    }

    #[test]
    fn resolve_requires_exact_name() {
        let c = catalog();
        assert_eq!(c.resolve("other.Thing").unwrap().simple_name(), "Thing");
        assert!(c.resolve("other").is_none());
        assert!(c.resolve("not.a.real.Type").is_none());
    }

    #[test]
    fn register_is_idempotent() {
        let mut c = TypeCatalog::new();
        let a = c.register("a.B");
        let b = c.register("a.B");
        assert_eq!(a, b);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let entities = EntityCatalog::new();
        let err = entities.entity_detail(&SourceKind::new("a.B")).unwrap_err();
        assert_eq!(err.message, "no entity metadata for 'a.B'");
    }
}
