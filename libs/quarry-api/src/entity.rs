use std::fmt;
use std::sync::Arc;

use crate::error::CollaboratorError;
use crate::sql::SqlType;

/// Type token of a filter source: the fully-qualified name of a mapped
/// entity (`"app.model.Customer"`).
///
/// Cheap to clone; used as the key of the accessor mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKind(Arc<str>);

impl SourceKind {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Fully-qualified name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Namespace the kind belongs to: everything before the last `.`.
    /// Empty for unqualified names.
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }

    /// Unqualified name: everything after the last `.`.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, n)| n).unwrap_or(&self.0)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One mapped column of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDetail {
    /// Dotted property path (`"address.city"` for embedded properties).
    pub binding_path: String,
    pub column_name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Not persisted, never filterable.
    pub transient: bool,
}

impl ColumnDetail {
    pub fn new(binding_path: impl Into<String>, column_name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            binding_path: binding_path.into(),
            column_name: column_name.into(),
            sql_type,
            nullable: true,
            transient: false,
        }
    }

    /// Column whose type is given as declared text, e.g. `"VARCHAR(64)"`.
    pub fn declared(binding_path: impl Into<String>, column_name: impl Into<String>, declared: &str) -> Self {
        Self::new(binding_path, column_name, SqlType::from_declared(declared))
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

/// Metadata of one mapped entity. Read-only input for accessor construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDetail {
    pub kind: SourceKind,
    pub table_name: String,
    pub columns: Vec<ColumnDetail>,
}

impl EntityDetail {
    pub fn new(kind: SourceKind, table_name: impl Into<String>) -> Self {
        Self {
            kind,
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDetail) -> Self {
        self.columns.push(column);
        self
    }
}

/// Entity metadata collaborator.
pub trait EntityMetadataProvider: Send + Sync {
    fn entity_detail(&self, kind: &SourceKind) -> Result<EntityDetail, CollaboratorError>;
}

/// Type discovery collaborator.
///
/// - `discover()`: every filter-source kind registered within a namespace
///   (including nested namespaces).
/// - `resolve()`: fully-qualified name → kind, `None` if unknown.
pub trait TypeDiscovery: Send + Sync {
    fn discover(&self, namespace: &str) -> Result<Vec<SourceKind>, CollaboratorError>;
    fn resolve(&self, name: &str) -> Option<SourceKind>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_splits_namespace() {
        let kind = SourceKind::new("app.model.Customer");
        assert_eq!(kind.namespace(), "app.model");
        assert_eq!(kind.simple_name(), "Customer");

        let bare = SourceKind::new("Customer");
        assert_eq!(bare.namespace(), "");
        assert_eq!(bare.simple_name(), "Customer");
    }

    #[test]
    fn declared_column_types_ignore_precision() {
        let price = ColumnDetail::declared("price", "unit_price", "NUMERIC(12, 2)");
        assert_eq!(price.sql_type, SqlType::Numeric);
        assert!(price.nullable);

        let shape = ColumnDetail::declared("shape", "shape", "geometry");
        assert_eq!(shape.sql_type, SqlType::Other);
    }
}
