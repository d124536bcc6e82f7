use crate::sql::SqlType;

/// Declared metadata of the column behind a bind position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetaData {
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Column name (used in logs and error messages).
    pub name: Option<String>,
}

impl ColumnMetaData {
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            nullable: true,
            name: None,
        }
    }
}

/// One bindable value slot of a query or DML statement.
///
/// Implemented by the statement layer; the conversion engine only reads
/// the declared column type and the binding path for diagnostics.
pub trait ParameterBinder {
    /// Dotted path of the bound property (`"address.city"`), if known.
    fn binding_path(&self) -> Option<&str>;

    fn column(&self) -> &ColumnMetaData;
}

/// Plain-data [`ParameterBinder`].
///
/// Owned transiently by the caller of a conversion, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    pub binding_path: Option<String>,
    pub column: ColumnMetaData,
}

impl ParameterBinding {
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            binding_path: None,
            column: ColumnMetaData::new(sql_type),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.binding_path = Some(path.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.column.nullable = false;
        self
    }

    pub fn with_column_name(mut self, name: impl Into<String>) -> Self {
        self.column.name = Some(name.into());
        self
    }
}

impl ParameterBinder for ParameterBinding {
    fn binding_path(&self) -> Option<&str> {
        self.binding_path.as_deref()
    }

    fn column(&self) -> &ColumnMetaData {
        &self.column
    }
}
