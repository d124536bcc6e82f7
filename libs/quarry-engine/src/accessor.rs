use std::collections::HashSet;

use quarry_api::entity::{EntityDetail, SourceKind};
use quarry_api::error::CollaboratorError;
use quarry_api::filter::{FilterSourceAccessor, FilterableColumn};

/// Filter source backed by one mapped table.
///
/// Built from an [`EntityDetail`] snapshot; `setup()` projects the
/// persistent columns into [`FilterableColumn`]s.
#[derive(Debug, Clone)]
pub struct TableFilterSourceAccessor {
    detail: EntityDetail,
    columns: Vec<FilterableColumn>,
}

impl TableFilterSourceAccessor {
    pub fn new(detail: EntityDetail) -> Self {
        Self {
            detail,
            columns: Vec::new(),
        }
    }

    pub fn entity_detail(&self) -> &EntityDetail {
        &self.detail
    }
}

impl FilterSourceAccessor for TableFilterSourceAccessor {
    /// Transient columns are skipped. Fails on empty or duplicate paths.
    fn setup(&mut self) -> Result<(), CollaboratorError> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(self.detail.columns.len());

        for column in self.detail.columns.iter().filter(|c| !c.transient) {
            if column.binding_path.is_empty() {
                return Err(CollaboratorError::metadata(format!(
                    "column '{}' has an empty binding path",
                    column.column_name
                )));
            }
            if !seen.insert(column.binding_path.as_str()) {
                return Err(CollaboratorError::metadata(format!(
                    "duplicate binding path '{}'",
                    column.binding_path
                )));
            }
            columns.push(FilterableColumn {
                path: column.binding_path.clone(),
                column_name: column.column_name.clone(),
                sql_type: column.sql_type,
                value_type: column.sql_type.value_type(),
                nullable: column.nullable,
            });
        }

        self.columns = columns;
        Ok(())
    }

    fn source_kind(&self) -> &SourceKind {
        &self.detail.kind
    }

    fn table_name(&self) -> &str {
        &self.detail.table_name
    }

    fn columns(&self) -> &[FilterableColumn] {
        &self.columns
    }
}
