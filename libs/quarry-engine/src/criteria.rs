use std::any::Any;
use std::sync::Arc;

use quarry_api::error::CollaboratorError;
use quarry_api::filter::{Filter, FilterSourceAccessor, RegistryHandle};
use quarry_api::value::{Value, ValueType};

use crate::conversion::ConversionEngine;
use crate::error::EngineError;

/// Comparison operator of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    IsNull,
    IsNotNull,
    In,
}

impl CriteriaOp {
    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::In => "IN",
        }
    }
}

/// Bind values collected while rendering, in placeholder order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlParams {
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct Criterion {
    column: String,
    op: CriteriaOp,
    values: Vec<Value>,
}

/// Conjunction of column criteria over one filter source.
///
/// The prototype resolves its accessor in `initialize()`; working instances
/// from `new_filter()` share it and start with no criteria. Values are
/// converted to the column's type when the criterion is added, so rendering
/// never fails.
pub struct CriteriaFilter {
    kind: String,
    source: String,
    conversion: Arc<ConversionEngine>,
    registry: RegistryHandle,
    accessor: Option<Arc<dyn FilterSourceAccessor>>,
    criteria: Vec<Criterion>,
}

impl std::fmt::Debug for CriteriaFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaFilter")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("resolved", &self.accessor.is_some())
            .field("criteria", &self.criteria)
            .finish()
    }
}

impl CriteriaFilter {
    pub fn new(kind: impl Into<String>, source: impl Into<String>, conversion: Arc<ConversionEngine>) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            conversion,
            registry: RegistryHandle::detached(),
            accessor: None,
            criteria: Vec::new(),
        }
    }

    /// Fully-qualified name of the filter source.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn accessor(&self) -> Option<&Arc<dyn FilterSourceAccessor>> {
        self.accessor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    // -----------------------------------------------------------------------
    // Criteria
    // -----------------------------------------------------------------------

    pub fn eq(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Eq, value.into())
    }

    pub fn ne(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Ne, value.into())
    }

    pub fn gt(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Gt, value.into())
    }

    pub fn ge(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Ge, value.into())
    }

    pub fn lt(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Lt, value.into())
    }

    pub fn le(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, EngineError> {
        self.compare(path, CriteriaOp::Le, value.into())
    }

    /// Pattern match. The pattern is always bound as text.
    pub fn like(&mut self, path: &str, pattern: impl Into<Value>) -> Result<&mut Self, EngineError> {
        let pattern = pattern.into();
        let column = self.column_name(path)?;
        let pattern = self.checked(path, &pattern, Some(&ValueType::String))?;
        self.criteria.push(Criterion {
            column,
            op: CriteriaOp::Like,
            values: vec![pattern],
        });
        Ok(self)
    }

    pub fn is_null(&mut self, path: &str) -> Result<&mut Self, EngineError> {
        self.unary(path, CriteriaOp::IsNull)
    }

    pub fn is_not_null(&mut self, path: &str) -> Result<&mut Self, EngineError> {
        self.unary(path, CriteriaOp::IsNotNull)
    }

    pub fn in_list<I, V>(&mut self, path: &str, values: I) -> Result<&mut Self, EngineError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = self.column_name(path)?;
        let target = self.target(path)?;
        let values = values
            .into_iter()
            .map(|v| self.checked(path, &v.into(), target.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(logic(format!("empty IN list for '{path}'")));
        }
        self.criteria.push(Criterion {
            column,
            op: CriteriaOp::In,
            values,
        });
        Ok(self)
    }

    /// Render the criteria as a `WHERE` fragment with `?` placeholders,
    /// appending bind values to `params`. Empty when there are no criteria.
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        self.criteria
            .iter()
            .map(|c| match c.op {
                CriteriaOp::IsNull | CriteriaOp::IsNotNull => format!("{} {}", c.column, c.op.sql()),
                CriteriaOp::In => {
                    let marks = vec!["?"; c.values.len()].join(", ");
                    params.values.extend(c.values.iter().cloned());
                    format!("{} IN ({marks})", c.column)
                }
                op => {
                    params.values.extend(c.values.iter().cloned());
                    format!("{} {} ?", c.column, op.sql())
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn compare(&mut self, path: &str, op: CriteriaOp, value: Value) -> Result<&mut Self, EngineError> {
        let column = self.column_name(path)?;
        let target = self.target(path)?;
        let value = self.checked(path, &value, target.as_ref())?;
        self.criteria.push(Criterion {
            column,
            op,
            values: vec![value],
        });
        Ok(self)
    }

    fn unary(&mut self, path: &str, op: CriteriaOp) -> Result<&mut Self, EngineError> {
        let column = self.column_name(path)?;
        self.criteria.push(Criterion {
            column,
            op,
            values: Vec::new(),
        });
        Ok(self)
    }

    fn accessor_ref(&self) -> Result<&Arc<dyn FilterSourceAccessor>, EngineError> {
        self.accessor
            .as_ref()
            .ok_or_else(|| logic(format!("filter '{}' is not initialized", self.kind)))
    }

    fn column_name(&self, path: &str) -> Result<String, EngineError> {
        let accessor = self.accessor_ref()?;
        accessor
            .column(path)
            .map(|c| c.column_name.clone())
            .ok_or_else(|| logic(format!("unknown path '{path}' on '{}'", self.source)))
    }

    fn target(&self, path: &str) -> Result<Option<ValueType>, EngineError> {
        let accessor = self.accessor_ref()?;
        Ok(accessor.column(path).and_then(|c| c.value_type.clone()))
    }

    /// Convert `value` for binding at `path`. Nulls are rejected; columns
    /// with no in-memory type bind the value unchanged.
    fn checked(&self, path: &str, value: &Value, target: Option<&ValueType>) -> Result<Value, EngineError> {
        if value.is_null() {
            return Err(logic(format!(
                "null value for '{path}', use is_null() / is_not_null()"
            )));
        }
        match target {
            Some(target) => Ok(self.conversion.convert_with_path(None, value, path, target)?),
            None => Ok(value.clone()),
        }
    }
}

fn logic(message: String) -> EngineError {
    EngineError::Collaborator(CollaboratorError::logic(message))
}

impl Filter for CriteriaFilter {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn attach(&mut self, registry: RegistryHandle) {
        self.registry = registry;
    }

    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        if !self.registry.is_attached() {
            return Err(CollaboratorError::logic(format!(
                "filter '{}' is not attached to a registry",
                self.kind
            )));
        }
        let accessor = self
            .registry
            .filter_source_accessor_by_name(&self.source)
            .ok_or_else(|| CollaboratorError::config(format!("unknown filter source '{}'", self.source)))?;

        tracing::debug!(
            kind = %self.kind,
            source = %self.source,
            table = accessor.table_name(),
            "criteria filter resolved its source"
        );
        self.accessor = Some(accessor);
        Ok(())
    }

    fn new_filter(&self) -> Box<dyn Filter> {
        Box::new(Self {
            kind: self.kind.clone(),
            source: self.source.clone(),
            conversion: self.conversion.clone(),
            registry: self.registry.clone(),
            accessor: self.accessor.clone(),
            criteria: Vec::new(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
