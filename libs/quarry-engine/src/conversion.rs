use std::sync::Arc;

use quarry_api::binding::ParameterBinder;
use quarry_api::converter::ConversionBackend;
use quarry_api::value::{Value, ValueType};

use crate::backend::StandardBackend;
use crate::coercion::{self, CoercionPath};
use crate::config::ConversionConfig;
use crate::error::TypeConversionError;

/// Converts values between in-memory types and SQL column types.
///
/// Numeric and SQL-type specific rules live here; everything else is
/// delegated to the [`ConversionBackend`]. Every entry point:
/// - passes `Null` through without touching the backend;
/// - returns the value unchanged when it already has the exact target type;
/// - reports failures as [`TypeConversionError`], never a default value.
#[derive(Clone)]
pub struct ConversionEngine {
    backend: Arc<dyn ConversionBackend>,
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine").finish_non_exhaustive()
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(Arc::new(StandardBackend::default()))
    }
}

impl ConversionEngine {
    pub fn new(backend: Arc<dyn ConversionBackend>) -> Self {
        Self { backend }
    }

    /// Engine over a [`StandardBackend`] using the configured formats.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(Arc::new(StandardBackend::from_config(config)))
    }

    /// Exact runtime-type equality (not assignability).
    pub fn is_same_class(&self, value: &Value, target: &ValueType) -> bool {
        coercion::is_same_class(value, target)
    }

    /// Generic conversion through the backend.
    pub fn convert_to(&self, value: &Value, target: &ValueType) -> Result<Value, TypeConversionError> {
        match coercion::resolve(value, target) {
            CoercionPath::Null => Ok(Value::Null),
            CoercionPath::Identity => Ok(value.clone()),
            CoercionPath::Numeric | CoercionPath::Backend => self.delegate(value, target),
        }
    }

    /// Generic conversion to a type given by name (`"int"`, `"date"`, ...).
    ///
    /// Unknown names resolve to [`ValueType::Other`], which no built-in rule
    /// converts into.
    pub fn convert_named(&self, value: &Value, type_name: &str) -> Result<Value, TypeConversionError> {
        self.convert_to(value, &ValueType::from_name(type_name))
    }

    /// Numeric conversion: integer/floating/decimal widening and narrowing,
    /// zero/non-zero to bool, canonical text for strings.
    pub fn convert_number(
        &self,
        binder: Option<&dyn ParameterBinder>,
        value: &Value,
        target: &ValueType,
    ) -> Result<Value, TypeConversionError> {
        if self.is_same_class(value, target) {
            return Ok(value.clone());
        }
        coercion::coerce_number(value, target).map_err(|reason| {
            TypeConversionError::new(value, target, reason).at_path(binder.and_then(|b| b.binding_path()))
        })
    }

    /// General conversion: identity, then the numeric table for numeric
    /// values with numeric/bool/string targets, then the backend.
    ///
    /// Errors carry the binder's binding path.
    pub fn convert(
        &self,
        binder: Option<&dyn ParameterBinder>,
        value: &Value,
        target: &ValueType,
    ) -> Result<Value, TypeConversionError> {
        let path = binder.and_then(|b| b.binding_path());
        self.convert_inner(value, target).map_err(|e| e.at_path(path))
    }

    /// Same as [`convert`](Self::convert) with an explicit binding path.
    /// The path only changes the error context.
    pub fn convert_with_path(
        &self,
        _binder: Option<&dyn ParameterBinder>,
        value: &Value,
        binding_path: &str,
        target: &ValueType,
    ) -> Result<Value, TypeConversionError> {
        self.convert_inner(value, target)
            .map_err(|e| e.at_path(Some(binding_path)))
    }

    /// Convert to the in-memory representation of the binder's declared
    /// column type.
    ///
    /// `Null` stays `Null` without consulting the backend. Columns of
    /// `SqlType::Other` receive the value unchanged.
    pub fn convert_to_sql_type(
        &self,
        binder: &dyn ParameterBinder,
        value: &Value,
    ) -> Result<Value, TypeConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let column = binder.column();
        match column.sql_type.value_type() {
            Some(target) => self.convert(Some(binder), value, &target),
            None => {
                tracing::debug!(
                    sql_type = %column.sql_type,
                    column = column.name.as_deref().unwrap_or_default(),
                    "no in-memory type for column, binding value as-is"
                );
                Ok(value.clone())
            }
        }
    }

    // Callers attach the binding path; the explicit path of
    // `convert_with_path` must win over the binder's own.
    fn convert_inner(&self, value: &Value, target: &ValueType) -> Result<Value, TypeConversionError> {
        match coercion::resolve(value, target) {
            CoercionPath::Null => Ok(Value::Null),
            CoercionPath::Identity => Ok(value.clone()),
            CoercionPath::Numeric => coercion::coerce_number(value, target)
                .map_err(|reason| TypeConversionError::new(value, target, reason)),
            CoercionPath::Backend => self.delegate(value, target),
        }
    }

    fn delegate(&self, value: &Value, target: &ValueType) -> Result<Value, TypeConversionError> {
        self.backend
            .convert(value, target)
            .map_err(|e| TypeConversionError::new(value, target, e.message))
    }
}
