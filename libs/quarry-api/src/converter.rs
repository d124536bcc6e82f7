use crate::error::CollaboratorError;
use crate::value::{Value, ValueType};

/// Generic value conversion backend.
///
/// Solves one task: best-effort conversion of a value into a target type
/// (string → date, string → number, date → string, ...).
///
/// The conversion engine treats the backend as a black box and only adds
/// numeric and SQL-type specific rules on top. A backend must never
/// substitute a default value: when there is no path, it returns an error.
pub trait ConversionBackend: Send + Sync {
    fn convert(&self, value: &Value, target: &ValueType) -> Result<Value, CollaboratorError>;
}
