use quarry_api::error::CollaboratorError;
use quarry_api::value::{Value, ValueType};

/// A value could not be coerced into the requested type.
///
/// Carries everything needed to diagnose a failed bind: the value, its
/// runtime type, the target type and the binding path when known.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "cannot convert {value} ({}) to {target}{}: {reason}",
    source_type_name(.value),
    path_suffix(.binding_path)
)]
pub struct TypeConversionError {
    pub value: Value,
    pub target: ValueType,
    pub binding_path: Option<String>,
    pub reason: String,
}

impl TypeConversionError {
    pub fn new(value: &Value, target: &ValueType, reason: impl Into<String>) -> Self {
        Self {
            value: value.clone(),
            target: target.clone(),
            binding_path: None,
            reason: reason.into(),
        }
    }

    /// Attach a binding path unless one is already present.
    pub fn at_path(mut self, path: Option<&str>) -> Self {
        if self.binding_path.is_none() {
            self.binding_path = path.map(str::to_string);
        }
        self
    }

    pub fn source_type(&self) -> Option<ValueType> {
        self.value.value_type()
    }
}

fn source_type_name(value: &Value) -> String {
    value
        .value_type()
        .map_or_else(|| "null".to_string(), |t| t.to_string())
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_deref()
        .map(|p| format!(" at '{p}'"))
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unable to find type '{0}' when caching filter sources")]
    TypeNotFound(String),

    #[error("filter source discovery failed in namespace '{namespace}': {source}")]
    Discovery {
        namespace: String,
        source: CollaboratorError,
    },

    #[error("filter source '{kind}' setup failed: {source}")]
    SourceSetup {
        kind: String,
        source: CollaboratorError,
    },

    #[error("filter '{kind}' initialization failed: {source}")]
    FilterInit {
        kind: String,
        source: CollaboratorError,
    },

    #[error("unknown filter kind: {0}")]
    UnknownFilterKind(String),

    #[error("filter '{kind}' is not a {expected}")]
    FilterTypeMismatch { kind: String, expected: &'static str },

    #[error("registry already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Conversion(#[from] TypeConversionError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("io error: {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Collaborator` variant, context is added to the inner `CollaboratorError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Collaborator(e) => EngineError::Collaborator(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
