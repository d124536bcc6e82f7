use std::fmt;

/// Error kind for collaborator errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Discovery,
    Metadata,
    Conversion,
    Logic,
}

/// Collaborator error, returned by every trait the engine consumes
/// (discovery, entity metadata, conversion backend, filters, accessors).
#[derive(Debug, Clone)]
pub struct CollaboratorError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Discovery, message: msg.into() }
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Metadata, message: msg.into() }
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Conversion, message: msg.into() }
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Logic, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CollaboratorError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → CollaboratorError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<serde_json::Error> for CollaboratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::config(e.to_string())
    }
}

impl From<std::num::ParseIntError> for CollaboratorError {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::conversion(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for CollaboratorError {
    fn from(e: std::num::ParseFloatError) -> Self {
        Self::conversion(e.to_string())
    }
}

impl From<chrono::ParseError> for CollaboratorError {
    fn from(e: chrono::ParseError) -> Self {
        Self::conversion(e.to_string())
    }
}

impl From<rust_decimal::Error> for CollaboratorError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::conversion(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for CollaboratorError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::conversion(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_context_keeps_kind() {
        let err = CollaboratorError::discovery("namespace is empty").with_context("app.model");
        assert_eq!(err.kind, ErrorKind::Discovery);
        assert_eq!(err.message, "app.model: namespace is empty");
        assert_eq!(err.to_string(), "Discovery: app.model: namespace is empty");
    }

    #[test]
    fn parse_errors_are_conversion_errors() {
        let err: CollaboratorError = "x1".parse::<i32>().unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Conversion);
    }
}
