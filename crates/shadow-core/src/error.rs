//! Error types for shadow execution
//!
//! - [`CallError`]: raised by an operation (either surface)
//! - [`ResolutionError`]: a reference operation cannot be found at setup
//! - [`TelemetryError`]: tracing subscriber installation failed

use shadow_registry::OperationKind;

/// Error returned by an operation call
///
/// Errors from the reference surface reach the caller unmodified. Errors from
/// the candidate surface are absorbed by the invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The operation raised
    #[error("{0}")]
    Raised(String),

    /// No operation with this name on the surface
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// Argument rejected by the operation
    #[error("invalid argument for `{operation}`: {reason}")]
    InvalidArgument { operation: String, reason: String },

    /// Surface has no context factory
    #[error("surface `{0}` cannot be rebound to a new context")]
    NoContextFactory(String),

    /// Binding resolution failed
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl CallError {
    /// Create raised error
    #[inline]
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    /// Create invalid argument error
    #[inline]
    pub fn invalid_argument(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Binding resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The reference surface lacks an operation the harness must wrap
    #[error("reference surface `{surface}` has no {kind} operation `{name}`")]
    MissingReference {
        surface: String,
        kind: OperationKind,
        name: String,
    },
}

impl ResolutionError {
    /// Create missing reference error
    pub fn missing_reference(
        surface: impl Into<String>,
        kind: OperationKind,
        name: impl Into<String>,
    ) -> Self {
        Self::MissingReference {
            surface: surface.into(),
            kind,
            name: name.into(),
        }
    }
}

/// Tracing setup errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Filter directive did not parse
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already set
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_converts_transparently() {
        let err: CallError =
            ResolutionError::missing_reference("lodash", OperationKind::Sequence, "plant").into();
        assert_eq!(
            err.to_string(),
            "reference surface `lodash` has no sequence operation `plant`"
        );
    }

    #[test]
    fn helpers_build_variants() {
        assert_eq!(CallError::raised("boom").to_string(), "boom");
        assert!(matches!(
            CallError::invalid_argument("max", "expected array"),
            CallError::InvalidArgument { ref operation, .. } if operation == "max"
        ));
    }
}
