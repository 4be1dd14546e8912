//! Error types for the Hawtio Kubernetes operator.

use thiserror::Error;

/// Errors that can occur during operator operations.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource not found.
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Conversion between two API revisions that can never be performed.
    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedConversion {
        /// Source apiVersion.
        from: String,
        /// Requested apiVersion.
        to: String,
    },

    /// Optimistic concurrency failure: the object changed since it was read.
    #[error("Conflict writing {kind}/{name}: object was modified")]
    Conflict {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
    },

    /// Reconciliation exceeded its deadline.
    #[error("Reconciliation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API error reported by a store that is not backed by kube.
    #[error("API error ({code}): {message}")]
    ApiError {
        /// HTTP-style status code.
        code: u16,
        /// Message.
        message: String,
    },
}

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

impl OperatorError {
    /// Whether the caller should retry the whole reconciliation.
    ///
    /// Transport failures, throttling, server errors, conflicts and timeouts are
    /// transient. Configuration and conversion errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            OperatorError::KubeError(kube::Error::Api(resp)) => {
                resp.code == 409 || resp.code == 429 || resp.code >= 500
            }
            OperatorError::KubeError(_) => true,
            OperatorError::ApiError { code, .. } => *code == 409 || *code == 429 || *code >= 500,
            OperatorError::Conflict { .. } | OperatorError::Timeout(_) => true,
            OperatorError::NotFound { .. }
            | OperatorError::InvalidConfig(_)
            | OperatorError::UnsupportedConversion { .. }
            | OperatorError::SerializationError(_) => false,
        }
    }

    /// Whether the error represents absence rather than failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            OperatorError::NotFound { .. } => true,
            OperatorError::KubeError(kube::Error::Api(resp)) => resp.code == 404,
            OperatorError::ApiError { code, .. } => *code == 404,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for OperatorError {
    fn from(err: serde_yaml::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_conversion_is_permanent() {
        let err = OperatorError::UnsupportedConversion {
            from: "hawt.io/v1".into(),
            to: "hawt.io/v1alpha1".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Conversion from hawt.io/v1 to hawt.io/v1alpha1 is not supported"
        );
    }

    #[test]
    fn conflicts_and_throttling_are_transient() {
        let conflict = OperatorError::Conflict {
            kind: "Deployment".into(),
            name: "hawtio".into(),
        };
        assert!(conflict.is_transient());

        let throttled = OperatorError::ApiError {
            code: 429,
            message: "slow down".into(),
        };
        assert!(throttled.is_transient());

        let forbidden = OperatorError::ApiError {
            code: 403,
            message: "forbidden".into(),
        };
        assert!(!forbidden.is_transient());
        assert!(!forbidden.is_not_found());
    }

    #[test]
    fn not_found_is_classified() {
        let err = OperatorError::ApiError {
            code: 404,
            message: "missing".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
