// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by the resolver, the parameter store and the gateway.

use thiserror::Error;

/// Failures reported by (or while talking to) a downstream backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("no backend registered for namespace '{0}'")]
    NotConnected(String),

    #[error("{0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Bridge errors surfaced to northbound callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed path or unknown top-level namespace.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Well-formed path with no matching node or document key.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Write to a leaf without a setter.
    #[error("Parameter {0} is read-only")]
    ReadOnly(String),

    /// Value cannot be applied at this path (e.g. a scalar written to a branch).
    #[error("Invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl BridgeError {
    /// HTTP status code for this error on the northbound surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPath(_)
            | Self::PathNotFound(_)
            | Self::ReadOnly(_)
            | Self::InvalidValue { .. } => 400,
            Self::Backend(BackendError::Rejected(_)) => 400,
            Self::Backend(BackendError::NotConnected(_)) => 503,
            Self::Backend(_) => 502,
        }
    }

    /// True for errors caused by caller input rather than the downstream.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}

/// Result alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(BridgeError::InvalidPath("x".into()).status_code(), 400);
        assert_eq!(BridgeError::ReadOnly("x".into()).status_code(), 400);
        assert_eq!(
            BridgeError::from(BackendError::Rejected("nope".into())).status_code(),
            400
        );
        assert_eq!(
            BridgeError::from(BackendError::NotConnected("fp".into())).status_code(),
            503
        );
        assert_eq!(
            BridgeError::from(BackendError::Transport("timeout".into())).status_code(),
            502
        );
    }

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = BackendError::Rejected("exposure_time must be positive".into());
        assert_eq!(err.to_string(), "exposure_time must be positive");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(BridgeError::PathNotFound("a/b".into()).is_user_error());
        assert!(!BridgeError::from(BackendError::Malformed("x".into())).is_user_error());
    }
}
