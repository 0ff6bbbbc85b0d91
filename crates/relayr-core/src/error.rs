// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Relayr communication core.

use thiserror::Error;

use crate::types::ChannelKind;

/// The primary error type used across all Relayr services and adapters.
///
/// The taxonomy matters to the queue layer: [`RelayrError::is_retryable`]
/// is the single point that classifies a failure as transient (backoff and
/// retry) or terminal (mark the owning entity failed, do not retry).
#[derive(Debug, Error)]
pub enum RelayrError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence collaborator errors (connection loss, query failure,
    /// lock contention). Treated as transient.
    #[error("repository error: {source}")]
    Repository {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Webhook payload signature did not verify against the integration
    /// secret. Rejected at the boundary with no side effects.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// No integration matched the lookup (unknown id, wrong channel, or
    /// no active integration for the account).
    #[error("unknown integration: {0}")]
    UnknownIntegration(String),

    /// More than one active integration exists for (account, channel) and
    /// the caller did not name one explicitly.
    #[error("ambiguous integration for account {account_id} channel {channel}")]
    AmbiguousIntegration {
        account_id: String,
        channel: ChannelKind,
    },

    /// Malformed provider payload (missing required fields, wrong shape).
    /// Terminal: redelivery of the same bytes cannot succeed.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// Transient provider failure (network error, 5xx). Retryable.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Terminal provider rejection (4xx: bad recipient, revoked token,
    /// validation failure). Never retried.
    #[error("provider rejected request: {message}")]
    Rejected { message: String },

    /// Operation timed out. Retryable.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayrError {
    /// Whether the queue engine should retry the enclosing job.
    ///
    /// Repository errors are transient by policy: lock contention and
    /// connection loss resolve on retry, while a bad payload or a provider
    /// 4xx never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Repository { .. } | Self::Transport { .. } | Self::Timeout { .. }
        )
    }

    /// Convenience constructor for repository errors from any source.
    pub fn repository<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Repository {
            source: Box::new(source),
        }
    }

    /// Convenience constructor for transport errors carrying a source.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(RelayrError::Transport {
            message: "connection reset".into(),
            source: None,
        }
        .is_retryable());
        assert!(RelayrError::Timeout {
            duration: std::time::Duration::from_secs(10),
        }
        .is_retryable());
        assert!(RelayrError::repository(std::io::Error::other("busy")).is_retryable());

        assert!(!RelayrError::Rejected {
            message: "invalid recipient".into(),
        }
        .is_retryable());
        assert!(!RelayrError::Payload("missing entry".into()).is_retryable());
        assert!(!RelayrError::Signature("mismatch".into()).is_retryable());
        assert!(!RelayrError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn error_display_includes_detail() {
        let err = RelayrError::AmbiguousIntegration {
            account_id: "a1".into(),
            channel: ChannelKind::Telegram,
        };
        let text = err.to_string();
        assert!(text.contains("a1"));
        assert!(text.contains("telegram"));
    }
}
