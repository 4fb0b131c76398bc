//! Terminal result of one authentication attempt.

use http::StatusCode;

use crate::error::{BoxError, FailReason};

/// Outcome of a single authentication attempt.
///
/// Exactly one outcome is produced per attempt; it is returned by value so a
/// second report is not expressible.
#[derive(Debug)]
pub enum AuthOutcome<I> {
    /// The request carries a valid token for a known identity.
    Success {
        /// Identity returned by the identity verifier.
        identity: I,
        /// Optional information returned alongside it.
        info: Option<String>,
    },

    /// The request is not authenticated. Expected; the host may try another
    /// strategy or challenge the client.
    Fail {
        /// Why authentication failed.
        reason: FailReason,
        /// Status the host may use for the response.
        status: Option<StatusCode>,
    },

    /// Infrastructure failure while processing the request.
    Error(BoxError),
}

impl<I> AuthOutcome<I> {
    /// Failure without a status hint.
    pub fn fail(reason: FailReason) -> Self {
        Self::Fail {
            reason,
            status: None,
        }
    }

    /// Failure with a status hint.
    pub fn fail_with_status(reason: FailReason, status: StatusCode) -> Self {
        Self::Fail {
            reason,
            status: Some(status),
        }
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether this is a failure.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Identity, if successful.
    pub fn identity(&self) -> Option<&I> {
        match self {
            Self::Success { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Failure reason, if failed.
    pub fn fail_reason(&self) -> Option<&FailReason> {
        match self {
            Self::Fail { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Fail { .. } => "fail",
            Self::Error(_) => "error",
        }
    }
}
