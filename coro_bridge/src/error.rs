//! Error types surfaced by [`Bridge`](crate::Bridge) and [`Runtime`](crate::Runtime).

use thiserror::Error;

/// Why a scheduling context could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The calling thread is already inside a `block_on`.
    ///
    /// Nested drive-to-completion calls are rejected instead of deadlocking
    /// the outer one.
    #[error("a scheduling context is already being driven on this thread")]
    Reentrant,
    /// Another thread is currently driving this runtime, named by the payload.
    #[error("runtime `{0}` is being driven by another thread")]
    Busy(String),
    /// The configured metrics exporter could not be installed.
    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),
}

/// Failure of a single bridge call.
///
/// The callback is never invoked when a call returns one of these.
#[derive(Debug, Error)]
pub enum BridgeError<E> {
    /// No runtime could be obtained to drive the awaitable.
    #[error("scheduling context unavailable: {0}")]
    ContextUnavailable(#[from] ContextError),
    /// The awaited computation failed; its error is carried unchanged.
    #[error("awaited computation failed: {0}")]
    Failed(#[source] E),
}

impl<E> BridgeError<E> {
    /// Returns the awaited computation's error, if that is what failed.
    pub fn failure(&self) -> Option<&E> {
        match self {
            BridgeError::Failed(err) => Some(err),
            BridgeError::ContextUnavailable(_) => None,
        }
    }

    /// Unwraps the awaited computation's error, if that is what failed.
    pub fn into_failure(self) -> Option<E> {
        match self {
            BridgeError::Failed(err) => Some(err),
            BridgeError::ContextUnavailable(_) => None,
        }
    }

    pub fn is_context_unavailable(&self) -> bool {
        matches!(self, BridgeError::ContextUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeError, ContextError};
    use std::error::Error as _;
    use std::fmt;

    #[derive(Debug, PartialEq)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn failed_keeps_the_original_error() {
        let err = BridgeError::Failed(Boom);
        assert_eq!(err.to_string(), "awaited computation failed: boom");
        assert_eq!(err.failure(), Some(&Boom));
        assert!(err.source().is_some());
        assert!(!err.is_context_unavailable());
        assert_eq!(err.into_failure(), Some(Boom));
    }

    #[test]
    fn context_errors_convert() {
        let err: BridgeError<Boom> = ContextError::Reentrant.into();
        assert!(err.is_context_unavailable());
        assert_eq!(
            err.to_string(),
            "scheduling context unavailable: a scheduling context is already being driven on this thread"
        );
        assert_eq!(err.into_failure(), None);
    }
}
