//! Error types for the request cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Request Error Enum ==
/// Outcome of a failed `execute_request` call.
///
/// The request function's error is wrapped in an `Arc` so that every caller
/// joined on the same in-flight request receives the very same error value.
#[derive(Error, Debug)]
pub enum RequestError<E = anyhow::Error> {
    /// The request function returned an error
    #[error("Request failed: {0}")]
    Failed(Arc<E>),

    /// The request task ended without producing a result (panic or runtime shutdown)
    #[error("Request for key '{key}' terminated before completing")]
    Aborted { key: String },

    /// A new request had to be issued but no tokio runtime was running
    #[error("Cannot issue request for key '{key}': no tokio runtime is running")]
    NoRuntime { key: String },
}

impl<E> RequestError<E> {
    /// Returns the request function's error, if that is what failed.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            RequestError::Failed(err) => Some(err.as_ref()),
            RequestError::Aborted { .. } | RequestError::NoRuntime { .. } => None,
        }
    }

    /// Unwraps the original error when this is the last reference to it.
    ///
    /// Returns `Err(self)` when the error is still shared with other
    /// joined callers or the request never produced one.
    pub fn into_inner(self) -> std::result::Result<E, Self> {
        match self {
            RequestError::Failed(err) => Arc::try_unwrap(err).map_err(RequestError::Failed),
            other => Err(other),
        }
    }
}

// Sharing the error must not require `E: Clone`
impl<E> Clone for RequestError<E> {
    fn clone(&self) -> Self {
        match self {
            RequestError::Failed(err) => RequestError::Failed(Arc::clone(err)),
            RequestError::Aborted { key } => RequestError::Aborted { key: key.clone() },
            RequestError::NoRuntime { key } => RequestError::NoRuntime { key: key.clone() },
        }
    }
}

// == Key Error Enum ==
/// Failure to build a cache key from request parameters.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Parameters could not be serialized to JSON
    #[error("Cannot serialize params for endpoint '{endpoint}': {source}")]
    Serialize {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for `execute_request`.
pub type Result<T, E = anyhow::Error> = std::result::Result<T, RequestError<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, PartialEq)]
    struct Upstream(u16);

    impl fmt::Display for Upstream {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "upstream returned {}", self.0)
        }
    }

    #[test]
    fn test_failed_display_passes_error_through() {
        let err: RequestError<Upstream> = RequestError::Failed(Arc::new(Upstream(502)));
        assert_eq!(err.to_string(), "Request failed: upstream returned 502");
    }

    #[test]
    fn test_clone_shares_the_same_error() {
        let err: RequestError<Upstream> = RequestError::Failed(Arc::new(Upstream(500)));
        let copy = err.clone();

        match (&err, &copy) {
            (RequestError::Failed(a), RequestError::Failed(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected Failed variants"),
        }
    }

    #[test]
    fn test_into_inner_unique_and_shared() {
        let err: RequestError<Upstream> = RequestError::Failed(Arc::new(Upstream(404)));
        assert_eq!(err.into_inner().unwrap(), Upstream(404));

        let err: RequestError<Upstream> = RequestError::Failed(Arc::new(Upstream(404)));
        let _joined = err.clone();
        assert!(err.into_inner().is_err());
    }

    #[test]
    fn test_aborted_has_no_source_error() {
        let err: RequestError<Upstream> = RequestError::Aborted {
            key: "risk:{}".to_string(),
        };
        assert!(err.source_error().is_none());
        assert!(err.to_string().contains("risk:{}"));
    }

    #[test]
    fn test_derived_debug_and_source_chain() {
        let err: RequestError<Upstream> = RequestError::Failed(Arc::new(Upstream(503)));
        assert_eq!(format!("{err:?}"), "Failed(Upstream(503))");

        let err: RequestError<Upstream> = RequestError::Aborted {
            key: "risk:{}".to_string(),
        };
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(format!("{err:?}"), "Aborted { key: \"risk:{}\" }");
    }

    #[test]
    fn test_no_runtime_display() {
        let err: RequestError<Upstream> = RequestError::NoRuntime {
            key: "orders:{}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot issue request for key 'orders:{}': no tokio runtime is running"
        );
        assert!(err.clone().into_inner().is_err());
    }
}
