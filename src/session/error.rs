//! Error types for cookie session operations.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`CookieSessionManager`](super::CookieSessionManager).
///
/// A delete that matches nothing in the store is not an error: the store
/// cannot tell "absent" from "removed", so both resolve successfully.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The URL (given or synthesized from a site name) could not be parsed
    /// or has no host.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// A header string cannot be carried as an HTTP header value.
    #[error("invalid {header} header: {reason}")]
    InvalidHeader {
        /// Which header was being built or read.
        header: &'static str,
        /// Description of what was wrong (never the header value).
        reason: String,
    },

    /// The cookie store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
