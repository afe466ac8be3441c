//! Cookie store collaborators.
//!
//! The session manager never owns cookies itself: it talks to a [`CookieJar`]
//! supplied by the host (the platform cookie store, a browser profile, an
//! HTTP client's jar). [`MemoryCookieJar`] is the in-process implementation
//! used by the CLI and tests, and doubles as a `reqwest` cookie provider.

mod memory;
mod netscape;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use thiserror::Error;
use url::Url;

pub use memory::MemoryCookieJar;
pub use netscape::{CookieFileError, CookieLine, ParseResult, parse_netscape_cookies};

/// Errors reported by a cookie store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("cookie store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Host-specific store failure.
    #[error("cookie store backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Keyed cookie jar supplied by the host environment.
///
/// The jar is responsible for domain/path matching, expiry and persistence.
/// Implementations must be safe to share across tasks; callers do not
/// coordinate concurrent access.
#[async_trait]
pub trait CookieJar: Send + Sync {
    /// Returns the request headers (a `Cookie` entry when any cookie matches)
    /// the jar would attach to a request for `url`.
    async fn get(&self, url: &Url) -> Result<HeaderMap, StoreError>;

    /// Applies the `Set-Cookie` entries in `headers` as if they were received
    /// in a response from `url`.
    async fn put(&self, url: &Url, headers: HeaderMap) -> Result<(), StoreError>;

    /// Removes every cookie in the jar.
    async fn clear(&self) -> Result<(), StoreError>;
}
