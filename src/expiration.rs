//! Cookie `Expires` attribute values.
//!
//! Expiry strings are always rendered in UTC using the fixed US-locale
//! pattern `EEE, dd MMM yyyy HH:mm:ss 'GMT'` (e.g. `Thu, 01 Jan 1970 00:00:00 GMT`),
//! which is the RFC 7231 IMF-fixdate produced by [`httpdate`].

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Latest instant an HTTP-date can carry: `Fri, 31 Dec 9999 23:59:59 GMT`.
const MAX_HTTP_DATE_SECS: u64 = 253_402_300_799;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Errors raised while building a cookie expiry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpirationError {
    /// An explicit expiry date was requested but none was supplied.
    #[error("invalid argument: an explicit expiry date is required")]
    InvalidArgument,
}

/// A point in time to embed in a `Set-Cookie` header's `Expires` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieExpiration {
    at: SystemTime,
}

impl CookieExpiration {
    /// The deletion sentinel: `Thu, 01 Jan 1970 00:00:00 GMT`.
    #[must_use]
    pub fn epoch() -> Self {
        Self { at: UNIX_EPOCH }
    }

    /// Expires `millis` milliseconds from now. Negative values land in the past.
    #[must_use]
    pub fn milliseconds(millis: i64) -> Self {
        Self::offset_from(SystemTime::now(), millis)
    }

    /// Expires `days` whole days from now.
    #[must_use]
    pub fn days(days: i64) -> Self {
        Self::milliseconds(days.saturating_mul(MILLIS_PER_DAY))
    }

    /// Expires at an explicit instant.
    ///
    /// # Errors
    ///
    /// Returns [`ExpirationError::InvalidArgument`] when `at` is `None`.
    pub fn date(at: Option<SystemTime>) -> Result<Self, ExpirationError> {
        at.map(|at| Self { at })
            .ok_or(ExpirationError::InvalidArgument)
    }

    /// The instant this expiry refers to, before any clamping.
    #[must_use]
    pub fn at(&self) -> SystemTime {
        self.at
    }

    /// Formats the expiry for a `Set-Cookie` header.
    ///
    /// Instants before the epoch render as the epoch; instants past year 9999
    /// render as the last representable second.
    #[must_use]
    pub fn to_expires_string(&self) -> String {
        httpdate::fmt_http_date(self.clamped())
    }

    fn offset_from(base: SystemTime, millis: i64) -> Self {
        let delta = Duration::from_millis(millis.unsigned_abs());
        let at = if millis >= 0 {
            base.checked_add(delta).unwrap_or_else(max_instant)
        } else {
            base.checked_sub(delta).unwrap_or(UNIX_EPOCH)
        };
        Self { at }
    }

    fn clamped(&self) -> SystemTime {
        match self.at.duration_since(UNIX_EPOCH) {
            Err(_) => UNIX_EPOCH,
            Ok(since) if since.as_secs() > MAX_HTTP_DATE_SECS => max_instant(),
            Ok(_) => self.at,
        }
    }
}

impl fmt::Display for CookieExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expires_string())
    }
}

fn max_instant() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS)
}
