//! In-memory cookie jar backed by [`cookie_store`].
//!
//! Cookies are keyed by name, domain and path. A `Set-Cookie` whose expiry
//! has already passed removes the stored cookie with exactly that key and is
//! otherwise a no-op, so an expiry written with a different `Domain`/`Path`
//! than the original leaves it in place.

use std::cmp::Reverse;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use async_trait::async_trait;
use cookie::Cookie as RawCookie;
use cookie_store::CookieStore;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use tracing::{debug, trace, warn};
use url::Url;

use super::{CookieJar, StoreError};

/// Thread-safe in-memory cookie jar.
///
/// Implements both [`CookieJar`] for the session manager and
/// [`reqwest::cookie::CookieStore`], so one jar can back a `reqwest::Client`
/// and be inspected or expired by the session manager at the same time.
#[derive(Default)]
pub struct MemoryCookieJar {
    store: RwLock<CookieStore>,
}

impl MemoryCookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().iter_unexpired().count()
    }

    /// Returns `true` when the jar holds no unexpired cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies a raw `Set-Cookie` header received from `url`.
    ///
    /// Malformed headers and headers whose `Domain` does not match the
    /// request host are ignored, as a browser would.
    pub fn store_set_cookie(&self, raw: &str, url: &Url) {
        match RawCookie::parse(raw) {
            Ok(cookie) => self.apply(&cookie, url),
            Err(error) => warn!(url = %url, reason = %error, "ignoring malformed Set-Cookie header"),
        }
    }

    /// Builds the `Cookie` request header value for `url`, or `None` when no
    /// stored cookie applies.
    ///
    /// Cookies with longer paths come first.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let store = self.read();
        let mut visible: Vec<_> = store
            .matches(url)
            .into_iter()
            .filter(|cookie| !cookie.is_expired())
            .collect();
        if visible.is_empty() {
            return None;
        }
        visible.sort_by_key(|cookie| Reverse(String::from(&cookie.path).len()));

        Some(
            visible
                .iter()
                .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Drops every cookie.
    pub fn clear_all(&self) {
        let mut store = self.write();
        debug!(count = store.iter_unexpired().count(), "clearing cookie jar");
        store.clear();
    }

    /// Inserts, replaces or expires a cookie as if received from `url`.
    pub(super) fn apply(&self, cookie: &RawCookie<'_>, url: &Url) {
        let expiry = is_expiry(cookie);
        match self.write().insert_raw(cookie, url) {
            Ok(_) => trace!(
                name = cookie.name(),
                domain = ?cookie.domain(),
                path = ?cookie.path(),
                expiry,
                "applied Set-Cookie"
            ),
            Err(_) if expiry => debug!(
                name = cookie.name(),
                domain = ?cookie.domain(),
                path = ?cookie.path(),
                "expiry matched no stored cookie"
            ),
            Err(error) => warn!(
                url = %url,
                name = cookie.name(),
                reason = %error,
                "ignoring Set-Cookie header"
            ),
        }
    }

    /// Runs `f` against the underlying store under the read lock.
    pub(super) fn with_store<R>(&self, f: impl FnOnce(&CookieStore) -> R) -> R {
        f(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, CookieStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CookieStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// Custom Debug impl that lists names only; values stay out of logs.
impl fmt::Debug for MemoryCookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.read();
        let names: Vec<&str> = store.iter_unexpired().map(|cookie| cookie.name()).collect();
        f.debug_struct("MemoryCookieJar")
            .field("cookies", &names)
            .field("values", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CookieJar for MemoryCookieJar {
    async fn get(&self, url: &Url) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(header) = self.cookie_header(url) {
            let value =
                HeaderValue::from_str(&header).map_err(|error| StoreError::Backend(Box::new(error)))?;
            headers.insert(COOKIE, value);
        }
        Ok(headers)
    }

    async fn put(&self, url: &Url, headers: HeaderMap) -> Result<(), StoreError> {
        for value in headers.get_all(SET_COOKIE) {
            match std::str::from_utf8(value.as_bytes()) {
                Ok(raw) => self.store_set_cookie(raw, url),
                Err(_) => warn!(url = %url, "ignoring Set-Cookie header that is not UTF-8"),
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clear_all();
        Ok(())
    }
}

impl reqwest::cookie::CookieStore for MemoryCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for value in cookie_headers {
            if let Ok(raw) = std::str::from_utf8(value.as_bytes()) {
                self.store_set_cookie(raw, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.cookie_header(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

/// Whether the header asks for deletion (`Max-Age` wins over `Expires`).
fn is_expiry(cookie: &RawCookie<'_>) -> bool {
    match cookie.max_age() {
        Some(max_age) => !max_age.is_positive(),
        None => cookie
            .expires_datetime()
            .is_some_and(|at| SystemTime::from(at) <= SystemTime::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;

    const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

    fn url(raw: &str) -> Url {
        raw.parse().unwrap()
    }

    fn header_for(jar: &MemoryCookieJar, raw_url: &str) -> Option<String> {
        jar.cookie_header(&url(raw_url))
    }

    #[test]
    fn test_host_only_cookie_is_not_sent_to_subdomains() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie("FedAuth=abc", &url("https://contoso.sharepoint.com/"));

        assert_eq!(
            header_for(&jar, "https://contoso.sharepoint.com/sites/a").as_deref(),
            Some("FedAuth=abc")
        );
        assert_eq!(header_for(&jar, "https://x.contoso.sharepoint.com/"), None);
    }

    #[test]
    fn test_domain_cookie_is_sent_to_subdomains() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie(
            "rtFa=tok; Domain=.sharepoint.com; Path=/",
            &url("https://contoso.sharepoint.com/"),
        );

        assert_eq!(
            header_for(&jar, "https://fabrikam.sharepoint.com/").as_deref(),
            Some("rtFa=tok")
        );
        assert_eq!(header_for(&jar, "https://sharepoint.org/"), None);
    }

    #[test]
    fn test_foreign_domain_attribute_is_rejected() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie(
            "FedAuth=abc; Domain=example.com",
            &url("https://contoso.sharepoint.com/"),
        );
        assert!(jar.is_empty());
    }

    #[test]
    fn test_malformed_header_is_ignored() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie("no-equals-sign", &url("https://contoso.sharepoint.com/"));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_same_key_overwrites_value() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("FedAuth=first; Path=/", &site);
        jar.store_set_cookie("FedAuth=second; Path=/", &site);

        assert_eq!(jar.len(), 1);
        assert_eq!(
            header_for(&jar, "https://contoso.sharepoint.com/").as_deref(),
            Some("FedAuth=second")
        );
    }

    #[test]
    fn test_expiry_with_matching_scope_deletes() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("FedAuth=abc; Domain=contoso.sharepoint.com; Path=/", &site);
        jar.store_set_cookie(
            &format!("FedAuth=; Domain=.contoso.sharepoint.com; Path=/; Expires={EPOCH}"),
            &site,
        );
        assert!(jar.is_empty());
    }

    #[test]
    fn test_expiry_with_mismatched_path_is_silent_noop() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/sites/team/");
        jar.store_set_cookie("FedAuth=abc; Path=/sites/team", &site);
        jar.store_set_cookie(&format!("FedAuth=; Path=/; Expires={EPOCH}"), &site);

        assert_eq!(jar.len(), 1);
        assert_eq!(
            header_for(&jar, "https://contoso.sharepoint.com/sites/team/page").as_deref(),
            Some("FedAuth=abc")
        );
    }

    #[test]
    fn test_expiry_with_mismatched_domain_is_silent_noop() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("rtFa=abc; Domain=sharepoint.com; Path=/", &site);
        jar.store_set_cookie(&format!("rtFa=; Path=/; Expires={EPOCH}"), &site);
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn test_max_age_zero_deletes() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("FedAuth=abc; Path=/", &site);
        jar.store_set_cookie("FedAuth=; Path=/; Max-Age=0", &site);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_huge_max_age_keeps_cookie_persistent() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("FedAuth=abc; Path=/; Max-Age=9999999999999", &site);

        assert_eq!(
            header_for(&jar, "https://contoso.sharepoint.com/").as_deref(),
            Some("FedAuth=abc")
        );
        let persistent = jar.with_store(|store| {
            store.iter_unexpired().all(|cookie| {
                matches!(cookie.expires, cookie_store::CookieExpiration::AtUtc(_))
            })
        });
        assert!(persistent);
    }

    #[test]
    fn test_secure_cookie_is_withheld_from_plain_http() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie(
            "FedAuth=abc; Path=/; Secure",
            &url("https://contoso.sharepoint.com/"),
        );
        assert_eq!(header_for(&jar, "http://contoso.sharepoint.com/"), None);
        assert!(header_for(&jar, "https://contoso.sharepoint.com/").is_some());
    }

    #[test]
    fn test_longer_paths_are_listed_first() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        jar.store_set_cookie("a=root; Path=/", &site);
        jar.store_set_cookie("b=deep; Path=/sites/team", &site);

        assert_eq!(
            header_for(&jar, "https://contoso.sharepoint.com/sites/team/x").as_deref(),
            Some("b=deep; a=root")
        );
    }

    #[test]
    fn test_default_path_comes_from_request_directory() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie(
            "FedAuth=abc",
            &url("https://contoso.sharepoint.com/sites/team/page.aspx"),
        );

        assert!(header_for(&jar, "https://contoso.sharepoint.com/sites/team/x").is_some());
        assert_eq!(header_for(&jar, "https://contoso.sharepoint.com/"), None);
    }

    #[tokio::test]
    async fn test_put_and_get_carry_utf8_values() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_str("FedAuth=café; Path=/").unwrap());
        jar.put(&site, headers).await.unwrap();

        let sent = CookieJar::get(&jar, &site).await.unwrap();
        let value = sent.get(COOKIE).unwrap();
        assert_eq!(std::str::from_utf8(value.as_bytes()).unwrap(), "FedAuth=café");
    }

    #[test]
    fn test_clear_all_empties_jar() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie("FedAuth=abc", &url("https://contoso.sharepoint.com/"));
        jar.clear_all();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_reqwest_cookie_store_roundtrip() {
        let jar = MemoryCookieJar::new();
        let site = url("https://contoso.sharepoint.com/");
        let header = HeaderValue::from_static("FedAuth=abc; Path=/");
        jar.set_cookies(&mut std::iter::once(&header), &site);

        let sent = jar.cookies(&site).unwrap();
        assert_eq!(sent.to_str().unwrap(), "FedAuth=abc");
    }

    #[test]
    fn test_jar_debug_redacts_values() {
        let jar = MemoryCookieJar::new();
        jar.store_set_cookie(
            "FedAuth=super_secret_token",
            &url("https://contoso.sharepoint.com/"),
        );
        let debug_str = format!("{jar:?}");
        assert!(debug_str.contains("FedAuth"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super_secret_token"));
    }
}
