//! Cookie session manager.
//!
//! Translates read, write, targeted-delete and full-clear intents into calls
//! against an injected [`CookieJar`]. Deletion is expressed as `Set-Cookie`
//! writes with an already-past expiry, one per domain/path scope.
//!
//! Multi-write operations are not transactional: if one write fails the
//! remaining writes are skipped and the earlier ones stay applied.

mod error;
mod header;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use tracing::{debug, info, instrument};
use url::Url;

use crate::store::CookieJar;

pub use error::SessionError;
pub use header::{
    FED_AUTH, RT_FA, SHAREPOINT_DOMAIN, expiry_set_cookie, parse_cookie_header,
    parse_cookie_header_into, site_expiry_headers,
};

/// Reads, writes and expires cookies in a host-supplied store.
#[derive(Clone)]
pub struct CookieSessionManager {
    jar: Arc<dyn CookieJar>,
}

impl CookieSessionManager {
    /// Creates a manager over `jar`.
    #[must_use]
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self { jar }
    }

    /// The underlying store.
    #[must_use]
    pub fn jar(&self) -> &Arc<dyn CookieJar> {
        &self.jar
    }

    /// Returns every cookie the store would send to `url`, by name.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] for an unparseable URL and
    /// [`SessionError::Store`] when the store fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<BTreeMap<String, String>, SessionError> {
        let url = parse_url(url)?;
        self.read(&url).await
    }

    /// Hands one raw `Set-Cookie` header to the store for `url`.
    ///
    /// The header's shape is not validated.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`], [`SessionError::InvalidHeader`]
    /// when `value` is not a legal header value, or [`SessionError::Store`].
    #[instrument(level = "debug", skip(self, value))]
    pub async fn set(&self, url: &str, value: &str) -> Result<(), SessionError> {
        let url = parse_url(url)?;
        self.write(&url, value).await
    }

    /// Expires the `FedAuth` and `rtFa` cookies of SharePoint site `site`
    /// (e.g. `contoso` for `contoso.sharepoint.com`) across every scope they
    /// are known to be set under.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] when `site` does not form exactly
    /// the host `{site}.sharepoint.com`, or the first store failure.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove(&self, site: &str) -> Result<(), SessionError> {
        let host = format!("{site}.{SHAREPOINT_DOMAIN}");
        let url = parse_url(&format!("https://{host}"))?;
        // `site` must name a host label, not smuggle in a path, query or userinfo.
        if url.host_str() != Some(host.to_ascii_lowercase().as_str()) {
            return Err(SessionError::InvalidUrl {
                url: url.to_string(),
                source: url::ParseError::InvalidDomainCharacter,
            });
        }

        for header in site_expiry_headers(site) {
            self.write(&url, &header).await?;
        }

        info!(site, "expired SharePoint auth cookies");
        Ok(())
    }

    /// Expires, at `Path=/` with no `Domain`, every cookie currently visible
    /// for `host` plus `FedAuth` and `rtFa`.
    ///
    /// `host` may be a bare host, `host:port`, or a full URL. Returns `true`
    /// when the host had cookies before the call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] or the first store failure.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove_by_host(&self, host: &str) -> Result<bool, SessionError> {
        let url = host_url(host)?;
        let visible = self.read(&url).await?;

        let names: BTreeSet<&str> = visible
            .keys()
            .map(String::as_str)
            .chain([FED_AUTH, RT_FA])
            .collect();
        for name in &names {
            self.write(&url, &expiry_set_cookie(name, None, Some("/")))
                .await?;
        }

        info!(
            host = url.host_str().unwrap_or_default(),
            visible = visible.len(),
            expired = names.len(),
            "expired host cookies"
        );
        Ok(!visible.is_empty())
    }

    /// Removes every cookie from the store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the store fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.jar.clear().await?;
        info!("cleared cookie store");
        Ok(())
    }

    /// Alias of [`clear`](Self::clear).
    ///
    /// # Errors
    ///
    /// Same as [`clear`](Self::clear).
    pub async fn clear_cookies(&self) -> Result<(), SessionError> {
        self.clear().await
    }

    async fn read(&self, url: &Url) -> Result<BTreeMap<String, String>, SessionError> {
        let headers = self.jar.get(url).await?;

        let mut cookies = BTreeMap::new();
        for value in headers.get_all(COOKIE) {
            let raw = std::str::from_utf8(value.as_bytes()).map_err(|error| {
                SessionError::InvalidHeader {
                    header: "Cookie",
                    reason: error.to_string(),
                }
            })?;
            parse_cookie_header_into(raw, &mut cookies);
        }

        debug!(url = %url, count = cookies.len(), "read cookies");
        Ok(cookies)
    }

    async fn write(&self, url: &Url, set_cookie: &str) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(set_cookie).map_err(|error| {
            SessionError::InvalidHeader {
                header: "Set-Cookie",
                reason: error.to_string(),
            }
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, value);
        self.jar.put(url, headers).await?;
        Ok(())
    }
}

/// Parses `raw` as an absolute URL with a host.
pub(crate) fn parse_url(raw: &str) -> Result<Url, SessionError> {
    let url = Url::parse(raw.trim()).map_err(|source| SessionError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SessionError::InvalidUrl {
            url: raw.to_string(),
            source: url::ParseError::EmptyHost,
        });
    }
    Ok(url)
}

/// Accepts a bare host, `host:port`, or a full URL.
fn host_url(host: &str) -> Result<Url, SessionError> {
    let host = host.trim();
    if host.contains("://") {
        parse_url(host)
    } else {
        parse_url(&format!("https://{host}"))
    }
}
