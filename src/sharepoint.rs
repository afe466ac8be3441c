//! SharePoint Online site sessions.
//!
//! A [`SiteSession`] binds a [`CookieSessionManager`] to one site
//! (`https://{site}.sharepoint.com`) and reads, stores and expires the
//! `FedAuth`/`rtFa` pair that marks an authenticated federated session.

use std::fmt;

use tracing::{debug, instrument};

use crate::session::{CookieSessionManager, FED_AUTH, RT_FA, SHAREPOINT_DOMAIN, SessionError};

/// The federated-auth cookie pair of a signed-in SharePoint session.
///
/// Values are redacted from Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct SpCookie {
    /// `FedAuth` cookie value.
    pub fed_auth: String,
    /// `rtFa` cookie value.
    pub rt_fa: String,
}

impl SpCookie {
    /// Creates a cookie pair.
    #[must_use]
    pub fn new(fed_auth: impl Into<String>, rt_fa: impl Into<String>) -> Self {
        Self {
            fed_auth: fed_auth.into(),
            rt_fa: rt_fa.into(),
        }
    }

    /// The `Cookie` request header value carrying both cookies.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!("{FED_AUTH}={};{RT_FA}={}", self.fed_auth, self.rt_fa)
    }
}

impl fmt::Debug for SpCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpCookie")
            .field("fed_auth", &"[REDACTED]")
            .field("rt_fa", &"[REDACTED]")
            .finish()
    }
}

/// Extracts the site name from a SharePoint Online URL.
///
/// `https://contoso.sharepoint.com/sites/team` yields `contoso`. A host
/// outside `sharepoint.com` is returned whole.
///
/// # Errors
///
/// Returns [`SessionError::InvalidUrl`] when `url` cannot be parsed or has no host.
pub fn site_name_from_url(url: &str) -> Result<String, SessionError> {
    let parsed = crate::session::parse_url(url)?;
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let site = host
        .strip_suffix(SHAREPOINT_DOMAIN)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .unwrap_or(&host);
    Ok(site.to_string())
}

/// Cookie operations scoped to one SharePoint Online site.
#[derive(Clone)]
pub struct SiteSession {
    manager: CookieSessionManager,
    site: String,
}

impl SiteSession {
    /// Binds `manager` to site `site` (e.g. `contoso`).
    #[must_use]
    pub fn new(manager: CookieSessionManager, site: impl Into<String>) -> Self {
        Self {
            manager,
            site: site.into(),
        }
    }

    /// Binds `manager` to the site that `url` points into.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] when `url` cannot be parsed.
    pub fn from_url(manager: CookieSessionManager, url: &str) -> Result<Self, SessionError> {
        Ok(Self::new(manager, site_name_from_url(url)?))
    }

    /// The site name.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// `https://{site}.sharepoint.com`
    #[must_use]
    pub fn site_url(&self) -> String {
        format!("https://{}.{SHAREPOINT_DOMAIN}", self.site)
    }

    /// Returns the auth cookie pair when both cookies are present.
    ///
    /// # Errors
    ///
    /// Propagates [`CookieSessionManager::get`] failures.
    #[instrument(level = "debug", skip(self), fields(site = %self.site))]
    pub async fn auth_cookies(&self) -> Result<Option<SpCookie>, SessionError> {
        let mut cookies = self.manager.get(&self.site_url()).await?;
        match (cookies.remove(FED_AUTH), cookies.remove(RT_FA)) {
            (Some(fed_auth), Some(rt_fa)) => Ok(Some(SpCookie { fed_auth, rt_fa })),
            (fed_auth, rt_fa) => {
                debug!(
                    has_fed_auth = fed_auth.is_some(),
                    has_rt_fa = rt_fa.is_some(),
                    "no complete auth cookie pair"
                );
                Ok(None)
            }
        }
    }

    /// Stores an auth cookie pair the way SharePoint issues it: `rtFa` on
    /// `.sharepoint.com`, `FedAuth` on the site host, both `Secure; HttpOnly`.
    ///
    /// # Errors
    ///
    /// Propagates [`CookieSessionManager::set`] failures.
    #[instrument(level = "debug", skip(self, cookie), fields(site = %self.site))]
    pub async fn store_auth_cookies(&self, cookie: &SpCookie) -> Result<(), SessionError> {
        let url = self.site_url();
        self.manager
            .set(
                &url,
                &format!(
                    "{RT_FA}={}; Domain=.{SHAREPOINT_DOMAIN}; Path=/; Secure; HttpOnly",
                    cookie.rt_fa
                ),
            )
            .await?;
        self.manager
            .set(
                &url,
                &format!(
                    "{FED_AUTH}={}; Domain={}.{SHAREPOINT_DOMAIN}; Path=/; Secure; HttpOnly",
                    cookie.fed_auth, self.site
                ),
            )
            .await
    }

    /// Expires this site's auth cookies.
    ///
    /// # Errors
    ///
    /// Propagates [`CookieSessionManager::remove`] failures.
    pub async fn remove_auth_cookies(&self) -> Result<(), SessionError> {
        self.manager.remove(&self.site).await
    }

    /// Signs out by clearing the whole store.
    ///
    /// # Errors
    ///
    /// Propagates [`CookieSessionManager::clear`] failures.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.manager.clear().await
    }
}
