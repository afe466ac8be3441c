//! SharePoint federated-auth cookie session library.
//!
//! Reads, writes and expires the `FedAuth`/`rtFa` cookies that SharePoint
//! Online and ADFS use to mark a signed-in session, against a cookie store
//! owned by the host application.
//!
//! # Architecture
//!
//! - [`session`] - [`CookieSessionManager`]: get, set, remove, clear
//! - [`sharepoint`] - per-site helpers built on the manager
//! - [`expiration`] - `Expires` attribute formatting
//! - [`store`] - the [`CookieJar`] collaborator trait and an in-memory jar

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod expiration;
pub mod session;
pub mod sharepoint;
pub mod store;

// Re-export commonly used types
pub use expiration::{CookieExpiration, ExpirationError};
pub use session::{CookieSessionManager, FED_AUTH, RT_FA, SessionError};
pub use sharepoint::{SiteSession, SpCookie, site_name_from_url};
pub use store::{
    CookieFileError, CookieJar, CookieLine, MemoryCookieJar, StoreError, parse_netscape_cookies,
};
