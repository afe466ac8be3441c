//! `Cookie` / `Set-Cookie` string handling.

use std::collections::BTreeMap;

use crate::expiration::CookieExpiration;

/// SharePoint federated-auth session cookie.
pub const FED_AUTH: &str = "FedAuth";
/// SharePoint Online refresh-token cookie, shared across `*.sharepoint.com`.
pub const RT_FA: &str = "rtFa";
/// Parent domain of every SharePoint Online site.
pub const SHAREPOINT_DOMAIN: &str = "sharepoint.com";

/// Splits a `Cookie` header into `name -> value` pairs, adding them to `into`.
///
/// Entries are separated by `;` and split on the first `=`. Names are trimmed,
/// values are kept verbatim. Entries without `=` are skipped; a repeated name
/// keeps its last value.
pub fn parse_cookie_header_into(header: &str, into: &mut BTreeMap<String, String>) {
    for entry in header.split(';') {
        if let Some((name, value)) = entry.split_once('=') {
            into.insert(name.trim().to_string(), value.to_string());
        }
    }
}

/// Convenience wrapper around [`parse_cookie_header_into`].
#[must_use]
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    parse_cookie_header_into(header, &mut cookies);
    cookies
}

/// Builds a `Set-Cookie` value that expires `name` in the given scope.
///
/// The store only deletes when `domain` and `path` match the scope the
/// cookie was set with; omitted attributes are omitted from the header.
#[must_use]
pub fn expiry_set_cookie(name: &str, domain: Option<&str>, path: Option<&str>) -> String {
    let mut header = format!("{name}=");
    if let Some(domain) = domain {
        header.push_str("; Domain=");
        header.push_str(domain);
    }
    if let Some(path) = path {
        header.push_str("; Path=");
        header.push_str(path);
    }
    header.push_str("; Expires=");
    header.push_str(&CookieExpiration::epoch().to_expires_string());
    header
}

/// Expiry headers written to log a SharePoint site out.
///
/// Each scope is one the auth cookies have been observed under; the list is
/// fixed rather than derived because the store matches scopes exactly.
#[must_use]
pub fn site_expiry_headers(site: &str) -> Vec<String> {
    let host = format!("{site}.{SHAREPOINT_DOMAIN}");
    let dotted_host = format!(".{host}");
    let dotted_parent = format!(".{SHAREPOINT_DOMAIN}");

    vec![
        expiry_set_cookie(FED_AUTH, Some(&host), Some("/")),
        expiry_set_cookie(FED_AUTH, Some(&dotted_host), Some("/")),
        expiry_set_cookie(FED_AUTH, Some(SHAREPOINT_DOMAIN), Some("/")),
        expiry_set_cookie(FED_AUTH, Some(&dotted_parent), Some("/")),
        expiry_set_cookie(FED_AUTH, None, None),
        expiry_set_cookie(RT_FA, Some(SHAREPOINT_DOMAIN), Some("/")),
    ]
}
