//! Netscape cookie file interchange for [`MemoryCookieJar`].
//!
//! One cookie per line, seven TAB-separated columns, as written by curl and
//! the browser export extensions. A `#HttpOnly_` line prefix marks an
//! HttpOnly cookie; any other line starting with `#` is a comment.

use std::fmt;
use std::io::{BufRead, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cookie::{Cookie as RawCookie, Expiration};
use cookie_store::{Cookie as StoreCookie, CookieDomain, CookieExpiration as StoreExpiration};
use tracing::{debug, instrument, warn};
use url::Url;

use super::MemoryCookieJar;

const FILE_HEADER: &str = "# Netscape HTTP Cookie File";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Latest expiry read or written: `Fri, 31 Dec 9999 23:59:59 GMT`.
const MAX_EXPIRES_SECS: u64 = 253_402_300_799;

/// One cookie row of a Netscape cookie file.
///
/// `Debug` never prints the value.
#[derive(Clone)]
pub struct CookieLine {
    /// Column 1, e.g. `.sharepoint.com` or `contoso.sharepoint.com`.
    pub domain: String,
    /// Column 2: `TRUE` when the cookie also applies to subdomains.
    pub tailmatch: bool,
    /// Column 3.
    pub path: String,
    /// Column 4: HTTPS only.
    pub secure: bool,
    /// Set from the `#HttpOnly_` prefix.
    pub http_only: bool,
    /// Column 5: Unix seconds, `0` for a session cookie.
    pub expires: u64,
    /// Column 6.
    pub name: String,
    value: String,
}

impl CookieLine {
    /// Creates a row; `http_only` starts unset.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            http_only: false,
            expires,
            name,
            value,
        }
    }

    /// Sets the HttpOnly flag.
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Column 7. Do not log it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_expired_at(&self, now: SystemTime) -> bool {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_secs());
        self.expires != 0 && self.expires <= now_secs
    }

    fn to_line(&self) -> String {
        let prefix = if self.http_only { HTTP_ONLY_PREFIX } else { "" };
        let expires = self.expires.to_string();
        let columns = [
            self.domain.as_str(),
            flag(self.tailmatch),
            self.path.as_str(),
            flag(self.secure),
            expires.as_str(),
            self.name.as_str(),
            self.value.as_str(),
        ];
        format!("{prefix}{}", columns.join("\t"))
    }

    /// Snapshot of a jar cookie; `None` for cookies without a usable domain.
    fn from_store_cookie(cookie: &StoreCookie<'_>) -> Option<Self> {
        let (domain, tailmatch) = match &cookie.domain {
            CookieDomain::HostOnly(host) => (host.clone(), false),
            CookieDomain::Suffix(suffix) => (format!(".{suffix}"), true),
            _ => return None,
        };
        let expires = match &cookie.expires {
            StoreExpiration::AtUtc(at) => SystemTime::from(*at)
                .duration_since(UNIX_EPOCH)
                .map_or(0, |since| since.as_secs().max(1)),
            StoreExpiration::SessionEnd => 0,
        };

        Some(Self {
            domain,
            tailmatch,
            path: String::from(&cookie.path),
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
            expires,
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
        })
    }

    /// The row as a `Set-Cookie` plus the URL it is applied from.
    fn to_raw_cookie(&self) -> Result<(RawCookie<'static>, Url), String> {
        let host = self.domain.trim_start_matches('.');
        let origin =
            Url::parse(&format!("https://{host}/")).map_err(|error| error.to_string())?;

        let mut cookie = RawCookie::new(self.name.clone(), self.value.clone());
        if self.tailmatch {
            cookie.set_domain(host.to_string());
        }
        cookie.set_path(self.path.clone());
        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);
        if self.expires != 0 {
            let at = UNIX_EPOCH + Duration::from_secs(self.expires.min(MAX_EXPIRES_SECS));
            cookie.set_expires(Expiration::DateTime(at.into()));
        }
        Ok((cookie, origin))
    }
}

impl fmt::Debug for CookieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLine")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Cookie file read/write failures.
#[derive(Debug, thiserror::Error)]
pub enum CookieFileError {
    /// A row could not be parsed.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based.
        line_number: usize,
        /// The row with its value column replaced by `[REDACTED]`.
        content: String,
        /// What was wrong with it.
        reason: String,
    },

    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Every non-comment row was malformed.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Rows rejected.
        malformed_count: usize,
    },
}

/// Rows read from a cookie file plus `(line number, reason)` for each row
/// that was skipped.
#[derive(Debug)]
pub struct ParseResult {
    /// Parsed rows, in file order.
    pub cookies: Vec<CookieLine>,
    /// Skipped rows.
    pub warnings: Vec<(usize, String)>,
}

/// Reads a Netscape cookie file.
///
/// Malformed rows are skipped and reported in [`ParseResult::warnings`].
///
/// # Errors
///
/// [`CookieFileError::Io`] when reading fails, and
/// [`CookieFileError::NoCookiesFound`] when the file has rows but none parse.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieFileError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut rows = 0_usize;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (row, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };
        rows += 1;

        match parse_row(row, line_number) {
            Ok(cookie) => {
                debug!(line = line_number, domain = %cookie.domain, name = %cookie.name, "parsed cookie");
                cookies.push(cookie.with_http_only(http_only));
            }
            Err(error) => {
                warn!(line = line_number, reason = %error, "skipping malformed cookie line");
                warnings.push((line_number, error.to_string()));
            }
        }
    }

    if rows > 0 && cookies.is_empty() {
        return Err(CookieFileError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }
    Ok(ParseResult { cookies, warnings })
}

fn parse_row(row: &str, line_number: usize) -> Result<CookieLine, CookieFileError> {
    let invalid = |reason: String| CookieFileError::InvalidLine {
        line_number,
        content: redact_row(row),
        reason,
    };

    let columns: Vec<&str> = row.split('\t').collect();
    let [domain, tailmatch, path, secure, expires, name, value] = columns[..] else {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            columns.len()
        )));
    };

    let tailmatch = parse_flag(tailmatch).ok_or_else(|| {
        invalid(format!("tailmatch field must be TRUE or FALSE, got '{tailmatch}'"))
    })?;
    let secure = parse_flag(secure)
        .ok_or_else(|| invalid(format!("secure field must be TRUE or FALSE, got '{secure}'")))?;
    let expires = expires.parse::<u64>().map_err(|_| {
        invalid(format!(
            "expires field must be a non-negative integer, got '{expires}'"
        ))
    })?;
    if domain.is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }
    if name.is_empty() {
        return Err(invalid("cookie name field is empty".to_string()));
    }

    Ok(CookieLine::new(
        domain.to_string(),
        tailmatch,
        path.to_string(),
        secure,
        expires,
        name.to_string(),
        value.to_string(),
    ))
}

fn parse_flag(column: &str) -> Option<bool> {
    match column {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

fn flag(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// Replaces the value column so the row can go into an error message.
fn redact_row(row: &str) -> String {
    let columns: Vec<&str> = row.split('\t').collect();
    if columns.len() < 7 {
        return row.to_string();
    }
    format!("{}\t[REDACTED]", columns[..6].join("\t"))
}

impl MemoryCookieJar {
    /// Adds the cookies of a Netscape cookie file to the jar.
    ///
    /// Rows that have already expired are skipped. A row with the same name,
    /// domain and path as a stored cookie replaces it. The parse result is
    /// returned so callers can report the skipped rows.
    ///
    /// # Errors
    ///
    /// Propagates [`parse_netscape_cookies`] failures.
    #[instrument(level = "debug", skip(self, reader))]
    pub fn load_netscape(&self, reader: impl BufRead) -> Result<ParseResult, CookieFileError> {
        let parsed = parse_netscape_cookies(reader)?;
        let now = SystemTime::now();

        for line in &parsed.cookies {
            if line.is_expired_at(now) {
                debug!(domain = %line.domain, name = %line.name, "skipping expired cookie");
                continue;
            }
            match line.to_raw_cookie() {
                Ok((cookie, origin)) => self.apply(&cookie, &origin),
                Err(reason) => {
                    warn!(domain = %line.domain, name = %line.name, reason = %reason, "skipping cookie with unusable domain");
                }
            }
        }

        Ok(parsed)
    }

    /// Writes every unexpired cookie, header line first, and returns how
    /// many were written.
    ///
    /// # Errors
    ///
    /// Returns [`CookieFileError::Io`] when the writer fails.
    #[instrument(level = "debug", skip(self, writer))]
    pub fn write_netscape(&self, mut writer: impl Write) -> Result<usize, CookieFileError> {
        let lines: Vec<CookieLine> = self.with_store(|store| {
            store
                .iter_unexpired()
                .filter_map(|cookie| CookieLine::from_store_cookie(cookie))
                .collect()
        });

        writeln!(writer, "{FILE_HEADER}")?;
        for line in &lines {
            writeln!(writer, "{}", line.to_line())?;
        }
        writer.flush()?;

        debug!(count = lines.len(), "wrote cookie file");
        Ok(lines.len())
    }
}
