//! `expires` command: print a cookie Expires attribute value.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Result, bail};
use spcookie_core::CookieExpiration;

use crate::cli::ExpiresArgs;

pub fn run_expires_command(args: &ExpiresArgs) -> Result<()> {
    println!("{}", expiration_for(args)?.to_expires_string());
    Ok(())
}

fn expiration_for(args: &ExpiresArgs) -> Result<CookieExpiration> {
    if let Some(days) = args.days {
        return Ok(CookieExpiration::days(days));
    }
    if let Some(millis) = args.millis {
        return Ok(CookieExpiration::milliseconds(millis));
    }
    let at = args
        .unix
        .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs)));
    if args.unix.is_some() && at.is_none() {
        bail!("--unix value is out of range");
    }
    Ok(CookieExpiration::date(at)?)
}
