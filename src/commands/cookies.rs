//! Cookie command handlers: get, set, remove, remove-by-host and clear
//! against a Netscape cookie file.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use spcookie_core::{CookieSessionManager, MemoryCookieJar};
use tracing::{debug, info, warn};

use crate::cli::Command;

use super::run_expires_command;

/// Loads `cookie_file`, runs `command` against it, and writes the file back
/// when the command changed cookies.
pub async fn run_cookie_command(command: &Command, cookie_file: &Path) -> Result<()> {
    let jar = Arc::new(MemoryCookieJar::new());
    load_cookie_file(&jar, cookie_file)?;
    let manager = CookieSessionManager::new(jar.clone());

    let changed = match command {
        Command::Get(args) => {
            let cookies = manager.get(&args.url).await?;
            print_cookies(&cookies, args.json)?;
            false
        }
        Command::Set(args) => {
            manager.set(&args.url, &args.set_cookie).await?;
            info!(url = %args.url, "stored Set-Cookie header");
            true
        }
        Command::Remove(args) => {
            manager.remove(&args.site).await?;
            true
        }
        Command::RemoveByHost(args) => {
            let had_cookies = manager.remove_by_host(&args.host).await?;
            println!("{had_cookies}");
            true
        }
        Command::Clear => {
            manager.clear_cookies().await?;
            true
        }
        Command::Expires(args) => {
            run_expires_command(args)?;
            false
        }
    };

    if changed {
        save_cookie_file(&jar, cookie_file)?;
    }
    Ok(())
}

fn print_cookies(cookies: &BTreeMap<String, String>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(cookies)?);
    } else {
        for (name, value) in cookies {
            println!("{name}={value}");
        }
    }
    Ok(())
}

fn load_cookie_file(jar: &MemoryCookieJar, path: &Path) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "cookie file does not exist yet; starting empty");
        return Ok(());
    }

    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open cookie file '{}'", path.display()))?;
    let parsed = jar
        .load_netscape(BufReader::new(file))
        .with_context(|| format!("Failed to parse cookie file '{}'", path.display()))?;

    for (line_num, reason) in &parsed.warnings {
        warn!(line = line_num, reason = %reason, "Skipping malformed cookie line");
    }
    debug!(
        path = %path.display(),
        parsed = parsed.cookies.len(),
        live = jar.len(),
        "Loaded cookie file"
    );
    Ok(())
}

fn save_cookie_file(jar: &MemoryCookieJar, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    // Write next to the target and rename over it, so a failed write leaves
    // the previous file intact.
    let tmp_path = temp_path_for(path);
    let written = match write_cookie_file(jar, &tmp_path) {
        Ok(written) => written,
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
    };
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Cannot replace cookie file '{}' with '{}'",
            path.display(),
            tmp_path.display()
        )
    })?;

    debug!(path = %path.display(), cookies = written, "Saved cookie file");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_cookie_file(jar: &MemoryCookieJar, tmp_path: &Path) -> Result<usize> {
    let file = open_private(tmp_path)
        .with_context(|| format!("Cannot write cookie file '{}'", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    let written = jar
        .write_netscape(&mut writer)
        .with_context(|| format!("Failed to write cookie file '{}'", tmp_path.display()))?;
    writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("Failed to flush cookie file '{}'", tmp_path.display()))?;
    Ok(written)
}

/// Cookie files hold session tokens: owner read/write only.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}
