//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

const APP_DIR: &str = "spcookie";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_COOKIE_FILE_NAME: &str = "cookies.txt";

/// TOML-backed file configuration for spcookie defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Default cookie file.
    pub cookie_file: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Tracing filter level for this setting.
    #[must_use]
    pub fn filter_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves the per-user app directory.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/spcookie`
/// 2. `$HOME/.config/spcookie`
#[must_use]
pub fn resolve_app_dir() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(PathBuf::from(home).join(".config").join(APP_DIR))
}

/// Resolves default config path (`<app dir>/config.toml`).
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_app_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Picks the cookie file: CLI flag, then config, then `<app dir>/cookies.txt`.
pub fn resolve_cookie_file(
    cli_value: Option<&Path>,
    config: Option<&FileConfig>,
) -> Result<PathBuf> {
    if let Some(path) = cli_value {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = config.and_then(|cfg| cfg.cookie_file.as_ref()) {
        return Ok(path.clone());
    }
    match resolve_app_dir() {
        Some(dir) => Ok(dir.join(DEFAULT_COOKIE_FILE_NAME)),
        None => bail!(
            "Unable to determine cookie file location (set XDG_CONFIG_HOME or HOME, or pass --cookie-file)"
        ),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "cookie_file" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `cookie_file` value on line {}", line_index + 1)
                })?;
                if parsed.trim().is_empty() {
                    bail!("Invalid `cookie_file` value on line {}: empty path", line_index + 1);
                }
                cfg.cookie_file = Some(PathBuf::from(parsed));
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `verbosity` value on line {}", line_index + 1)
                })?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!(
                        "Invalid `verbosity` value '{}' on line {}",
                        parsed,
                        line_index + 1
                    )
                })?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            "# spcookie defaults\ncookie_file = \"/tmp/jar.txt\"\nverbosity = \"quiet\" # keep it down\n",
        )
        .unwrap();
        assert_eq!(cfg.cookie_file, Some(PathBuf::from("/tmp/jar.txt")));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_empty_is_default() {
        let cfg = parse_config_str("\n# nothing here\n").unwrap();
        assert!(cfg.cookie_file.is_none());
        assert!(cfg.verbosity.is_none());
    }

    #[test]
    fn test_parse_config_hash_inside_string_is_kept() {
        let cfg = parse_config_str("cookie_file = \"/tmp/a#b.txt\"").unwrap();
        assert_eq!(cfg.cookie_file, Some(PathBuf::from("/tmp/a#b.txt")));
    }

    #[test]
    fn test_parse_config_unknown_key_reports_line() {
        let err = parse_config_str("verbosity = \"debug\"\nconcurrency = 4\n").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Unknown configuration key: 'concurrency' on line 2"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("cookie_file = /tmp/jar.txt").unwrap_err();
        assert!(format!("{err:#}").contains("Expected double-quoted string"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_verbosity() {
        assert!(parse_config_str("verbosity = \"loud\"").is_err());
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("cookie_file").unwrap_err();
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_resolve_cookie_file_prefers_cli_then_config() {
        let cfg = FileConfig {
            cookie_file: Some(PathBuf::from("/from/config.txt")),
            verbosity: None,
        };
        assert_eq!(
            resolve_cookie_file(Some(Path::new("/from/cli.txt")), Some(&cfg)).unwrap(),
            PathBuf::from("/from/cli.txt")
        );
        assert_eq!(
            resolve_cookie_file(None, Some(&cfg)).unwrap(),
            PathBuf::from("/from/config.txt")
        );
    }

    #[test]
    fn test_verbosity_filter_levels() {
        assert_eq!(VerbositySetting::Default.filter_level(), "info");
        assert_eq!(VerbositySetting::Verbose.filter_level(), "debug");
        assert_eq!(VerbositySetting::Quiet.filter_level(), "error");
        assert_eq!(VerbositySetting::Debug.filter_level(), "trace");
    }
}
