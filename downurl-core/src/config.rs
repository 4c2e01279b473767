//! Config loader (SPEC_FULL.md §4.12) — an INI-style `.downurlrc`, discovered
//! from the current directory or `$HOME`, merged under CLI flags > file >
//! built-in defaults.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-host auth override from an `[auth.<host>]` section.
#[derive(Debug, Clone, Default)]
pub struct HostAuthConfig {
    pub bearer: Option<String>,
    pub basic_user: Option<String>,
    pub basic_pass: Option<String>,
}

/// Everything a `.downurlrc` file can set. Every field is optional so the
/// merge step can tell "not present in file" from "explicitly false/zero".
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub workers: Option<usize>,
    pub rate_limit: Option<String>,
    pub storage: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub allow_extensions: Vec<String>,
    pub block_extensions: Vec<String>,
    pub allow_types: Vec<String>,
    pub block_types: Vec<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub skip_empty: Option<bool>,
    pub per_host_auth: HashMap<String, HostAuthConfig>,
}

/// Look for `./.downurlrc` first, then `$HOME/.downurlrc`.
pub fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(".downurlrc");
    if local.is_file() {
        return Some(local);
    }
    if let Ok(home) = std::env::var("HOME") {
        let candidate = Path::new(&home).join(".downurlrc");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

pub fn load(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse INI-style content: `[section]` headers, `key = value` pairs,
/// `#`/`;`-prefixed comments, and `${VAR}` environment expansion in values.
pub fn parse(content: &str) -> Result<ConfigFile> {
    let mut file = ConfigFile::default();
    let mut section = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(stripped) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = stripped.trim().to_lowercase();
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::Config(format!("malformed line: {raw_line}")));
        };
        let key = key.trim().to_lowercase();
        let value = expand_env(value.trim());

        apply_entry(&mut file, &section, &key, &value)?;
    }

    Ok(file)
}

fn apply_entry(file: &mut ConfigFile, section: &str, key: &str, value: &str) -> Result<()> {
    if let Some(host) = section.strip_prefix("auth.") {
        let entry = file.per_host_auth.entry(host.to_string()).or_default();
        match key {
            "bearer" => entry.bearer = Some(value.to_string()),
            "basic_user" => entry.basic_user = Some(value.to_string()),
            "basic_pass" => entry.basic_pass = Some(value.to_string()),
            other => return Err(Error::Config(format!("unknown key in [auth.{host}]: {other}"))),
        }
        return Ok(());
    }

    match (section, key) {
        ("defaults", "workers") => file.workers = Some(parse_usize(value)?),
        ("defaults", "storage") => file.storage = Some(value.to_string()),
        ("defaults", "base_dir") => file.base_dir = Some(PathBuf::from(value)),
        ("defaults", "max_retries") => file.max_retries = Some(parse_usize(value)? as u32),
        ("defaults", "timeout_secs") => file.timeout_secs = Some(parse_usize(value)? as u64),
        ("ratelimit", "rate") => file.rate_limit = Some(value.to_string()),
        ("filters", "allow_extensions") => file.allow_extensions = split_list(value),
        ("filters", "block_extensions") => file.block_extensions = split_list(value),
        ("filters", "allow_types") => file.allow_types = split_list(value),
        ("filters", "block_types") => file.block_types = split_list(value),
        ("filters", "min_size") => file.min_size = Some(parse_size(value)?),
        ("filters", "max_size") => file.max_size = Some(parse_size(value)?),
        ("filters", "skip_empty") => file.skip_empty = Some(parse_bool(value)?),
        (section, key) => return Err(Error::Config(format!("unknown key [{section}] {key}"))),
    }

    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_usize(value: &str) -> Result<usize> {
    value.parse().map_err(|_| Error::Config(format!("expected an integer, got {value}")))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(Error::Config(format!("expected a boolean, got {other}"))),
    }
}

/// Parse `N`, `NKB`, `NMB`, `NGB` (case-insensitive) into a byte count.
pub fn parse_size(value: &str) -> Result<u64> {
    let value = value.trim();
    let (digits, multiplier) = if let Some(d) = value.to_uppercase().strip_suffix("GB") {
        (d.to_string(), 1024 * 1024 * 1024)
    } else if let Some(d) = value.to_uppercase().strip_suffix("MB") {
        (d.to_string(), 1024 * 1024)
    } else if let Some(d) = value.to_uppercase().strip_suffix("KB") {
        (d.to_string(), 1024)
    } else {
        (value.to_string(), 1)
    };

    let n: u64 = digits.trim().parse().map_err(|_| Error::Config(format!("invalid size: {value}")))?;
    Ok(n * multiplier)
}

/// Expand `${VAR}` references against the process environment. Unknown
/// variables expand to an empty string rather than erroring.
fn expand_env(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            out.push_str(&std::env::var(&name).unwrap_or_default());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults_and_filters() {
        let content = "[defaults]\nworkers = 8\nstorage = host\n\n[filters]\nblock_extensions = .exe, .dll\nmax_size = 10MB\nskip_empty = true\n";
        let file = parse(content).unwrap();
        assert_eq!(file.workers, Some(8));
        assert_eq!(file.storage.as_deref(), Some("host"));
        assert_eq!(file.block_extensions, vec![".exe".to_string(), ".dll".to_string()]);
        assert_eq!(file.max_size, Some(10 * 1024 * 1024));
        assert_eq!(file.skip_empty, Some(true));
    }

    #[test]
    fn parses_per_host_auth_section() {
        let content = "[auth.api.example.test]\nbearer = abc123\n";
        let file = parse(content).unwrap();
        let entry = file.per_host_auth.get("api.example.test").unwrap();
        assert_eq!(entry.bearer.as_deref(), Some("abc123"));
    }

    #[test]
    fn expands_environment_variables() {
        std::env::set_var("DOWNURL_TEST_TOKEN", "secret-value");
        let content = "[auth.api.example.test]\nbearer = ${DOWNURL_TEST_TOKEN}\n";
        let file = parse(content).unwrap();
        assert_eq!(file.per_host_auth.get("api.example.test").unwrap().bearer.as_deref(), Some("secret-value"));
        std::env::remove_var("DOWNURL_TEST_TOKEN");
    }

    #[test]
    fn rejects_malformed_line() {
        let content = "[defaults]\nthis is not a key value pair\n";
        assert!(parse(content).is_err());
    }

    #[test]
    fn parses_size_suffixes() {
        assert_eq!(parse_size("100").unwrap(), 100);
        assert_eq!(parse_size("4KB").unwrap(), 4096);
        assert_eq!(parse_size("2MB").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
    }
}
