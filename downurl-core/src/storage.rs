//! Storage strategy — the filesystem placement engine (spec.md §4.4).
//!
//! Each strategy is a pure function tagged by a variant rather than a trait
//! object: all five take identical `(base_dir, host, url_path, filename)`
//! inputs, so there is nothing an interface would buy beyond an enum match.
//! `sanitize` is the CORE security invariant of the whole crate — every path
//! component that ever reaches the filesystem passes through it first.

use chrono::Local;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// One of the five on-disk organization modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    Flat,
    Path,
    Host,
    Type,
    Dated,
}

impl std::str::FromStr for StorageStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(StorageStrategy::Flat),
            "path" => Ok(StorageStrategy::Path),
            "host" => Ok(StorageStrategy::Host),
            "type" => Ok(StorageStrategy::Type),
            "dated" => Ok(StorageStrategy::Dated),
            other => Err(format!("invalid storage mode: {other}")),
        }
    }
}

impl StorageStrategy {
    /// Compute `(directory, final_filename)` for this strategy.
    ///
    /// Every returned directory is guaranteed to be a descendant of
    /// `base_dir` after sanitization — this is load-bearing for the
    /// path-traversal test suite in spec.md §8.
    pub fn place(&self, base_dir: &Path, host: &str, url_path: &str, filename: &str) -> (PathBuf, String) {
        let safe_host = sanitize(host);
        let safe_filename = sanitize_filename_component(filename);

        match self {
            StorageStrategy::Flat => (base_dir.to_path_buf(), safe_filename),
            StorageStrategy::Path => {
                let cleaned = clean_url_path(url_path, &safe_filename);
                let dir = if cleaned.is_empty() {
                    base_dir.join(&safe_host)
                } else {
                    base_dir.join(&safe_host).join(cleaned)
                };
                (dir, safe_filename)
            }
            StorageStrategy::Host => (base_dir.join(&safe_host), safe_filename),
            StorageStrategy::Type => {
                let ext = extension_or_unknown(&safe_filename);
                let dir = base_dir.join(ext);
                (dir, format!("{safe_host}_{safe_filename}"))
            }
            StorageStrategy::Dated => {
                let today = Local::now().format("%Y-%m-%d").to_string();
                let dir = base_dir.join(today);
                (dir, format!("{safe_host}_{safe_filename}"))
            }
        }
    }
}

fn extension_or_unknown(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Clean the URL-path portion used by the `path` strategy: strip leading
/// `../` sequences repeatedly, sanitize each remaining component, and drop
/// the trailing segment if it equals the (already-sanitized) filename, to
/// avoid doubling it onto the final path.
fn clean_url_path(url_path: &str, sanitized_filename: &str) -> PathBuf {
    let mut s = url_path;
    loop {
        let stripped = s.strip_prefix("../").or_else(|| s.strip_prefix("..\\"));
        match stripped {
            Some(rest) => s = rest,
            None => break,
        }
    }

    let mut components: Vec<String> = s
        .split(['/', '\\'])
        .map(sanitize)
        .filter(|c| !c.is_empty() && c != "unknown")
        .collect();

    if components.last().map(String::as_str) == Some(sanitized_filename) {
        components.pop();
    }

    components.iter().collect()
}

/// The CORE defense: strip NUL bytes, trim, eliminate every occurrence of
/// `..`, normalize backslashes to forward slashes, strip leading separators,
/// and map empty/`.`/traversal-only input to `"unknown"`.
pub fn sanitize(component: &str) -> String {
    let no_nul: String = component.chars().filter(|&c| c != '\0').collect();
    let normalized = no_nul.trim().replace('\\', "/");

    let cleaned: String = normalized
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("_");

    let trimmed = cleaned.trim_start_matches(['/', '_']).to_string();

    if trimmed.is_empty() || trimmed == "." {
        "unknown".to_string()
    } else {
        trimmed
    }
}

fn sanitize_filename_component(filename: &str) -> String {
    sanitize(filename)
}

/// Derive a filesystem-safe filename from a URL (spec.md §4.4).
///
/// Replaces every character outside `[A-Za-z0-9._-]` with `_`. If the last
/// path segment is empty, `.`, `/`, or has no `.`, synthesizes a name from
/// the first 10 hex characters of SHA-1(url) plus a content-sniffed
/// extension. Not a security property (spec.md §9) — purely disambiguation.
pub fn url_to_filename(url: &str) -> String {
    let parsed = url::Url::parse(url).ok();
    let last_segment = parsed
        .as_ref()
        .and_then(|u| u.path_segments())
        .and_then(|mut segs| segs.next_back())
        .unwrap_or("");

    let needs_synthesis = last_segment.is_empty() || last_segment == "." || last_segment == "/" || !last_segment.contains('.');

    if needs_synthesis {
        synthesize_filename(url)
    } else {
        last_segment
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect()
    }
}

fn synthesize_filename(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let short = &hex[..10.min(hex.len())];

    let ext = sniff_extension(url);
    format!("{short}{ext}")
}

fn sniff_extension(url: &str) -> &'static str {
    let last_segment = url::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|segs| segs.filter(|s| !s.is_empty()).next_back().map(str::to_string)))
        .unwrap_or_default();
    let lower = last_segment.to_lowercase();
    if lower.ends_with(".js") || lower.ends_with(".mjs") {
        ".js"
    } else if lower.ends_with(".css") {
        ".css"
    } else if lower.ends_with(".json") {
        ".json"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_nul_and_traversal() {
        assert_eq!(sanitize("..\0/../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize(""), "unknown");
        assert_eq!(sanitize("."), "unknown");
        assert_eq!(sanitize(".."), "unknown");
        assert_eq!(sanitize("normal-host.com"), "normal-host.com");
    }

    #[test]
    fn sanitize_normalizes_backslashes() {
        assert_eq!(sanitize("a\\b\\c"), "a_b_c");
    }

    #[test]
    fn flat_strategy_places_directly_in_base() {
        let base = Path::new("/base");
        let (dir, name) = StorageStrategy::Flat.place(base, "a.test", "/x/y.js", "y.js");
        assert_eq!(dir, base);
        assert_eq!(name, "y.js");
    }

    #[test]
    fn host_strategy_places_under_sanitized_host() {
        let base = Path::new("/base");
        let (dir, _) = StorageStrategy::Host.place(base, "a.test", "/x", "f.txt");
        assert_eq!(dir, base.join("a.test"));
    }

    #[test]
    fn path_strategy_never_escapes_base_even_with_traversal() {
        let base = Path::new("/base");
        let (dir, name) = StorageStrategy::Path.place(base, "a.test", "/../../../etc/passwd", "passwd");
        assert!(dir.starts_with(base));
        assert!(!dir.to_string_lossy().contains(".."));
        assert_eq!(name, "passwd");
    }

    #[test]
    fn path_strategy_drops_trailing_filename_duplicate() {
        let base = Path::new("/base");
        let (dir, name) = StorageStrategy::Path.place(base, "a.test", "/blog/post/y.js", "y.js");
        assert_eq!(dir, base.join("a.test").join("blog").join("post"));
        assert_eq!(name, "y.js");
    }

    #[test]
    fn type_strategy_uses_extension_and_host_prefixed_name() {
        let base = Path::new("/base");
        let (dir, name) = StorageStrategy::Type.place(base, "a.test", "/x", "y.js");
        assert_eq!(dir, base.join("js"));
        assert_eq!(name, "a.test_y.js");
    }

    #[test]
    fn type_strategy_unknown_extension() {
        let base = Path::new("/base");
        let (dir, _) = StorageStrategy::Type.place(base, "a.test", "/x", "noext");
        assert_eq!(dir, base.join("unknown"));
    }

    #[test]
    fn adversarial_components_never_escape_base() {
        let base = Path::new("/base");
        let adversarial_hosts = [
            "../../etc",
            "..",
            "a/../../b",
            "\0\0\0",
            "a\\..\\..\\b",
            &"x".repeat(5000),
        ];
        for strategy in [
            StorageStrategy::Flat,
            StorageStrategy::Path,
            StorageStrategy::Host,
            StorageStrategy::Type,
            StorageStrategy::Dated,
        ] {
            for host in adversarial_hosts {
                let (dir, name) = strategy.place(base, host, "/../../x", "../../evil");
                assert!(dir.starts_with(base), "{strategy:?} with host {host:?} escaped base: {dir:?}");
                assert!(!name.contains(".."), "{strategy:?} produced traversal in filename: {name}");
            }
        }
    }

    #[test]
    fn url_to_filename_is_deterministic_and_safe_charset() {
        let a = url_to_filename("https://example.test/a/b/c.js?x=1");
        let b = url_to_filename("https://example.test/a/b/c.js?x=1");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
    }

    #[test]
    fn url_to_filename_synthesizes_for_extensionless_paths() {
        let name = url_to_filename("https://example.test/download/");
        assert_eq!(name.len(), 10);
    }

    #[test]
    fn url_to_filename_sniffs_js_extension() {
        let name = url_to_filename("https://example.test/app.js/");
        assert!(name.ends_with(".js"));
    }
}
