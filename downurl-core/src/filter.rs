//! Content filter — pre- and post-download admission control (spec.md §4.3).

/// Admission configuration. An empty allow-set means "no restriction"; a
/// non-empty allow-set means "must match one of these".
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub allow_extensions: Vec<String>,
    pub block_extensions: Vec<String>,
    pub allow_types: Vec<String>,
    pub block_types: Vec<String>,
    pub min_size: u64,
    pub max_size: u64,
    pub skip_empty: bool,
}

/// The result of an admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(String),
}

impl ContentFilter {
    /// Whether this filter has any restriction configured at all.
    pub fn is_configured(&self) -> bool {
        !self.allow_extensions.is_empty()
            || !self.block_extensions.is_empty()
            || !self.allow_types.is_empty()
            || !self.block_types.is_empty()
            || self.min_size > 0
            || self.max_size > 0
            || self.skip_empty
    }

    /// Decide admission from whatever of (extension, content_type, size) is known.
    pub fn admit(&self, extension: Option<&str>, content_type: Option<&str>, content_length: Option<u64>) -> Admission {
        if let Some(ext) = extension {
            let ext = normalize_extension(ext);
            if self.block_extensions.iter().any(|b| normalize_extension(b) == ext) {
                return Admission::Reject(format!("extension {ext} is blocked"));
            }
            if !self.allow_extensions.is_empty() && !self.allow_extensions.iter().any(|a| normalize_extension(a) == ext) {
                return Admission::Reject(format!("extension {ext} is not in the allow-list"));
            }
        }

        if let Some(ct) = content_type {
            let ct = normalize_content_type(ct);
            if self.block_types.iter().any(|p| content_type_matches(p, &ct)) {
                return Admission::Reject(format!("content type {ct} is blocked"));
            }
            if !self.allow_types.is_empty() && !self.allow_types.iter().any(|p| content_type_matches(p, &ct)) {
                return Admission::Reject(format!("content type {ct} is not in the allow-list"));
            }
        }

        if let Some(len) = content_length {
            if self.skip_empty && len == 0 {
                return Admission::Reject("empty body".to_string());
            }
            if len < self.min_size {
                return Admission::Reject(format!("size {len} is below the minimum {}", self.min_size));
            }
            if self.max_size > 0 && len > self.max_size {
                return Admission::Reject(format!("size {len} exceeds the maximum {}", self.max_size));
            }
        }

        Admission::Admit
    }
}

/// Lowercase, `.`-prefixed extension normalization (spec.md §3).
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Strip everything after the first `;` and lowercase (spec.md §3).
pub fn normalize_content_type(ct: &str) -> String {
    ct.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// `prefix/*` matches same first segment, `*/suffix` matches same second
/// segment, otherwise exact equality.
fn content_type_matches(pattern: &str, ct: &str) -> bool {
    let pattern = pattern.to_lowercase();
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return ct.split('/').next() == Some(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix("*/") {
        return ct.split('/').nth(1) == Some(suffix);
    }
    pattern == ct
}
