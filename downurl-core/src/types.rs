use std::time::Duration;

/// A job dispatched to a worker: one input URL plus its position in the
/// original input order.
#[derive(Debug, Clone)]
pub struct Job {
    pub index: usize,
    pub url: String,
}

/// The outcome of downloading a single URL.
///
/// Invariant (spec.md §3): `paths` is non-empty iff `errors` is empty.
#[derive(Debug, Clone, Default)]
pub struct DownloadResult {
    pub url: String,
    pub host: String,
    pub paths: Vec<std::path::PathBuf>,
    pub errors: Vec<String>,
    pub duration: Duration,
    pub content_type: Option<String>,
}

impl DownloadResult {
    pub fn success(url: String, host: String, paths: Vec<std::path::PathBuf>, duration: Duration) -> Self {
        Self { url, host, paths, errors: Vec::new(), duration, content_type: None }
    }

    pub fn success_with_content_type(
        url: String,
        host: String,
        paths: Vec<std::path::PathBuf>,
        duration: Duration,
        content_type: Option<String>,
    ) -> Self {
        Self { url, host, paths, errors: Vec::new(), duration, content_type }
    }

    pub fn failure(url: String, host: String, error: String, duration: Duration) -> Self {
        Self { url, host, paths: Vec::new(), errors: vec![error], duration, content_type: None }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.paths.is_empty()
    }
}
