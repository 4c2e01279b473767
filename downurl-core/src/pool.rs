//! Worker pool / dispatcher (spec.md §4.6) — the concurrency core tying the
//! rate limiter, HTTP client, content filter, storage strategy, and
//! filesystem sink together into one per-job pipeline.

use crate::client::HttpClient;
use crate::filter::{normalize_extension, Admission, ContentFilter};
use crate::ratelimit::RateLimiter;
use crate::sink::FilesystemSink;
use crate::storage::{url_to_filename, StorageStrategy};
use crate::types::{DownloadResult, Job};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub channel_capacity: usize,
    pub base_dir: PathBuf,
    pub storage: StorageStrategy,
    pub filter: ContentFilter,
    pub head_precheck: bool,
}

/// Invoked after every completed job with `(completed, total)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct Pool {
    client: Arc<HttpClient>,
    sink: Arc<FilesystemSink>,
    limiter: RateLimiter,
    config: PoolConfig,
}

impl Pool {
    pub fn new(client: HttpClient, limiter: RateLimiter, config: PoolConfig) -> Self {
        Pool { client: Arc::new(client), sink: Arc::new(FilesystemSink::new()), limiter, config }
    }

    /// Run every job to completion (or until `cancelled` fires) and return
    /// exactly one `DownloadResult` per input job, in job order.
    pub async fn run(&self, jobs: Vec<Job>, cancelled: CancellationToken, progress: Option<ProgressCallback>) -> Vec<DownloadResult> {
        let total = jobs.len();
        let job_urls: Vec<String> = jobs.iter().map(|j| j.url.clone()).collect();
        let results: Arc<tokio::sync::Mutex<Vec<Option<DownloadResult>>>> = Arc::new(tokio::sync::Mutex::new(vec![None; total]));
        let completed = Arc::new(AtomicUsize::new(0));

        let (tx, rx) = tokio::sync::mpsc::channel::<Job>(self.config.channel_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let producer_cancel = cancelled.clone();
        let producer = tokio::spawn(async move {
            for job in jobs {
                tokio::select! {
                    send_result = tx.send(job) => {
                        if send_result.is_err() {
                            break;
                        }
                    }
                    _ = producer_cancel.cancelled() => break,
                }
            }
        });

        let mut handles = Vec::with_capacity(self.config.workers);
        for _ in 0..self.config.workers.max(1) {
            let rx = rx.clone();
            let results = results.clone();
            let completed = completed.clone();
            let progress = progress.clone();
            let cancelled = cancelled.clone();
            let pool = self.clone_handles();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };

                    let Some(job) = job else { break };

                    let result = pool.process(&job, &cancelled).await;
                    {
                        let mut results = results.lock().await;
                        results[job.index] = Some(result);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref cb) = progress {
                        cb(done, total);
                    }
                }
            }));
        }

        let _ = producer.await;
        for h in handles {
            let _ = h.await;
        }

        let mut guard = results.lock().await;
        guard
            .drain(..)
            .enumerate()
            .map(|(i, r)| r.unwrap_or_else(|| synthesize_cancelled(&job_urls[i])))
            .collect()
    }

    fn clone_handles(&self) -> PoolHandles {
        PoolHandles { client: self.client.clone(), sink: self.sink.clone(), limiter: self.limiter.clone(), config: self.config.clone() }
    }
}

/// Per-worker handle: cheap clones of the shared client/sink/limiter plus the
/// pool's static configuration.
#[derive(Clone)]
struct PoolHandles {
    client: Arc<HttpClient>,
    sink: Arc<FilesystemSink>,
    limiter: RateLimiter,
    config: PoolConfig,
}

impl PoolHandles {
    async fn process(&self, job: &Job, cancelled: &CancellationToken) -> DownloadResult {
        let start = Instant::now();

        if cancelled.is_cancelled() {
            return DownloadResult::failure(job.url.clone(), host_of(&job.url), "download cancelled by user".to_string(), start.elapsed());
        }

        self.limiter.wait(cancelled).await;

        if cancelled.is_cancelled() {
            return DownloadResult::failure(job.url.clone(), host_of(&job.url), "download cancelled by user".to_string(), start.elapsed());
        }

        let host = host_of(&job.url);
        let url_path = url::Url::parse(&job.url).map(|u| u.path().to_string()).unwrap_or_default();

        if self.config.head_precheck && self.config.filter.is_configured() {
            if let Ok((_status, content_type, content_length)) = self.client.head(&job.url).await {
                let extension = content_type.as_deref().map(extension_hint_from_type);
                if let Admission::Reject(reason) = self.config.filter.admit(extension.as_deref(), content_type.as_deref(), content_length) {
                    return DownloadResult::failure(job.url.clone(), host, reason, start.elapsed());
                }
            }
        }

        let body = match self.client.get(&job.url, cancelled).await {
            Ok(body) => body,
            Err(e) => return DownloadResult::failure(job.url.clone(), host, e.to_string(), start.elapsed()),
        };

        let filename = url_to_filename(&job.url);
        let extension = Path::new(&filename).extension().and_then(|e| e.to_str()).map(normalize_extension);

        if let Admission::Reject(reason) =
            self.config.filter.admit(extension.as_deref(), body.content_type.as_deref(), Some(body.bytes.len() as u64))
        {
            return DownloadResult::failure(job.url.clone(), host, reason, start.elapsed());
        }

        let (dir, final_name) = self.config.storage.place(&self.config.base_dir, &host, &url_path, &filename);

        match self.sink.write(&dir, &final_name, body.bytes.as_ref()).await {
            Ok((path, _written)) => {
                DownloadResult::success_with_content_type(job.url.clone(), host, vec![path], start.elapsed(), body.content_type)
            }
            Err(e) => DownloadResult::failure(job.url.clone(), host, e.to_string(), start.elapsed()),
        }
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default()
}

fn extension_hint_from_type(content_type: &str) -> String {
    crate::filter::normalize_content_type(content_type).split('/').next_back().unwrap_or("").to_string()
}

fn synthesize_cancelled(url: &str) -> DownloadResult {
    DownloadResult::failure(url.to_string(), host_of(url), "download cancelled by user".to_string(), std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthProfileBuilder;
    use crate::client::ClientConfig;

    fn make_pool(base_dir: PathBuf, workers: usize) -> Pool {
        let auth = AuthProfileBuilder::new().build().unwrap();
        let client = HttpClient::new(auth, ClientConfig::default()).unwrap();
        let limiter = RateLimiter::unlimited();
        let config = PoolConfig {
            workers,
            channel_capacity: 4,
            base_dir,
            storage: StorageStrategy::Flat,
            filter: ContentFilter::default(),
            head_precheck: false,
        };
        Pool::new(client, limiter, config)
    }

    #[tokio::test]
    async fn downloads_every_job_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/a").with_status(200).with_body("aaa").create_async().await;
        let _m2 = server.mock("GET", "/b").with_status(200).with_body("bbb").create_async().await;

        let dir = tempfile::tempdir().unwrap();
        let pool = make_pool(dir.path().to_path_buf(), 2);

        let jobs = vec![
            Job { index: 0, url: format!("{}/a", server.url()) },
            Job { index: 1, url: format!("{}/b", server.url()) },
        ];

        let results = pool.run(jobs, CancellationToken::new(), None).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[tokio::test]
    async fn cancelled_before_start_yields_synthetic_failures() {
        let dir = tempfile::tempdir().unwrap();
        let pool = make_pool(dir.path().to_path_buf(), 2);
        let token = CancellationToken::new();
        token.cancel();

        let jobs = vec![Job { index: 0, url: "https://example.test/x".to_string() }];
        let results = pool.run(jobs, token, None).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_success());
        assert_eq!(results[0].errors[0], "download cancelled by user");
    }
}
