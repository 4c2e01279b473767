//! # downurl-core
//!
//! A concurrent URL downloader and post-download security recon engine.
//!
//! This library provides:
//! - A worker pool that downloads a list of URLs under a shared rate limit
//! - Pluggable auth (bearer/basic/custom header, header/cookie files)
//! - Five on-disk storage strategies, all traversal-safe by construction
//! - Content filtering by extension, content-type, and size
//! - A secret scanner and an API endpoint scanner over downloaded JavaScript
//! - A JSON/text/CSV/Markdown report aggregator
//!
//! ## Example
//!
//! ```no_run
//! use downurl_core::{AuthProfileBuilder, ClientConfig, HttpClient, Pool, PoolConfig,
//!     RateLimiter, StorageStrategy, ContentFilter, Job};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = AuthProfileBuilder::new().build()?;
//!     let client = HttpClient::new(auth, ClientConfig::default())?;
//!     let pool = Pool::new(client, RateLimiter::unlimited(), PoolConfig {
//!         workers: 4,
//!         channel_capacity: 16,
//!         base_dir: "./downloads".into(),
//!         storage: StorageStrategy::Host,
//!         filter: ContentFilter::default(),
//!         head_precheck: false,
//!     });
//!
//!     let jobs = vec![Job { index: 0, url: "https://example.test/file.txt".to_string() }];
//!     let _results = pool.run(jobs, CancellationToken::new(), None).await;
//!     Ok(())
//! }
//! ```

mod auth;
mod classify;
mod client;
mod config;
mod endpoints;
mod error;
mod filter;
mod findings_output;
mod jsbeautify;
mod pool;
mod ratelimit;
mod report;
mod secrets;
mod sink;
mod storage;
mod types;
mod url_source;

pub use auth::{AuthProfile, AuthProfileBuilder};
pub use classify::{classify, Category};
pub use client::{ClientConfig, FetchedBody, HttpClient, ENGINE_SIZE_CAP};
pub use config::{
    discover as discover_config, load as load_config, parse as parse_config, parse_size as parse_config_size, ConfigFile, HostAuthConfig,
};
pub use endpoints::{scan as scan_endpoints, Endpoint};
pub use error::{Error, Result};
pub use filter::{Admission, ContentFilter};
pub use findings_output::{endpoints_to_burp, endpoints_to_json, endpoints_to_nuclei_yaml, secrets_to_burp, secrets_to_json};
pub use jsbeautify::{beautify, looks_minified, looks_obfuscated};
pub use pool::{Pool, PoolConfig, ProgressCallback};
pub use ratelimit::{RateLimiter, RateSpec};
pub use report::{Report, ReportMetadata, RunStats};
pub use secrets::{scan as scan_secrets, Confidence, ScanConfig as SecretScanConfig, SecretFinding};
pub use sink::FilesystemSink;
pub use storage::{sanitize as sanitize_path_component, url_to_filename, StorageStrategy};
pub use types::{DownloadResult, Job};
pub use url_source::{from_file, from_single, from_stdin, read_urls, validate_url};
