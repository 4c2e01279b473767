use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "downurl")]
#[command(
    version,
    about = "Concurrent HTTP(S) downloader with a post-download security recon pipeline",
    long_about = None
)]
pub struct Args {
    /// A single URL to download (alternative to --input/stdin)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    // ===== Core =====
    /// Read URLs from FILE, one per line (use "-" for stdin)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory to write downloads into
    #[arg(short = 'o', long, value_name = "DIR", default_value = "./downloads")]
    pub output_dir: PathBuf,

    /// Storage layout: flat, path, host, type, or dated
    #[arg(long, value_name = "MODE", default_value = "flat")]
    pub storage: String,

    /// Number of concurrent download workers
    #[arg(short = 'w', long, value_name = "N", default_value_t = 4)]
    pub workers: usize,

    /// Size of the internal job queue (defaults to `workers * 4`)
    #[arg(long, value_name = "N")]
    pub queue_size: Option<usize>,

    /// Rate limit, e.g. "10/second", "100/minute", "1000/hour"
    #[arg(long, value_name = "RATE")]
    pub rate_limit: Option<String>,

    /// Maximum retries per URL on transient (non-4xx) failures
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Issue a HEAD request before GET to pre-filter by content-type/size
    #[arg(long)]
    pub head_precheck: bool,

    // ===== Auth =====
    /// Send `Authorization: Bearer TOKEN`
    #[arg(long, value_name = "TOKEN")]
    pub bearer: Option<String>,

    /// Send HTTP Basic auth as USER:PASS
    #[arg(long, value_name = "USER:PASS")]
    pub basic: Option<String>,

    /// Send a literal `Authorization` header value
    #[arg(long, value_name = "VALUE")]
    pub custom_authorization: Option<String>,

    /// Load extra request headers from FILE ("Name: value" per line)
    #[arg(long, value_name = "FILE")]
    pub headers_file: Option<PathBuf>,

    /// Send cookies from a "k=v; k2=v2" string
    #[arg(long, value_name = "COOKIES")]
    pub cookie_string: Option<String>,

    /// Load cookies from FILE ("k=v" per line)
    #[arg(long, value_name = "FILE")]
    pub cookies_file: Option<PathBuf>,

    /// Override the User-Agent header
    #[arg(long, value_name = "AGENT")]
    pub user_agent: Option<String>,

    // ===== Filter =====
    /// Comma-separated list of allowed extensions, e.g. ".js,.css"
    #[arg(long, value_name = "LIST")]
    pub allow_extensions: Option<String>,

    /// Comma-separated list of blocked extensions
    #[arg(long, value_name = "LIST")]
    pub block_extensions: Option<String>,

    /// Comma-separated list of allowed content types, wildcards OK
    #[arg(long, value_name = "LIST")]
    pub allow_types: Option<String>,

    /// Comma-separated list of blocked content types, wildcards OK
    #[arg(long, value_name = "LIST")]
    pub block_types: Option<String>,

    /// Minimum response size in bytes (or "NKB"/"NMB"/"NGB")
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Maximum response size in bytes (or "NKB"/"NMB"/"NGB")
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Reject zero-length responses
    #[arg(long)]
    pub skip_empty: bool,

    // ===== Scanners =====
    /// Scan downloaded JavaScript for leaked secrets
    #[arg(long)]
    pub scan_secrets: bool,

    /// Minimum confidence for a secret finding to be reported: low, medium, or high
    #[arg(long, value_name = "LEVEL", default_value = "low")]
    pub secrets_min_confidence: String,

    /// Shannon-entropy threshold (bits) for the high-entropy-string fallback
    #[arg(long, value_name = "BITS", default_value_t = 4.0)]
    pub secrets_entropy_threshold: f64,

    /// Scan downloaded JavaScript for candidate API endpoints
    #[arg(long)]
    pub scan_endpoints: bool,

    /// Render secret findings as: json, burp, or write to a separate FILE
    #[arg(long, value_name = "FORMAT")]
    pub secrets_output: Option<String>,

    /// Render endpoint findings as: json, burp, or nuclei
    #[arg(long, value_name = "FORMAT")]
    pub endpoints_output: Option<String>,

    // ===== JS post-processing =====
    /// Beautify minified JavaScript before writing it to disk
    #[arg(long)]
    pub beautify: bool,

    // ===== Report =====
    /// Report output format: text, json, csv, or markdown
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub report_format: String,

    /// Write the report to FILE instead of `<output-directory>/report.txt`
    #[arg(long, value_name = "FILE")]
    pub report_file: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty_json: bool,

    // ===== Automation =====
    /// Re-run the whole URL list every INTERVAL seconds until interrupted (default 60 if passed with no value)
    #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "60")]
    pub watch: Option<u64>,

    /// Run once, sleep DURATION seconds, then run again, until interrupted
    #[arg(long, value_name = "SECS")]
    pub schedule: Option<u64>,

    /// Archive the output directory to output.tar.gz after the run
    #[arg(long)]
    pub archive: bool,

    // ===== Config =====
    /// Load settings from a `.downurlrc` file (overridden by CLI flags)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Don't look for a `.downurlrc` in the current directory or $HOME
    #[arg(long)]
    pub no_config: bool,

    /// Save the effective configuration to a `.downurlrc`-compatible FILE
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Suppress the progress bar only (other messages still print)
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Validate argument combinations that clap's derive macros can't express.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_some() && self.input.is_some() {
            return Err("pass either a single URL or --input, not both".to_string());
        }

        let auth_sources = [self.bearer.is_some(), self.basic.is_some(), self.custom_authorization.is_some()];
        if auth_sources.iter().filter(|b| **b).count() > 1 {
            return Err("only one of --bearer, --basic, --custom-authorization may be set".to_string());
        }

        if let Some(ref basic) = self.basic {
            if !basic.contains(':') {
                return Err("--basic expects USER:PASS".to_string());
            }
        }

        if self.watch.is_some() && self.schedule.is_some() {
            return Err("pass either --watch or --schedule, not both".to_string());
        }

        self.secrets_min_confidence.parse::<downurl_core::Confidence>()?;

        Ok(())
    }
}
