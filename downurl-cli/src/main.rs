mod archive;
mod args;
mod output;

use anyhow::{Context, Result};
use args::Args;
use chrono::Local;
use clap::Parser;
use downurl_core::{
    beautify, discover_config, endpoints_to_burp, endpoints_to_json, endpoints_to_nuclei_yaml, load_config, parse_config_size, scan_endpoints,
    scan_secrets, secrets_to_burp, secrets_to_json, AuthProfileBuilder, ClientConfig, Confidence, ContentFilter, HttpClient, Job, Pool, PoolConfig,
    RateLimiter, RateSpec, Report, ReportMetadata, SecretScanConfig, StorageStrategy,
};
use output::DownurlOutput;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet { "off" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)))
        .with_target(false)
        .init();

    if let Err(e) = run(args).await {
        match e.downcast_ref::<downurl_core::Error>() {
            Some(core_err) => eprintln!("downurl: {}", core_err.with_suggestion()),
            None => eprintln!("downurl: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    args.validate().map_err(anyhow::Error::msg)?;

    let config_file = if args.no_config {
        None
    } else if let Some(ref path) = args.config {
        Some(load_config(path).with_context(|| format!("loading {}", path.display()))?)
    } else if let Some(path) = discover_config() {
        Some(load_config(&path).with_context(|| format!("loading {}", path.display()))?)
    } else {
        None
    };

    // CLI flags override the config file, which overrides built-in defaults.
    // Clap bakes its own defaults into `args.*`, so "still at the clap
    // default" is treated as "the user didn't pass this flag" when deciding
    // whether the config file's value should win.
    let workers = if args.workers == 4 { config_file.as_ref().and_then(|f| f.workers).unwrap_or(args.workers) } else { args.workers };
    let queue_size = args.queue_size.unwrap_or(workers * 4);
    let max_retries = if args.max_retries == 2 { config_file.as_ref().and_then(|f| f.max_retries).unwrap_or(args.max_retries) } else { args.max_retries };
    let timeout_secs = if args.timeout == 30 { config_file.as_ref().and_then(|f| f.timeout_secs).unwrap_or(args.timeout) } else { args.timeout };

    let storage_name = if args.storage == "flat" {
        config_file.as_ref().and_then(|f| f.storage.clone()).unwrap_or_else(|| args.storage.clone())
    } else {
        args.storage.clone()
    };
    let storage = StorageStrategy::from_str(&storage_name).map_err(anyhow::Error::msg)?;

    let base_dir = config_file
        .as_ref()
        .and_then(|f| f.base_dir.clone())
        .filter(|_| args.output_dir == PathBuf::from("./downloads"))
        .unwrap_or_else(|| args.output_dir.clone());

    let filter = build_filter(&args, config_file.as_ref())?;

    let rate_spec = args
        .rate_limit
        .clone()
        .or_else(|| config_file.as_ref().and_then(|f| f.rate_limit.clone()));
    let limiter = match rate_spec {
        Some(s) => RateLimiter::new(RateSpec::from_str(&s).map_err(anyhow::Error::msg)?),
        None => RateLimiter::unlimited(),
    };

    let auth = AuthProfileBuilder::new();
    let auth = if let Some(ref token) = args.bearer {
        auth.bearer(token.clone())
    } else if let Some(ref basic) = args.basic {
        let (user, pass) = basic.split_once(':').expect("validated by Args::validate");
        auth.basic(user, pass)
    } else if let Some(ref value) = args.custom_authorization {
        auth.custom_authorization(value.clone())
    } else {
        auth
    };
    let auth = if let Some(ref path) = args.headers_file { auth.headers_file(path.clone()) } else { auth };
    let auth = if let Some(ref s) = args.cookie_string { auth.cookie_string(s.clone()) } else { auth };
    let auth = if let Some(ref path) = args.cookies_file { auth.cookies_file(path.clone()) } else { auth };
    let auth = if let Some(ref ua) = args.user_agent { auth.user_agent(ua.clone()) } else { auth };
    let auth = auth.build()?;

    let client_config = ClientConfig { max_retries, timeout: Duration::from_secs(timeout_secs), max_redirects: 10 };
    let client = HttpClient::new(auth, client_config)?;

    let pool_config = PoolConfig {
        workers,
        channel_capacity: queue_size,
        base_dir: base_dir.clone(),
        storage,
        filter,
        head_precheck: args.head_precheck,
    };
    let pool = Pool::new(client, limiter, pool_config);

    let urls = resolve_urls(&args)?;
    if urls.is_empty() {
        anyhow::bail!("no URLs to download (pass a URL, --input FILE, or pipe URLs on stdin)");
    }

    if let Some(ref path) = args.save_config {
        save_effective_config(&args, &storage_name, workers, max_retries, timeout_secs, &base_dir, path)?;
    }

    let root_cancel = CancellationToken::new();
    {
        let root_cancel = root_cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            root_cancel.cancel();
        });
    }

    // `--watch` and `--schedule` both describe a re-run-the-whole-list loop;
    // the spec leaves the distinction between them ambiguous (SPEC_FULL.md
    // §4.15 records both as thin wrappers around the same entry point), so
    // either flag selects the same interval here.
    let loop_interval = args.watch.or(args.schedule).map(Duration::from_secs);
    let mut last_report: Option<Report> = None;

    loop {
        let started_at = Local::now();
        let jobs: Vec<Job> = urls.iter().enumerate().map(|(index, url)| Job { index, url: url.clone() }).collect();
        let total = jobs.len();

        let out = Arc::new(DownurlOutput::new(args.quiet, args.no_progress, total));
        let progress = out.clone().into_progress_callback();

        let results = pool.run(jobs, root_cancel.clone(), Some(progress)).await;
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        out.finish(succeeded, results.len() - succeeded);

        let (secrets, endpoints) = post_process(&args, &results, &out)?;
        write_findings(&args, &base_dir, &secrets, &endpoints)?;

        let metadata = ReportMetadata { started_at, finished_at: Local::now(), total_urls: total, storage_mode: storage_name.clone(), base_dir: base_dir.clone() };
        let report = Report::new(metadata, results, secrets, endpoints);
        write_report(&args, &base_dir, &report)?;
        last_report = Some(report);

        if root_cancel.is_cancelled() {
            break;
        }

        match loop_interval {
            Some(interval) => {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = root_cancel.cancelled() => break,
                }
            }
            None => break,
        }
    }

    if args.archive {
        let archive_path = archive::archive_output_dir(base_dir.clone()).await?;
        if !args.quiet {
            println!("archived output to {}", archive_path.display());
        }
    }

    let had_failures = last_report.as_ref().map(|r| r.stats.failed > 0).unwrap_or(false);
    if had_failures {
        std::process::exit(1);
    }

    Ok(())
}

fn resolve_urls(args: &Args) -> Result<Vec<String>> {
    use std::io::IsTerminal;

    if let Some(ref url) = args.url {
        return downurl_core::from_single(url).context("validating URL");
    }

    if let Some(ref path) = args.input {
        if path.as_os_str() == "-" {
            return downurl_core::from_stdin().context("reading URLs from stdin");
        }
        return downurl_core::from_file(path).with_context(|| format!("reading {}", path.display()));
    }

    if !std::io::stdin().is_terminal() {
        return downurl_core::from_stdin().context("reading URLs from stdin");
    }

    Ok(Vec::new())
}

fn build_filter(args: &Args, config_file: Option<&downurl_core::ConfigFile>) -> Result<ContentFilter> {
    let split = |s: &str| -> Vec<String> { s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect() };

    let allow_extensions = args
        .allow_extensions
        .as_deref()
        .map(split)
        .or_else(|| config_file.map(|f| f.allow_extensions.clone()))
        .unwrap_or_default();
    let block_extensions = args
        .block_extensions
        .as_deref()
        .map(split)
        .or_else(|| config_file.map(|f| f.block_extensions.clone()))
        .unwrap_or_default();
    let allow_types = args.allow_types.as_deref().map(split).or_else(|| config_file.map(|f| f.allow_types.clone())).unwrap_or_default();
    let block_types = args.block_types.as_deref().map(split).or_else(|| config_file.map(|f| f.block_types.clone())).unwrap_or_default();

    let min_size = match &args.min_size {
        Some(s) => parse_config_size(s).map_err(anyhow::Error::msg)?,
        None => config_file.and_then(|f| f.min_size).unwrap_or(0),
    };
    let max_size = match &args.max_size {
        Some(s) => parse_config_size(s).map_err(anyhow::Error::msg)?,
        None => config_file.and_then(|f| f.max_size).unwrap_or(0),
    };
    let skip_empty = args.skip_empty || config_file.and_then(|f| f.skip_empty).unwrap_or(false);

    Ok(ContentFilter { allow_extensions, block_extensions, allow_types, block_types, min_size, max_size, skip_empty })
}

fn post_process(
    args: &Args,
    results: &[downurl_core::DownloadResult],
    out: &DownurlOutput,
) -> Result<(Vec<downurl_core::SecretFinding>, Vec<downurl_core::Endpoint>)> {
    let mut secrets = Vec::new();
    let mut endpoints = Vec::new();

    if !(args.scan_secrets || args.scan_endpoints || args.beautify) {
        return Ok((secrets, endpoints));
    }

    let min_confidence: Confidence = args.secrets_min_confidence.parse().map_err(anyhow::Error::msg)?;

    for result in results {
        for path in &result.paths {
            let Ok(content) = std::fs::read_to_string(path) else { continue };
            let is_js = matches!(path.extension().and_then(|e| e.to_str()), Some("js") | Some("mjs"));
            let file_label = path.display().to_string();

            if args.scan_secrets {
                let scan_config = SecretScanConfig { min_confidence, entropy_threshold: args.secrets_entropy_threshold, ..SecretScanConfig::default() };
                secrets.extend(scan_secrets(&file_label, &result.url, &content, &scan_config));
            }

            if is_js && args.scan_endpoints {
                endpoints.extend(scan_endpoints(&file_label, &result.url, &content));
            }

            if is_js && args.beautify {
                let beautified = beautify(&content);
                if let Err(e) = std::fs::write(path, beautified) {
                    out.warn(&format!("failed to write beautified output for {}: {e}", path.display()));
                }
            }
        }
    }

    Ok((secrets, endpoints))
}

/// Render `--secrets-output`/`--endpoints-output` to separate files under
/// `base_dir` (spec.md §4.10/§6: `secrets.json`, `endpoints.json` and
/// friends, independent of the main `--output-format` report).
fn write_findings(args: &Args, base_dir: &PathBuf, secrets: &[downurl_core::SecretFinding], endpoints: &[downurl_core::Endpoint]) -> Result<()> {
    if args.scan_secrets {
        let (name, body) = match args.secrets_output.as_deref() {
            Some("burp") => ("secrets.txt", secrets_to_burp(secrets)),
            _ => ("secrets.json", serde_json::to_string_pretty(&secrets_to_json(secrets))?),
        };
        std::fs::write(base_dir.join(name), body).with_context(|| format!("writing {name}"))?;
    }

    if args.scan_endpoints {
        let (name, body) = match args.endpoints_output.as_deref() {
            Some("burp") => ("endpoints.txt", endpoints_to_burp(endpoints)),
            Some("nuclei") => ("endpoints.yaml", endpoints_to_nuclei_yaml(endpoints)),
            _ => ("endpoints.json", serde_json::to_string_pretty(&endpoints_to_json(endpoints))?),
        };
        std::fs::write(base_dir.join(name), body).with_context(|| format!("writing {name}"))?;
    }

    Ok(())
}

fn write_report(args: &Args, base_dir: &PathBuf, report: &Report) -> Result<()> {
    let rendered = match args.report_format.as_str() {
        "json" if args.pretty_json => report.to_json_string_pretty()?,
        "json" => report.to_json_string()?,
        "text" => report.to_text(),
        "csv" => report.to_csv(),
        "markdown" | "md" => report.to_markdown(),
        other => anyhow::bail!("unknown report format: {other}"),
    };

    let path = args.report_file.clone().unwrap_or_else(|| base_dir.join("report.txt"));
    std::fs::create_dir_all(base_dir).with_context(|| format!("creating {}", base_dir.display()))?;
    std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
    if !args.quiet {
        println!("report written to {}", path.display());
    }

    Ok(())
}

/// Serialize the effective run configuration as a `.downurlrc`-compatible INI
/// file for `--save-config` (SPEC_FULL.md §4.12).
#[allow(clippy::too_many_arguments)]
fn save_effective_config(
    args: &Args,
    storage_name: &str,
    workers: usize,
    max_retries: u32,
    timeout_secs: u64,
    base_dir: &PathBuf,
    path: &PathBuf,
) -> Result<()> {
    let mut out = String::new();
    out.push_str("[defaults]\n");
    out.push_str(&format!("workers = {workers}\n"));
    out.push_str(&format!("storage = {storage_name}\n"));
    out.push_str(&format!("base_dir = {}\n", base_dir.display()));
    out.push_str(&format!("max_retries = {max_retries}\n"));
    out.push_str(&format!("timeout_secs = {timeout_secs}\n"));

    out.push_str("\n[filters]\n");
    if let Some(ref v) = args.allow_extensions {
        out.push_str(&format!("allow_extensions = {v}\n"));
    }
    if let Some(ref v) = args.block_extensions {
        out.push_str(&format!("block_extensions = {v}\n"));
    }
    if let Some(ref v) = args.allow_types {
        out.push_str(&format!("allow_types = {v}\n"));
    }
    if let Some(ref v) = args.block_types {
        out.push_str(&format!("block_types = {v}\n"));
    }
    if let Some(ref v) = args.min_size {
        out.push_str(&format!("min_size = {v}\n"));
    }
    if let Some(ref v) = args.max_size {
        out.push_str(&format!("max_size = {v}\n"));
    }
    out.push_str(&format!("skip_empty = {}\n", args.skip_empty));

    if let Some(ref rate) = args.rate_limit {
        out.push_str("\n[ratelimit]\n");
        out.push_str(&format!("rate = {rate}\n"));
    }

    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
