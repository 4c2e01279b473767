//! Report aggregator (spec.md §6 / SPEC_FULL.md §4.14) — collects run
//! metadata, per-URL results, and scanner findings into one structure,
//! rendered as JSON, plain text, CSV, or Markdown.

use crate::classify::classify;
use crate::endpoints::Endpoint;
use crate::secrets::{Confidence, SecretFinding};
use crate::types::DownloadResult;
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub total_urls: usize,
    pub storage_mode: String,
    pub base_dir: PathBuf,
}

/// Derived statistics (spec.md §6's `statistics` schema / SPEC_FULL.md's
/// `RunStats` entity).
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub succeeded: usize,
    pub failed: usize,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub by_content_type: HashMap<String, usize>,
    pub secrets_count: usize,
    pub endpoints_count: usize,
    pub high_confidence_secrets: usize,
}

impl RunStats {
    pub fn compute(results: &[DownloadResult], secrets: &[SecretFinding], endpoints: &[Endpoint]) -> Self {
        let mut stats = RunStats::default();
        for r in results {
            if r.is_success() {
                stats.succeeded += 1;
                stats.total_files += r.paths.len();
                for p in &r.paths {
                    if let Ok(meta) = std::fs::metadata(p) {
                        stats.total_size_bytes += meta.len();
                    }
                }
                let category = r.content_type.as_deref().map(classify).map(|c| c.as_str().to_string()).unwrap_or_else(|| "other".to_string());
                *stats.by_content_type.entry(category).or_insert(0) += 1;
            } else {
                stats.failed += 1;
            }
        }

        stats.secrets_count = secrets.len();
        stats.endpoints_count = endpoints.len();
        stats.high_confidence_secrets = secrets.iter().filter(|f| f.confidence == Confidence::High).count();
        stats
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub downloads: Vec<DownloadResult>,
    pub secrets: Vec<SecretFinding>,
    pub endpoints: Vec<Endpoint>,
    pub stats: RunStats,
}

impl Report {
    pub fn new(metadata: ReportMetadata, downloads: Vec<DownloadResult>, secrets: Vec<SecretFinding>, endpoints: Vec<Endpoint>) -> Self {
        let stats = RunStats::compute(&downloads, &secrets, &endpoints);
        Report { metadata, downloads, secrets, endpoints, stats }
    }

    /// The §6 JSON schema: `metadata`, `downloads[]`,
    /// `findings.{secrets[],endpoints[]}`, `statistics.{...}`.
    pub fn to_json(&self) -> Value {
        json!({
            "metadata": {
                "started_at": self.metadata.started_at.to_rfc3339(),
                "finished_at": self.metadata.finished_at.to_rfc3339(),
                "total_urls": self.metadata.total_urls,
                "storage_mode": self.metadata.storage_mode,
                "base_dir": self.metadata.base_dir.display().to_string(),
            },
            "downloads": self.downloads.iter().map(download_to_json).collect::<Vec<_>>(),
            "findings": {
                "secrets": self.secrets.iter().map(secret_to_json).collect::<Vec<_>>(),
                "endpoints": self.endpoints.iter().map(endpoint_to_json).collect::<Vec<_>>(),
            },
            "statistics": {
                "total_files": self.stats.total_files,
                "total_size_bytes": self.stats.total_size_bytes,
                "by_content_type": self.stats.by_content_type,
                "secrets_count": self.stats.secrets_count,
                "endpoints_count": self.stats.endpoints_count,
                "high_confidence_secrets": self.stats.high_confidence_secrets,
                "successful": self.stats.succeeded,
                "failed": self.stats.failed,
            },
        })
    }

    pub fn to_json_string_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json())
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_json())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "downurl report: {} -> {} ({} URLs, mode={})\n",
            self.metadata.started_at.to_rfc3339(),
            self.metadata.finished_at.to_rfc3339(),
            self.metadata.total_urls,
            self.metadata.storage_mode
        ));
        out.push_str(&format!(
            "succeeded={} failed={} total_files={} total_size_bytes={}\n\n",
            self.stats.succeeded, self.stats.failed, self.stats.total_files, self.stats.total_size_bytes
        ));

        for d in &self.downloads {
            if d.is_success() {
                let paths = d.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
                out.push_str(&format!("[OK]   {} -> {} ({:?})\n", d.url, paths, d.duration));
            } else {
                out.push_str(&format!("[FAIL] {} -> {}\n", d.url, d.errors.join("; ")));
            }
        }

        if !self.secrets.is_empty() {
            out.push_str("\nsecrets:\n");
            for s in &self.secrets {
                out.push_str(&format!("  {} line {}: {} (confidence {})\n", s.url, s.line, s.kind, s.confidence));
            }
        }

        if !self.endpoints.is_empty() {
            out.push_str("\nendpoints:\n");
            for e in &self.endpoints {
                out.push_str(&format!("  {} {} ({})\n", e.method, e.path, e.kind));
            }
        }

        out
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("url,status,paths,error,duration_ms\n");
        for d in &self.downloads {
            let status = if d.is_success() { "ok" } else { "fail" };
            let paths = d.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(";");
            let error = d.errors.join(";");
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_escape(&d.url),
                status,
                csv_escape(&paths),
                csv_escape(&error),
                duration_ms(d.duration)
            ));
        }
        out
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# downurl report\n\n");
        out.push_str(&format!("- Started: {}\n", self.metadata.started_at.to_rfc3339()));
        out.push_str(&format!("- Finished: {}\n", self.metadata.finished_at.to_rfc3339()));
        out.push_str(&format!("- Total URLs: {}\n", self.metadata.total_urls));
        out.push_str(&format!("- Storage mode: {}\n", self.metadata.storage_mode));
        out.push_str(&format!("- Succeeded / Failed: {} / {}\n\n", self.stats.succeeded, self.stats.failed));

        out.push_str("## Downloads\n\n| URL | Status | Paths / Error |\n|---|---|---|\n");
        for d in &self.downloads {
            let status = if d.is_success() { "OK" } else { "FAIL" };
            let detail = if d.is_success() {
                d.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
            } else {
                d.errors.join("; ")
            };
            out.push_str(&format!("| {} | {} | {} |\n", d.url, status, detail));
        }

        if !self.secrets.is_empty() {
            out.push_str("\n## Secrets\n\n| URL | Line | Kind | Confidence |\n|---|---|---|---|\n");
            for s in &self.secrets {
                out.push_str(&format!("| {} | {} | {} | {} |\n", s.url, s.line, s.kind, s.confidence));
            }
        }

        if !self.endpoints.is_empty() {
            out.push_str("\n## Endpoints\n\n| Method | Path | Kind |\n|---|---|---|\n");
            for e in &self.endpoints {
                out.push_str(&format!("| {} | {} | {} |\n", e.method, e.path, e.kind));
            }
        }

        out
    }
}

fn download_to_json(d: &DownloadResult) -> Value {
    json!({
        "url": d.url,
        "host": d.host,
        "paths": d.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "errors": d.errors,
        "duration_ms": duration_ms(d.duration),
        "success": d.is_success(),
        "content_type": d.content_type,
    })
}

fn secret_to_json(s: &SecretFinding) -> Value {
    json!({
        "file": s.file,
        "url": s.url,
        "kind": s.kind,
        "confidence": s.confidence.as_str(),
        "matched": s.matched,
        "line": s.line,
        "context": s.context,
    })
}

fn endpoint_to_json(e: &Endpoint) -> Value {
    json!({
        "file": e.file,
        "url": e.url,
        "method": e.method,
        "path": e.path,
        "kind": e.kind,
        "line": e.line,
        "context": e.context,
        "params": e.params,
        "source": e.source,
    })
}

fn duration_ms(d: Duration) -> u128 {
    d.as_millis()
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> ReportMetadata {
        let now = Local::now();
        ReportMetadata { started_at: now, finished_at: now, total_urls: 1, storage_mode: "flat".to_string(), base_dir: PathBuf::from("/tmp/out") }
    }

    #[test]
    fn json_report_includes_statistics() {
        let results = vec![DownloadResult::success(
            "https://a.test/x".to_string(),
            "a.test".to_string(),
            vec![PathBuf::from("/tmp/out/x")],
            Duration::from_millis(10),
        )];
        let report = Report::new(sample_metadata(), results, vec![], vec![]);
        let v = report.to_json();
        assert_eq!(v["statistics"]["successful"], 1);
        assert_eq!(v["downloads"][0]["url"], "https://a.test/x");
        assert!(v["findings"]["secrets"].as_array().unwrap().is_empty());
    }

    #[test]
    fn json_report_nests_findings_and_counts_high_confidence() {
        let secrets = vec![SecretFinding {
            file: "app.js".to_string(),
            url: "https://a.test/app.js".to_string(),
            kind: "aws_access_key".to_string(),
            confidence: Confidence::High,
            matched: "AKIA...".to_string(),
            line: 3,
            context: String::new(),
        }];
        let report = Report::new(sample_metadata(), vec![], secrets, vec![]);
        let v = report.to_json();
        assert_eq!(v["statistics"]["secrets_count"], 1);
        assert_eq!(v["statistics"]["high_confidence_secrets"], 1);
        assert_eq!(v["findings"]["secrets"][0]["confidence"], "high");
    }

    #[test]
    fn csv_escapes_commas() {
        let results = vec![DownloadResult::failure("https://a.test/x".to_string(), "a.test".to_string(), "oops, bad".to_string(), Duration::ZERO)];
        let report = Report::new(sample_metadata(), results, vec![], vec![]);
        let csv = report.to_csv();
        assert!(csv.contains("\"oops, bad\""));
    }

    #[test]
    fn markdown_lists_downloads() {
        let results = vec![DownloadResult::success("https://a.test/x".to_string(), "a.test".to_string(), vec![PathBuf::from("/tmp/out/x")], Duration::ZERO)];
        let report = Report::new(sample_metadata(), results, vec![], vec![]);
        let md = report.to_markdown();
        assert!(md.contains("https://a.test/x"));
        assert!(md.contains("OK"));
    }
}
