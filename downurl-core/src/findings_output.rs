//! External rendering formats for scanner findings (spec.md §4.10), kept
//! independent of the main report's `--report-format` so a pentester can pipe
//! `--secrets-output`/`--endpoints-output` straight into another tool.

use crate::endpoints::Endpoint;
use crate::secrets::SecretFinding;
use serde_json::{json, Value};

pub fn secrets_to_json(findings: &[SecretFinding]) -> Value {
    json!(findings
        .iter()
        .map(|f| json!({
            "file": f.file,
            "url": f.url,
            "kind": f.kind,
            "confidence": f.confidence.as_str(),
            "matched": f.matched,
            "line": f.line,
            "context": f.context,
        }))
        .collect::<Vec<_>>())
}

/// One line per finding: `kind:confidence:line:matched` — grep-friendly, in
/// the spirit of Burp's plain-text issue export.
pub fn secrets_to_burp(findings: &[SecretFinding]) -> String {
    findings
        .iter()
        .map(|f| format!("{}:{}:{}:{}:{}", f.url, f.kind, f.confidence, f.line, f.matched))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn endpoints_to_json(endpoints: &[Endpoint]) -> Value {
    json!(endpoints
        .iter()
        .map(|e| json!({
            "file": e.file,
            "url": e.url,
            "method": e.method,
            "path": e.path,
            "kind": e.kind,
            "line": e.line,
            "context": e.context,
            "params": e.params,
            "source": e.source,
        }))
        .collect::<Vec<_>>())
}

/// `METHOD fullURL` per line, matching Burp's "send to repeater" clipboard
/// format (spec.md §4.10), deduplicated by the rendered string itself.
pub fn endpoints_to_burp(endpoints: &[Endpoint]) -> String {
    let mut seen = std::collections::HashSet::new();
    endpoints
        .iter()
        .map(|e| format!("{} {}", e.method, e.path))
        .filter(|line| seen.insert(line.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A minimal Nuclei HTTP template per endpoint, enough to seed a fuzzing run.
/// Only paths starting with `/` become `{{BaseURL}}<path>` entries.
pub fn endpoints_to_nuclei_yaml(endpoints: &[Endpoint]) -> String {
    let mut out = String::new();
    out.push_str("id: downurl-discovered-endpoints\n");
    out.push_str("info:\n  name: Endpoints discovered by downurl\n  severity: info\n");
    out.push_str("http:\n");
    for e in endpoints.iter().filter(|e| e.path.starts_with('/')) {
        out.push_str("  - method: ");
        out.push_str(&e.method);
        out.push('\n');
        out.push_str("    path:\n      - \"{{BaseURL}}");
        out.push_str(&e.path);
        out.push_str("\"\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::Confidence;

    fn endpoint(method: &str, path: &str) -> Endpoint {
        Endpoint {
            file: "app.js".to_string(),
            url: "https://a.test/app.js".to_string(),
            method: method.to_string(),
            path: path.to_string(),
            kind: "rest",
            line: 1,
            context: String::new(),
            params: vec![],
            source: "fetch",
        }
    }

    #[test]
    fn endpoints_burp_format_is_method_space_path() {
        let endpoints = vec![endpoint("GET", "/api/x")];
        assert_eq!(endpoints_to_burp(&endpoints), "GET /api/x");
    }

    #[test]
    fn endpoints_nuclei_yaml_includes_each_path() {
        let endpoints = vec![endpoint("GET", "/api/x")];
        let yaml = endpoints_to_nuclei_yaml(&endpoints);
        assert!(yaml.contains("/api/x"));
        assert!(yaml.contains("method: GET"));
    }

    #[test]
    fn nuclei_yaml_skips_non_absolute_paths() {
        let endpoints = vec![endpoint("unspecified", "https://external.test/x")];
        let yaml = endpoints_to_nuclei_yaml(&endpoints);
        assert!(!yaml.contains("external.test"));
    }

    #[test]
    fn secrets_burp_format_has_five_fields() {
        let findings = vec![SecretFinding {
            file: "app.js".to_string(),
            url: "https://a.test/app.js".to_string(),
            kind: "aws_access_key".to_string(),
            confidence: Confidence::High,
            matched: "AKIA...".to_string(),
            line: 3,
            context: String::new(),
        }];
        let line = secrets_to_burp(&findings);
        // url:kind:confidence:line:matched, plus the scheme colon in the URL itself.
        assert_eq!(line.matches(':').count(), 5);
        assert!(line.contains("high"));
    }
}
