//! Endpoint scanner (spec.md §4.10) — extracts candidate API endpoints from
//! JavaScript source via a fixed pattern table, deduplicated by
//! `(method, endpoint)`.

use regex::Regex;
use std::sync::OnceLock;

/// Coarse endpoint category (spec.md §3/§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Rest,
    GraphQl,
    WebSocket,
    Generic,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Rest => "rest",
            Kind::GraphQl => "graphql",
            Kind::WebSocket => "websocket",
            Kind::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub file: String,
    pub url: String,
    pub method: String,
    pub path: String,
    pub kind: &'static str,
    pub line: usize,
    pub context: String,
    pub params: Vec<String>,
    pub source: &'static str,
}

struct PatternSpec {
    source: &'static str,
    kind: Kind,
    regex: &'static str,
    method_group: Option<usize>,
    path_group: usize,
    default_method: &'static str,
}

const PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        source: "fetch",
        kind: Kind::Rest,
        regex: r#"fetch\(\s*['"]([^'"]+)['"]"#,
        method_group: None,
        path_group: 1,
        default_method: "GET",
    },
    PatternSpec {
        source: "axios",
        kind: Kind::Rest,
        regex: r#"axios\.(get|post|put|delete|patch|head)\(\s*['"]([^'"]+)['"]"#,
        method_group: Some(1),
        path_group: 2,
        default_method: "GET",
    },
    PatternSpec {
        source: "jquery",
        kind: Kind::Rest,
        regex: r#"\$\.(get|post|ajax)\(\s*['"]([^'"]+)['"]"#,
        method_group: None,
        path_group: 2,
        default_method: "GET",
    },
    PatternSpec {
        source: "xhr",
        kind: Kind::Rest,
        regex: r#"\.open\(\s*['"](GET|POST|PUT|DELETE|PATCH|HEAD)['"]\s*,\s*['"]([^'"]+)['"]"#,
        method_group: Some(1),
        path_group: 2,
        default_method: "GET",
    },
    PatternSpec {
        source: "api_path",
        kind: Kind::Rest,
        regex: r#"['"](/api/[A-Za-z0-9_\-/{}:.]+)['"]"#,
        method_group: None,
        path_group: 1,
        default_method: "GET",
    },
    PatternSpec {
        source: "graphql",
        kind: Kind::GraphQl,
        regex: r#"['"](/graphql[A-Za-z0-9_\-/]*)['"]"#,
        method_group: None,
        path_group: 1,
        default_method: "POST",
    },
    PatternSpec {
        source: "graphql_operation",
        kind: Kind::GraphQl,
        regex: r#"(query|mutation)\s+\w*\s*\{"#,
        method_group: None,
        path_group: 0,
        default_method: "POST",
    },
    PatternSpec {
        source: "websocket",
        kind: Kind::WebSocket,
        regex: r#"(wss?://[^'"\s]+)"#,
        method_group: None,
        path_group: 1,
        default_method: "WS",
    },
    PatternSpec {
        source: "raw_url",
        kind: Kind::Generic,
        regex: r#"['"](https://[^'"\s]+)['"]"#,
        method_group: None,
        path_group: 1,
        default_method: "unspecified",
    },
];

struct Compiled {
    entries: Vec<(&'static PatternSpec, Regex)>,
}

fn compiled() -> &'static Compiled {
    static CELL: OnceLock<Compiled> = OnceLock::new();
    CELL.get_or_init(|| {
        let entries = PATTERNS.iter().map(|p| (p, Regex::new(p.regex).expect("endpoint pattern compiles"))).collect();
        Compiled { entries }
    })
}

fn path_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}|:([A-Za-z0-9_]+)").unwrap())
}

/// Scan `source` (read from `file`, originally fetched from `url`) for
/// endpoint candidates, deduplicated by `(method, path)`. Order of first
/// occurrence is preserved.
pub fn scan(file: &str, url: &str, source: &str) -> Vec<Endpoint> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let lines: Vec<&str> = source.lines().collect();

    for (spec, regex) in &compiled().entries {
        for caps in regex.captures_iter(source) {
            let method = match spec.method_group {
                Some(g) => caps.get(g).map(|m| m.as_str().to_uppercase()).unwrap_or_else(|| spec.default_method.to_string()),
                None => spec.default_method.to_string(),
            };

            let (path, match_start) = if spec.path_group == 0 {
                ("<graphql>".to_string(), caps.get(0).map(|m| m.start()).unwrap_or(0))
            } else {
                match caps.get(spec.path_group) {
                    Some(m) => (m.as_str().to_string(), m.start()),
                    None => continue,
                }
            };

            let key = (method.clone(), path.clone());
            if !seen.insert(key) {
                continue;
            }

            let line_no = line_of_offset(source, match_start);
            let params = extract_params(&path);
            out.push(Endpoint {
                file: file.to_string(),
                url: url.to_string(),
                method,
                path,
                kind: spec.kind.as_str(),
                line: line_no,
                context: context_for(&lines, line_no.saturating_sub(1), 1),
                params,
                source: spec.source,
            });
        }
    }

    out
}

fn line_of_offset(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())].matches('\n').count() + 1
}

fn context_for(lines: &[&str], idx: usize, radius: usize) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let idx = idx.min(lines.len() - 1);
    let start = idx.saturating_sub(radius);
    let end = (idx + radius + 1).min(lines.len());
    lines[start..end].join("\n")
}

fn extract_params(path: &str) -> Vec<String> {
    path_param_regex()
        .captures_iter(path)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_fetch_call() {
        let src = "fetch('/api/users/{id}').then(r => r.json())";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.method == "GET" && e.path == "/api/users/{id}" && e.kind == "rest"));
        let ep = eps.iter().find(|e| e.path == "/api/users/{id}").unwrap();
        assert_eq!(ep.params, vec!["id".to_string()]);
        assert_eq!(ep.file, "app.js");
        assert_eq!(ep.url, "https://a.test/app.js");
    }

    #[test]
    fn finds_axios_post() {
        let src = "axios.post('/api/login', { user })";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.method == "POST" && e.path == "/api/login"));
    }

    #[test]
    fn finds_xhr_open() {
        let src = "xhr.open('DELETE', '/api/items/:id')";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.method == "DELETE" && e.path == "/api/items/:id"));
    }

    #[test]
    fn finds_websocket() {
        let src = "const ws = new WebSocket('wss://example.test/socket')";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.method == "WS" && e.kind == "websocket"));
    }

    #[test]
    fn finds_generic_raw_url() {
        let src = "const target = \"https://evil.test/exfil\";";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.kind == "generic" && e.path == "https://evil.test/exfil"));
    }

    #[test]
    fn dedups_by_method_and_path() {
        let src = "fetch('/api/users'); fetch('/api/users');";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert_eq!(eps.iter().filter(|e| e.path == "/api/users").count(), 1);
    }

    #[test]
    fn dedup_is_idempotent_on_concatenated_input() {
        let src = "fetch('/api/users'); axios.post('/api/login', {});";
        let once = scan("app.js", "https://a.test/app.js", src);
        let doubled = scan("app.js", "https://a.test/app.js", &format!("{src}\n{src}"));
        let mut once_keys: Vec<(String, String)> = once.iter().map(|e| (e.method.clone(), e.path.clone())).collect();
        let mut doubled_keys: Vec<(String, String)> = doubled.iter().map(|e| (e.method.clone(), e.path.clone())).collect();
        once_keys.sort();
        doubled_keys.sort();
        assert_eq!(once_keys, doubled_keys);
    }

    #[test]
    fn mixed_methods_scenario() {
        let src = "fetch('/api/users'); axios.post('/api/users'); xhr.open('PUT','/api/users/1');";
        let eps = scan("app.js", "https://a.test/app.js", src);
        assert!(eps.iter().any(|e| e.method == "GET" && e.path == "/api/users"));
        assert!(eps.iter().any(|e| e.method == "POST" && e.path == "/api/users"));
        assert!(eps.iter().any(|e| e.method == "PUT" && e.path == "/api/users/1"));
    }
}
