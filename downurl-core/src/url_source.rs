//! URL ingest and validation front end (spec.md §4.1).
//!
//! Produces a finite, ordered, non-restartable sequence of validated
//! absolute HTTP/HTTPS URLs from a file path, standard input, or a single
//! CLI argument.

use crate::error::{Error, Result};
use std::io::BufRead;

/// Validate one line as an absolute http(s) URL.
///
/// `line_no` is 1-based and only used to build a helpful error message.
pub fn validate_url(line: &str, line_no: usize) -> Result<String> {
    let parsed = url::Url::parse(line).map_err(|e| Error::InvalidUrl {
        line: line_no,
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidUrl {
                line: line_no,
                reason: format!("unsupported scheme {other:?} (only http/https are accepted)"),
            })
        }
    }

    if parsed.host_str().unwrap_or("").is_empty() {
        return Err(Error::InvalidUrl {
            line: line_no,
            reason: "missing host".to_string(),
        });
    }

    Ok(parsed.into())
}

fn is_skippable(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Read URLs line by line from any `Read` source (a file or stdin), trimming
/// each line and skipping blanks and `#`-comments.
pub fn read_urls<R: std::io::Read>(reader: R) -> Result<Vec<String>> {
    let buf = std::io::BufReader::new(reader);
    let mut urls = Vec::new();

    for (idx, line) in buf.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if is_skippable(trimmed) {
            continue;
        }
        urls.push(validate_url(trimmed, idx + 1)?);
    }

    Ok(urls)
}

/// File mode: stream the file at `path` line by line.
pub fn from_file(path: &std::path::Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    read_urls(file)
}

/// Stream mode: read from standard input (caller is responsible for
/// confirming stdin is not an interactive terminal before calling this).
pub fn from_stdin() -> Result<Vec<String>> {
    read_urls(std::io::stdin())
}

/// Single-URL mode: validate one argument as a single line.
pub fn from_single(url: &str) -> Result<Vec<String>> {
    let trimmed = url.trim();
    if is_skippable(trimmed) {
        return Ok(Vec::new());
    }
    Ok(vec![validate_url(trimmed, 1)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("http://example.test/a", 1).is_ok());
        assert!(validate_url("https://example.test/a", 1).is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        let err = validate_url("file:///etc/passwd", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { line: 1, .. }));
        let err = validate_url("ftp://example.test/a", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_missing_host() {
        let err = validate_url("http:///path", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_unparsable() {
        let err = validate_url("not a url", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let input = "# comment\n\nhttp://a.test/x\n   \nhttps://b.test/y\n";
        let urls = read_urls(input.as_bytes()).unwrap();
        assert_eq!(urls, vec!["http://a.test/x", "https://b.test/y"]);
    }

    #[test]
    fn reports_first_error_line_number() {
        let input = "http://a.test/x\nnot-a-url\nhttp://b.test/y\n";
        let err = read_urls(input.as_bytes()).unwrap_err();
        match err {
            Error::InvalidUrl { line, .. } => assert_eq!(line, 2),
            other => panic!("expected InvalidUrl, got {other:?}"),
        }
    }

    #[test]
    fn single_mode_trims_and_validates() {
        let urls = from_single("  https://example.test/a  \n").unwrap();
        assert_eq!(urls, vec!["https://example.test/a"]);
    }
}
