//! Auth decorator (spec.md §4.2).
//!
//! `AuthProfile` is built once per process and exposes a single `apply`
//! operation, keeping the HTTP client unaware of credential shape — the
//! same separation the teacher crate draws between `auth_handler` (credential
//! resolution policy) and `client`/`downloader` (request construction).

use crate::error::{Error, Result};
use base64::Engine as _;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthSource {
    None,
    Bearer(String),
    Basic { user: String, pass: String },
    Custom(String),
}

/// A fully-built authentication profile, applied to every outgoing request.
#[derive(Debug, Clone, Default)]
pub struct AuthProfile {
    source: AuthSourceOpt,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    user_agent: Option<String>,
}

// Newtype so `#[derive(Default)]` works without requiring AuthSource: Default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AuthSourceOpt(Option<AuthSource>);

/// Builder enforcing the "at most one Authorization source" rule.
#[derive(Debug, Clone, Default)]
pub struct AuthProfileBuilder {
    bearer: Option<String>,
    basic: Option<(String, String)>,
    custom_authorization: Option<String>,
    headers_file: Option<std::path::PathBuf>,
    cookie_string: Option<String>,
    cookies_file: Option<std::path::PathBuf>,
    user_agent: Option<String>,
}

impl AuthProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn basic(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.basic = Some((user.into(), pass.into()));
        self
    }

    pub fn custom_authorization(mut self, value: impl Into<String>) -> Self {
        self.custom_authorization = Some(value.into());
        self
    }

    pub fn headers_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.headers_file = Some(path.into());
        self
    }

    pub fn cookie_string(mut self, s: impl Into<String>) -> Self {
        self.cookie_string = Some(s.into());
        self
    }

    pub fn cookies_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.cookies_file = Some(path.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn build(self) -> Result<AuthProfile> {
        let set_count = [
            self.bearer.is_some(),
            self.basic.is_some(),
            self.custom_authorization.is_some(),
        ]
        .into_iter()
        .filter(|b| *b)
        .count();

        if set_count > 1 {
            return Err(Error::ConflictingAuth);
        }

        let source = if let Some(token) = self.bearer {
            AuthSource::Bearer(token)
        } else if let Some((user, pass)) = self.basic {
            AuthSource::Basic { user, pass }
        } else if let Some(v) = self.custom_authorization {
            AuthSource::Custom(v)
        } else {
            AuthSource::None
        };

        let mut headers = HashMap::new();
        if let Some(ref path) = self.headers_file {
            parse_headers_file(path, &mut headers)?;
        }

        let mut cookies = HashMap::new();
        if let Some(ref s) = self.cookie_string {
            parse_cookie_string(s, &mut cookies);
        }
        if let Some(ref path) = self.cookies_file {
            parse_cookies_file(path, &mut cookies)?;
        }

        Ok(AuthProfile {
            source: AuthSourceOpt(Some(source)),
            headers,
            cookies,
            user_agent: self.user_agent,
        })
    }
}

impl AuthProfile {
    /// Apply this profile to an outgoing request.
    pub fn apply(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.source.0.as_ref().unwrap_or(&AuthSource::None) {
            AuthSource::None => {}
            AuthSource::Bearer(token) => {
                request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
            }
            AuthSource::Basic { user, pass } => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
                request = request.header(reqwest::header::AUTHORIZATION, format!("Basic {encoded}"));
            }
            AuthSource::Custom(value) => {
                request = request.header(reqwest::header::AUTHORIZATION, value.clone());
            }
        }

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(reqwest::header::COOKIE, cookie_header);
        }

        if let Some(ref ua) = self.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua.clone());
        }

        request
    }

    /// Whether this profile already sets its own `User-Agent` (the client
    /// falls back to the engine default only when this is false).
    pub fn sets_user_agent(&self) -> bool {
        self.user_agent.is_some()
    }
}

fn parse_headers_file(path: &Path, into: &mut HashMap<String, String>) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            into.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(())
}

fn parse_cookies_file(path: &Path, into: &mut HashMap<String, String>) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = trimmed.split_once('=') {
            into.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    Ok(())
}

fn parse_cookie_string(s: &str, into: &mut HashMap<String, String>) {
    for pair in s.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((k, v)) = pair.split_once('=') {
            into.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_auth_rejected() {
        let err = AuthProfileBuilder::new()
            .bearer("t")
            .basic("u", "p")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingAuth));
    }

    #[test]
    fn cookie_string_parses_pairs() {
        let mut map = HashMap::new();
        parse_cookie_string("a=1; b=2;  c=3", &mut map);
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
        assert_eq!(map.get("b").map(String::as_str), Some("2"));
        assert_eq!(map.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn later_sources_overwrite_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let cookies_path = dir.path().join("cookies.txt");
        std::fs::write(&cookies_path, "a=file\nb=2\n").unwrap();

        let profile = AuthProfileBuilder::new()
            .cookie_string("a=string")
            .cookies_file(&cookies_path)
            .build()
            .unwrap();

        assert_eq!(profile.cookies.get("a").map(String::as_str), Some("file"));
        assert_eq!(profile.cookies.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn bearer_produces_authorization_header() {
        let profile = AuthProfileBuilder::new().bearer("tok123").build().unwrap();
        assert!(matches!(profile.source.0, Some(AuthSource::Bearer(ref t)) if t == "tok123"));
    }
}
