//! HTTP client (spec.md §4.5) — GET/HEAD with the auth decorator applied,
//! a fixed redirect cap, a streaming byte-size cap, and linear backoff retry.

use crate::auth::AuthProfile;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Engine-wide response cap: ~100 MiB, independent of any content filter.
pub const ENGINE_SIZE_CAP: u64 = 100 * 1024 * 1024;

const DEFAULT_USER_AGENT: &str = "downurl/1.0";
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_retries: u32,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig { max_retries: 0, timeout: Duration::from_secs(30), max_redirects: MAX_REDIRECTS }
    }
}

/// A fetched response body plus the headers the caller needs for filtering
/// and classification, already capped to [`ENGINE_SIZE_CAP`].
pub struct FetchedBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub status: u16,
}

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    auth: AuthProfile,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(auth: AuthProfile, config: ClientConfig) -> Result<Self> {
        let redirects = config.max_redirects.min(MAX_REDIRECTS);
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(redirects))
            .timeout(config.timeout);

        if !auth.sets_user_agent() {
            builder = builder.user_agent(DEFAULT_USER_AGENT);
        }

        let inner = builder.build()?;
        Ok(HttpClient { inner, auth, config })
    }

    /// `HEAD` a URL for pre-admission filtering. Some servers do not support
    /// `HEAD`; callers treat a non-2xx here as "unknown" rather than fatal.
    pub async fn head(&self, url: &str) -> Result<(u16, Option<String>, Option<u64>)> {
        let request = self.auth.apply(self.inner.head(url));
        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        Ok((status, content_type, content_length))
    }

    /// `GET` a URL with linear backoff retry, streamed under the engine size
    /// cap. 4xx responses are never retried (spec.md §4.5/§7).
    pub async fn get(&self, url: &str, cancelled: &CancellationToken) -> Result<FetchedBody> {
        let mut attempt: u32 = 0;
        loop {
            if cancelled.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.try_get(url, cancelled).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_client_error() => return Err(e),
                Err(e) if attempt >= self.config.max_retries => return Err(e),
                Err(_) => {
                    attempt += 1;
                    let backoff = Duration::from_secs(attempt as u64);
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancelled.cancelled() => return Err(Error::Cancelled),
                    }
                }
            }
        }
    }

    async fn try_get(&self, url: &str, cancelled: &CancellationToken) -> Result<FetchedBody> {
        let request = self.auth.apply(self.inner.get(url));
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus { code: status.as_u16(), text });
        }

        if let Some(len) = response.content_length() {
            if len > ENGINE_SIZE_CAP {
                return Err(Error::OverSize { limit: ENGINE_SIZE_CAP });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut stream = response.bytes_stream();
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            buf.extend_from_slice(&bytes);
                            if buf.len() as u64 > ENGINE_SIZE_CAP {
                                return Err(Error::OverSize { limit: ENGINE_SIZE_CAP });
                            }
                        }
                        Some(Err(e)) => return Err(Error::Http(e)),
                        None => break,
                    }
                }
                _ = cancelled.cancelled() => return Err(Error::Cancelled),
            }
        }

        Ok(FetchedBody { bytes: Bytes::from(buf), content_type, status: status.as_u16() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthProfileBuilder;

    fn client() -> HttpClient {
        let auth = AuthProfileBuilder::new().build().unwrap();
        HttpClient::new(auth, ClientConfig { max_retries: 1, timeout: Duration::from_secs(5), max_redirects: 10 }).unwrap()
    }

    #[tokio::test]
    async fn get_succeeds_on_200() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/ok").with_status(200).with_header("content-type", "text/plain").with_body("hello").create_async().await;

        let c = client();
        let token = CancellationToken::new();
        let body = c.get(&format!("{}/ok", server.url()), &token).await.unwrap();
        assert_eq!(body.bytes.as_ref(), b"hello");
        assert_eq!(body.content_type.as_deref(), Some("text/plain"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_does_not_retry_on_4xx() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/missing").with_status(404).expect(1).create_async().await;

        let c = client();
        let token = CancellationToken::new();
        let err = c.get(&format!("{}/missing", server.url()), &token).await.unwrap_err();
        assert!(err.is_client_error());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_retries_on_5xx_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let fail = server.mock("GET", "/flaky").with_status(503).create_async().await;

        let c = client();
        let token = CancellationToken::new();
        let result = c.get(&format!("{}/flaky", server.url()), &token).await;
        assert!(result.is_err());
        fail.assert_async().await;
    }

    #[tokio::test]
    async fn oversize_content_length_rejected_before_streaming() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/huge")
            .with_status(200)
            .with_header("content-length", &(ENGINE_SIZE_CAP + 1).to_string())
            .with_body("x")
            .create_async()
            .await;

        let c = client();
        let token = CancellationToken::new();
        let err = c.get(&format!("{}/huge", server.url()), &token).await.unwrap_err();
        assert!(matches!(err, Error::OverSize { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_get() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/slow").with_status(200).with_body("x").create_async().await;

        let c = client();
        let token = CancellationToken::new();
        token.cancel();
        let err = c.get(&format!("{}/slow", server.url()), &token).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        let _ = mock;
    }
}
