//! JSON-over-HTTP client usable from native binaries and the browser.
//!
//! Native builds go through reqwest; `wasm32` builds go through gloo-net
//! so the same calling code works inside a web page.

use serde::{de::DeserializeOwned, Serialize};

/// Errors from a JSON request.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),
    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),
    /// Could not reach the server
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timeout")]
    Timeout,
    /// Non-2xx status
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

/// Join a base URL and an absolute path without doubling the slash.
fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

#[cfg(target_arch = "wasm32")]
mod platform {
    use super::*;
    use gloo_net::http::{Request, Response};

    impl From<gloo_net::Error> for HttpClientError {
        fn from(err: gloo_net::Error) -> Self {
            HttpClientError::Http(err.to_string())
        }
    }

    async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R, HttpClientError> {
        if !response.ok() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpClientError::ServerError {
                status: response.status(),
                message,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| HttpClientError::Parse(e.to_string()))
    }

    /// Same-origin capable client; an empty base URL yields relative requests.
    #[derive(Debug, Clone)]
    pub struct HttpClient {
        base_url: String,
    }

    impl HttpClient {
        pub fn new(base_url: &str) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        pub fn url(&self, path: &str) -> String {
            join_url(&self.base_url, path)
        }

        pub async fn post_json<T: Serialize, R: DeserializeOwned>(
            &self,
            path: &str,
            body: &T,
        ) -> Result<R, HttpClientError> {
            let response = Request::post(&self.url(path))
                .json(body)
                .map_err(|e| HttpClientError::Parse(e.to_string()))?
                .send()
                .await?;
            read_json(response).await
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod platform {
    use super::*;

    impl From<reqwest::Error> for HttpClientError {
        fn from(err: reqwest::Error) -> Self {
            if err.is_timeout() {
                HttpClientError::Timeout
            } else if err.is_connect() {
                HttpClientError::Connection(err.to_string())
            } else if err.is_decode() {
                HttpClientError::Parse(err.to_string())
            } else {
                HttpClientError::Http(err.to_string())
            }
        }
    }

    async fn read_json<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, HttpClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpClientError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| HttpClientError::Parse(e.to_string()))
    }

    #[derive(Debug, Clone)]
    pub struct HttpClient {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpClient {
        pub fn new(base_url: &str) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        pub fn url(&self, path: &str) -> String {
            join_url(&self.base_url, path)
        }

        pub async fn post_json<T: Serialize, R: DeserializeOwned>(
            &self,
            path: &str,
            body: &T,
        ) -> Result<R, HttpClientError> {
            let response = self.client.post(self.url(path)).json(body).send().await?;
            read_json(response).await
        }
    }
}

pub use platform::HttpClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://host:5000", "/save"), "http://host:5000/save");
        assert_eq!(join_url("http://host:5000", "save"), "http://host:5000/save");
        assert_eq!(join_url("", "/save"), "/save");
    }

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let client = HttpClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/x"), "http://localhost:5000/x");
    }
}
