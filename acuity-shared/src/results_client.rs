//! Client for the visual-acuity results endpoint.

use crate::http_client::{HttpClient, HttpClientError};
use crate::{SaveResultRequest, SaveResultResponse};

/// Path the results are posted to.
pub const SAVE_RESULTS_PATH: &str = "/Visual_Acuity_save_results";

/// Error type for results submission.
pub type ResultsError = HttpClientError;

/// Posts finished test results to the web application.
///
/// Works in both native Rust and WASM environments.
#[derive(Debug, Clone)]
pub struct ResultsClient {
    http: HttpClient,
}

impl ResultsClient {
    /// Create a client for the server at `base_url` (e.g. "http://localhost:5000").
    pub fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(base_url),
        }
    }

    /// Wrap an already configured HTTP client.
    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }

    /// Client issuing relative requests, for pages served by the same origin.
    pub fn same_origin() -> Self {
        Self::new("")
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Full URL the results are posted to.
    pub fn save_url(&self) -> String {
        self.http.url(SAVE_RESULTS_PATH)
    }

    /// POST the result; the server answers `{"success": bool}`.
    pub async fn save_result(
        &self,
        request: &SaveResultRequest,
    ) -> Result<SaveResultResponse, ResultsError> {
        self.http.post_json(SAVE_RESULTS_PATH, request).await
    }
}
