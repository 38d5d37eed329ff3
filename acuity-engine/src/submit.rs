//! Best-effort posting of the final result.

use acuity_shared::{ResultsClient, SaveResultRequest};
use tracing::{error, info};

/// What happened to a submission. Never retried; the flow continues either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Server answered `success: true`
    Saved,
    /// Server answered `success: false`
    Rejected,
    /// Network, HTTP status or response parsing failed
    Failed(String),
}

impl SubmissionOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmissionOutcome::Saved)
    }
}

pub async fn submit_result(
    client: &ResultsClient,
    request: &SaveResultRequest,
) -> SubmissionOutcome {
    info!("Posting results to {}", client.save_url());
    match client.save_result(request).await {
        Ok(response) if response.success => {
            info!("Test results saved successfully.");
            SubmissionOutcome::Saved
        }
        Ok(_) => {
            info!("Error saving test results.");
            SubmissionOutcome::Rejected
        }
        Err(e) => {
            error!("Error: {e}");
            SubmissionOutcome::Failed(e.to_string())
        }
    }
}
