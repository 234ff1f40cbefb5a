//! Client-side metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the host
//! application installs a recorder.
//!
//! - `api_client_requests_total` (counter): labels `method`, `outcome`
//! - `api_client_token_refresh_total` (counter): label `result`

/// How a refresh triggered by a 401 was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshResult {
    /// The refresh endpoint issued a new pair
    Rotated,
    /// A concurrent request had already rotated the pair
    Reused,
    /// The session was cleared
    Failed,
}

impl RefreshResult {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshResult::Rotated => "rotated",
            RefreshResult::Reused => "reused",
            RefreshResult::Failed => "failed",
        }
    }
}

/// Record a completed call with its HTTP method and outcome label.
pub fn record_request(method: &str, outcome: &str) {
    metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_owned(),
        "outcome" => outcome.to_owned()
    )
    .increment(1);
}

pub fn record_refresh(result: RefreshResult) {
    metrics::counter!("api_client_token_refresh_total", "result" => result.label()).increment(1);
}
