#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response format: {0}")]
    Format(String),
    #[error("Failed to parse date/time: {0}")]
    DateTimeError(String),
}

/// Shorten an upstream body for error messages and logs
pub fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
