/// Error types shared across Waypost crates.
///
/// These errors represent failures in infrastructure components (outbound
/// HTTP, feed parsing) common to the services. Application-specific errors
/// are defined in each crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed upstream returned error status {status}")]
    Upstream { status: reqwest::StatusCode },
}
