use thiserror::Error;

/// Canonical error type for the admin tooling.
///
/// Nothing here is recovered from: every admin action is a deliberate,
/// manually-triggered one-shot, so failures print and terminate the run.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Missing or malformed local configuration (signing key, manifest).
    #[error("config error: {0}")]
    Config(String),

    /// Transaction serialization needed network state that could not be
    /// resolved (gas price, owned gas objects).
    #[error("build error: {0}")]
    Build(String),

    /// The network rejected the transaction, or execution aborted on-chain
    /// (duplicate tier threshold, stale capability, out-of-range percent).
    #[error("submission error: {0}")]
    Submission(String),

    /// A batch was handed to a dispatch path twice.
    #[error("transaction batch already dispatched")]
    AlreadyDispatched,

    /// HTTP transport failure while talking to the node.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
