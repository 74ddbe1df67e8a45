//! Error codes shared by every error type the agent can surface.
//!
//! Tool failures are reported back to the model as `{ok:false, error, code}`
//! payloads, so every error enum maps to a grepable `E_*` code here.

/// Grepable error code and retryable flag for structured error payloads.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
