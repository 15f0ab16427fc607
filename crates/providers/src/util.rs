//! Shared helpers for provider adapters.

use rto_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeouts map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key: an explicitly passed key wins, otherwise the given
/// environment variable is consulted.
pub fn resolve_api_key(explicit: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = explicit {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    std::env::var(env_var).map_err(|_| {
        Error::Auth(format!(
            "no API key: pass --api-key or set the {env_var} environment variable"
        ))
    })
}
