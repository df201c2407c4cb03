use serde::{Deserialize, Serialize};

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Error body the backend returns alongside a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Reads the `error` field from a raw body. Bodies that are not JSON, or
    /// carry no usable `error`, yield the generic message.
    pub fn message_from_bytes(body: &[u8]) -> String {
        serde_json::from_slice::<Self>(body)
            .ok()
            .and_then(|parsed| parsed.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}
