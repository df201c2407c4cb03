use thiserror::Error;

pub const CONFIG_MISSING_MESSAGE: &str =
    "NEXT_PUBLIC_BACKEND_URL is not defined. Check your environment or docgen.toml.";
pub const MISSING_CREDENTIAL_MESSAGE: &str = "Microsoft tokens are not available. Please log in.";
pub const MISSING_ITEM_MESSAGE: &str = "Please select a template and ensure you are on an item.";
pub const MISSING_HOST_TOKEN_MESSAGE: &str =
    "Host session token is not available yet. Wait for the board context to load.";
pub const MISSING_BOARD_MESSAGE: &str = "Please select a template and open a board.";

/// Failure of one user-initiated action. None of these end the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{}", CONFIG_MISSING_MESSAGE)]
    ConfigMissing,
    #[error("{}", MISSING_CREDENTIAL_MESSAGE)]
    MissingCredential,
    #[error("{0}")]
    MissingContext(&'static str),
    #[error("Backend error: {status} - {message}")]
    BackendStatus { status: u16, message: String },
    #[error("{0}")]
    BackendRejected(String),
    #[error("{0}")]
    Network(String),
    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// True when the action never reached the backend.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing | Self::MissingCredential | Self::MissingContext(_)
        )
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network(value.to_string())
    }
}
