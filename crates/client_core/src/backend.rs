//! Transport for the four backend actions. Everything goes to one endpoint as a
//! JSON `POST`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    error::BackendErrorBody,
    protocol::{BackendRequest, ReplyEnvelope},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::WorkflowError;

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Sends one action and returns the raw reply body of a 2xx response.
    /// `bearer` is the host's short-lived token, read fresh by the caller.
    async fn dispatch(
        &self,
        request: &BackendRequest,
        bearer: Option<&str>,
    ) -> Result<Value, WorkflowError>;
}

pub struct HttpBackend {
    http: Client,
    endpoint: Url,
}

impl HttpBackend {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn dispatch(
        &self,
        request: &BackendRequest,
        bearer: Option<&str>,
    ) -> Result<Value, WorkflowError> {
        let action = request.action();
        debug!(action, endpoint = %self.endpoint, "sending backend action");

        let mut builder = self.http.post(self.endpoint.clone()).json(request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = BackendErrorBody::message_from_bytes(&body);
            warn!(action, status = status.as_u16(), %message, "backend returned error status");
            return Err(WorkflowError::BackendStatus {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| WorkflowError::Network(format!("invalid {action} reply: {err}")))
    }
}

/// Checks the `success` flag and decodes the action payload. A `success:false`
/// reply surfaces the backend's `error`, or `fallback` when it sent none.
pub fn decode_reply<T: DeserializeOwned>(
    action: &str,
    fallback: &str,
    body: Value,
) -> Result<T, WorkflowError> {
    let envelope: ReplyEnvelope = serde_json::from_value(body.clone())
        .map_err(|err| WorkflowError::Network(format!("invalid {action} reply: {err}")))?;
    if !envelope.success {
        let message = envelope
            .error
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        return Err(WorkflowError::BackendRejected(message));
    }
    serde_json::from_value(body)
        .map_err(|err| WorkflowError::Network(format!("malformed {action} reply: {err}")))
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
