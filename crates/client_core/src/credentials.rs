//! Provider token triple persisted in durable key/value storage.

use std::sync::Arc;

use chrono::Utc;
use shared::protocol::{CredentialPayload, TokenRotation};
use storage::KeyValueStore;
use tracing::{debug, info, warn};

use crate::error::WorkflowError;

pub const ACCESS_TOKEN_KEY: &str = "msAccessToken";
pub const REFRESH_TOKEN_KEY: &str = "msRefreshToken";
pub const TOKEN_EXPIRY_KEY: &str = "msTokenExpiry";

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_epoch_millis: i64,
}

impl ProviderTokenSet {
    /// Seconds until expiry; negative once expired. The backend decides what to
    /// do with an expired triple, so no local check happens here.
    pub fn expires_in_secs(&self, now_millis: i64) -> f64 {
        self.expiry_epoch_millis.saturating_sub(now_millis) as f64 / 1000.0
    }

    pub fn to_payload(&self, now_millis: i64) -> CredentialPayload {
        CredentialPayload {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: self.expires_in_secs(now_millis),
        }
    }

    /// Builds the triple of record from a reply. Anything short of all three
    /// fields, or an expiry past the representable range, is not a rotation.
    pub fn from_rotation(rotation: &TokenRotation, received_at_millis: i64) -> Option<Self> {
        let access_token = rotation.access_token.as_deref().filter(|v| !v.is_empty())?;
        let refresh_token = rotation.refresh_token.as_deref().filter(|v| !v.is_empty())?;
        let offset_millis = rotation
            .expires_in
            .map(|secs| (secs * 1000.0).round())
            .filter(|millis| millis.is_finite() && millis.abs() < i64::MAX as f64)?;
        let expiry_epoch_millis = received_at_millis.checked_add(offset_millis as i64)?;
        Some(Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expiry_epoch_millis,
        })
    }
}

/// Reads and writes the triple as three string keys. Every read and write
/// covers all three keys.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<ProviderTokenSet>, WorkflowError> {
        let access_token = self.read(ACCESS_TOKEN_KEY).await?;
        let refresh_token = self.read(REFRESH_TOKEN_KEY).await?;
        let expiry = self.read(TOKEN_EXPIRY_KEY).await?;

        let (Some(access_token), Some(refresh_token), Some(expiry)) =
            (access_token, refresh_token, expiry)
        else {
            debug!("provider credentials absent or partial");
            return Ok(None);
        };

        let Some(expiry_epoch_millis) = parse_expiry(&expiry) else {
            warn!(%expiry, "stored provider token expiry is not a number; treating credentials as absent");
            return Ok(None);
        };

        Ok(Some(ProviderTokenSet {
            access_token,
            refresh_token,
            expiry_epoch_millis,
        }))
    }

    pub async fn save(&self, tokens: &ProviderTokenSet) -> Result<(), WorkflowError> {
        let expiry = tokens.expiry_epoch_millis.to_string();
        self.store
            .set_many(&[
                (ACCESS_TOKEN_KEY, tokens.access_token.as_str()),
                (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
                (TOKEN_EXPIRY_KEY, expiry.as_str()),
            ])
            .await
            .map_err(|err| WorkflowError::Storage(format!("{err:#}")))
    }

    /// Persists the rotated triple a reply carried, if any. Returns whether
    /// storage changed.
    pub async fn apply_rotation(
        &self,
        action: &str,
        rotation: &TokenRotation,
        received_at_millis: i64,
    ) -> Result<bool, WorkflowError> {
        if rotation.is_empty() {
            return Ok(false);
        }
        let Some(tokens) = ProviderTokenSet::from_rotation(rotation, received_at_millis) else {
            warn!(
                action,
                "reply carried an incomplete or out-of-range token rotation; keeping stored credentials"
            );
            return Ok(false);
        };
        self.save(&tokens).await?;
        info!(
            action,
            expiry_epoch_millis = tokens.expiry_epoch_millis,
            "stored rotated provider credentials"
        );
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), WorkflowError> {
        self.store
            .remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY])
            .await
            .map_err(|err| WorkflowError::Storage(format!("{err:#}")))
    }

    async fn read(&self, key: &str) -> Result<Option<String>, WorkflowError> {
        let value = self
            .store
            .get(key)
            .await
            .map_err(|err| WorkflowError::Storage(format!("{err:#}")))?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}

// Some writers store the expiry as a float.
fn parse_expiry(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.round() as i64)
}

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod tests;
