//! Commands the controller sends back to the embedding host platform.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    pub timeout: u64,
}

#[async_trait]
pub trait HostPlatform: Send + Sync {
    async fn show_notice(&self, notice: Notice) -> Result<()>;
    /// Asks the host to reload the data it displays for the current item.
    async fn request_refresh(&self) -> Result<()>;
    /// Leaves the widget for an external page, such as the provider sign-in.
    async fn redirect(&self, url: &str) -> Result<()>;
}

/// Host used when the controller runs without an embedding platform.
pub struct DetachedHost;

#[async_trait]
impl HostPlatform for DetachedHost {
    async fn show_notice(&self, notice: Notice) -> Result<()> {
        info!(kind = ?notice.kind, message = %notice.message, "host notice (detached)");
        Ok(())
    }

    async fn request_refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn redirect(&self, url: &str) -> Result<()> {
        info!(%url, "redirect requested (detached)");
        Ok(())
    }
}
