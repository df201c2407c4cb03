//! Session controller for the document-template workflow: sign in with the
//! document provider, pick a template, map its placeholders to board columns
//! and generate a document for the current item.

pub mod backend;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod host;
pub mod runtime;
pub mod state;

pub use backend::{BackendApi, HttpBackend};
pub use config::{load_settings, Settings};
pub use controller::{ToastLevel, WorkflowController, WorkflowEvent};
pub use credentials::{Clock, CredentialStore, ProviderTokenSet, SystemClock};
pub use error::WorkflowError;
pub use host::{DetachedHost, HostPlatform, Notice, NoticeKind};
pub use runtime::{run_workflow, WorkflowCommand};
pub use state::{InFlight, PlaceholderMapping, WorkflowPhase, WorkflowState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
