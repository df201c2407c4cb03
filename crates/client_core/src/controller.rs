use std::sync::Arc;

use shared::{
    domain::{HostContext, MappingTarget, PlaceholderId, TemplateId},
    protocol::{
        AnalysisReply, AnalyzeTemplateData, AnalyzeTemplateRequest, AuthUrlReply, BackendRequest,
        GenerateDocumentData, GenerateDocumentRequest, GenerationReply, TemplatesReply,
        TemplatesRequest, TokenRotation,
    },
};
use storage::KeyValueStore;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    backend::{decode_reply, BackendApi, HttpBackend},
    config::Settings,
    credentials::{Clock, CredentialStore, ProviderTokenSet, SystemClock},
    error::{
        WorkflowError, MISSING_BOARD_MESSAGE, MISSING_HOST_TOKEN_MESSAGE, MISSING_ITEM_MESSAGE,
    },
    host::{DetachedHost, HostPlatform, Notice, NoticeKind},
    state::{WorkflowPhase, WorkflowState},
};

pub const DEFAULT_NOTICE_TIMEOUT_MS: u64 = 10_000;
pub const GENERATED_TOAST_MESSAGE: &str = "Document generated and added to item files";

const AUTH_URL_FALLBACK: &str = "Failed to get Microsoft auth URL";
const TEMPLATES_FALLBACK: &str = "Failed to load templates";
const ANALYZE_FALLBACK: &str = "Failed to analyze template";
const GENERATE_FALLBACK: &str = "Failed to generate document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Toast { level: ToastLevel, message: String },
    PhaseChanged(WorkflowPhase),
}

/// Owns the wizard state for one session and issues the backend actions in
/// dependency order. Operations take `&mut self`, so at most one backend
/// request is outstanding.
pub struct WorkflowController {
    backend: Option<Arc<dyn BackendApi>>,
    credentials: CredentialStore,
    host: Arc<dyn HostPlatform>,
    clock: Arc<dyn Clock>,
    notice_timeout_ms: u64,
    state: WorkflowState,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowController {
    /// `backend` is `None` when no endpoint is configured; every action then
    /// fails with [`WorkflowError::ConfigMissing`].
    pub fn new(backend: Option<Arc<dyn BackendApi>>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::new_with_dependencies(
            backend,
            store,
            Arc::new(DetachedHost),
            Arc::new(SystemClock),
        )
    }

    pub fn new_with_dependencies(
        backend: Option<Arc<dyn BackendApi>>,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            backend,
            credentials: CredentialStore::new(store),
            host,
            clock,
            notice_timeout_ms: DEFAULT_NOTICE_TIMEOUT_MS,
            state: WorkflowState::default(),
            events,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostPlatform>,
    ) -> Self {
        let backend = settings.backend_url.clone().map(|endpoint| {
            info!(%endpoint, "using document backend");
            Arc::new(HttpBackend::new(endpoint)) as Arc<dyn BackendApi>
        });
        if backend.is_none() {
            error!("backend url is not configured; every action will fail until it is set");
        }
        let mut controller =
            Self::new_with_dependencies(backend, store, host, Arc::new(SystemClock));
        controller.notice_timeout_ms = settings.notice_timeout_ms;
        controller
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Asks the backend for the provider sign-in URL and hands it to the host
    /// for redirection.
    pub async fn initiate_provider_login(&mut self) -> Result<String, WorkflowError> {
        let backend = self.require_backend()?;
        self.state.clear_error();
        self.state.in_flight.connecting = true;

        let bearer = self.state.host_token().map(str::to_string);
        let request = BackendRequest::GetMsAuthUrl;
        let result = async {
            let body = backend.dispatch(&request, bearer.as_deref()).await?;
            decode_reply::<AuthUrlReply>(request.action(), AUTH_URL_FALLBACK, body)
        }
        .await;
        self.state.in_flight.connecting = false;

        let reply = result.map_err(|err| self.surface(request.action(), err))?;
        info!(auth_url = %reply.auth_url, "redirecting to provider sign-in");
        if let Err(err) = self.host.redirect(&reply.auth_url).await {
            warn!(error = %err, "host failed to redirect to provider sign-in");
        }
        Ok(reply.auth_url)
    }

    pub async fn load_templates(&mut self) -> Result<usize, WorkflowError> {
        let backend = self.require_backend()?;
        let Some(token) = self.state.host_token().map(str::to_string) else {
            return Err(self.surface(
                "get_templates",
                WorkflowError::MissingContext(MISSING_HOST_TOKEN_MESSAGE),
            ));
        };

        self.state.begin(WorkflowPhase::TemplatesLoading);
        self.state.in_flight.loading_templates = true;
        self.publish_phase();

        let request = BackendRequest::GetTemplates(TemplatesRequest {
            token: token.clone(),
        });
        let result = async {
            let body = backend.dispatch(&request, Some(&token)).await?;
            let reply =
                decode_reply::<TemplatesReply>(request.action(), TEMPLATES_FALLBACK, body)?;
            self.persist_rotation(request.action(), &reply.rotation).await?;
            Ok::<_, WorkflowError>(reply.templates)
        }
        .await;
        self.state.in_flight.loading_templates = false;

        let templates = result.map_err(|err| self.surface(request.action(), err))?;
        info!(count = templates.len(), "templates loaded");
        let count = templates.len();
        self.state.templates = templates;
        self.state.finish(WorkflowPhase::TemplatesLoaded);
        self.publish_phase();
        Ok(count)
    }

    /// Sets the selected template. Analysis follows automatically when a
    /// board is known and the pair has not been analyzed yet.
    pub async fn select_template(
        &mut self,
        template_id: Option<TemplateId>,
    ) -> Result<(), WorkflowError> {
        self.state.select_template(template_id);
        self.reconcile_analysis().await
    }

    /// Takes a context push from the host; a board change re-analyzes the
    /// selected template.
    pub async fn apply_host_context(&mut self, context: HostContext) -> Result<(), WorkflowError> {
        self.state.apply_host_context(context);
        self.reconcile_analysis().await
    }

    /// Analyzes the selected template against the current board, even if that
    /// pair was analyzed before.
    pub async fn analyze_template(&mut self) -> Result<(), WorkflowError> {
        let backend = self.require_backend()?;
        let (Some(template_id), Some(board_id)) = (
            self.state.selected_template.clone(),
            self.state.board_id().cloned(),
        ) else {
            return Err(self.surface(
                "analyze_template",
                WorkflowError::MissingContext(MISSING_BOARD_MESSAGE),
            ));
        };
        let data = AnalyzeTemplateData {
            template_id,
            board_id,
        };
        self.run_analysis(backend, data).await
    }

    /// Points one placeholder at a column id, `"name"`, or `""`. The column is
    /// not checked against the loaded columns.
    pub fn update_mapping(&mut self, placeholder_id: &PlaceholderId, column_id: &str) -> bool {
        let updated = self
            .state
            .update_mapping(placeholder_id, MappingTarget::from(column_id));
        if !updated {
            warn!(placeholder_id = %placeholder_id, "ignoring mapping for unknown placeholder");
        }
        updated
    }

    pub fn apply_suggested_mappings(&mut self) -> usize {
        let applied = self.state.apply_suggested_mappings();
        info!(applied, "applied suggested column mappings");
        applied
    }

    pub async fn generate_document(&mut self) -> Result<String, WorkflowError> {
        let backend = self.require_backend()?;
        let item_id = self
            .state
            .host
            .as_ref()
            .and_then(|host| host.item_id.clone());
        let (Some(template_id), Some(item_id)) = (self.state.selected_template.clone(), item_id)
        else {
            return Err(self.surface(
                "generate_document",
                WorkflowError::MissingContext(MISSING_ITEM_MESSAGE),
            ));
        };
        let tokens = self.require_credentials("generate_document").await?;
        let bearer = self.state.host_token().map(str::to_string);

        self.state.begin(WorkflowPhase::Generating);
        self.state.in_flight.generating = true;
        self.publish_phase();
        info!(
            template_id = %template_id,
            item_id = %item_id,
            mapped = self.state.mapping.len(),
            "generating document"
        );

        let request = BackendRequest::GenerateDocument(GenerateDocumentRequest {
            data: GenerateDocumentData {
                template_id,
                item_id,
                placeholder_mappings: self.state.mapping.as_wire().clone(),
            },
            credentials: tokens.to_payload(self.clock.now_millis()),
        });
        let result = async {
            let body = backend.dispatch(&request, bearer.as_deref()).await?;
            let reply =
                decode_reply::<GenerationReply>(request.action(), GENERATE_FALLBACK, body)?;
            self.persist_rotation(request.action(), &reply.rotation).await?;
            Ok::<_, WorkflowError>(reply.document_name)
        }
        .await;
        self.state.in_flight.generating = false;

        let document_name = result.map_err(|err| self.surface(request.action(), err))?;
        info!(%document_name, "document generated");
        self.state.last_document = Some(document_name.clone());
        self.state.finish(WorkflowPhase::Done);
        self.publish_phase();
        self.toast(ToastLevel::Success, GENERATED_TOAST_MESSAGE);

        let notice = Notice {
            message: format!("Document \"{document_name}\" generated successfully!"),
            kind: NoticeKind::Success,
            timeout: self.notice_timeout_ms,
        };
        if let Err(err) = self.host.show_notice(notice).await {
            warn!(error = %err, "host failed to show generation notice");
        }
        if let Err(err) = self.host.request_refresh().await {
            warn!(error = %err, "host failed to refresh after generation");
        }
        Ok(document_name)
    }

    /// Forgets the stored provider credentials.
    pub async fn sign_out(&mut self) -> Result<(), WorkflowError> {
        self.credentials
            .clear()
            .await
            .map_err(|err| self.surface("sign_out", err))?;
        info!("provider credentials cleared");
        Ok(())
    }

    async fn reconcile_analysis(&mut self) -> Result<(), WorkflowError> {
        let Some((template_id, board_id)) = self.state.pending_analysis() else {
            return Ok(());
        };
        let backend = self.require_backend()?;
        let data = AnalyzeTemplateData {
            template_id,
            board_id,
        };
        self.run_analysis(backend, data).await
    }

    async fn run_analysis(
        &mut self,
        backend: Arc<dyn BackendApi>,
        data: AnalyzeTemplateData,
    ) -> Result<(), WorkflowError> {
        let tokens = self.require_credentials("analyze_template").await?;
        let bearer = self.state.host_token().map(str::to_string);

        self.state.analyzed_for = Some((data.template_id.clone(), data.board_id.clone()));
        self.state.begin(WorkflowPhase::Analyzing);
        self.state.in_flight.analyzing = true;
        self.publish_phase();
        info!(template_id = %data.template_id, board_id = %data.board_id, "analyzing template");

        let request = BackendRequest::AnalyzeTemplate(AnalyzeTemplateRequest {
            data,
            credentials: tokens.to_payload(self.clock.now_millis()),
        });
        let result = async {
            let body = backend.dispatch(&request, bearer.as_deref()).await?;
            let reply = decode_reply::<AnalysisReply>(request.action(), ANALYZE_FALLBACK, body)?;
            self.persist_rotation(request.action(), &reply.rotation).await?;
            Ok::<_, WorkflowError>(reply)
        }
        .await;
        self.state.in_flight.analyzing = false;

        let reply = result.map_err(|err| self.surface(request.action(), err))?;
        info!(
            placeholders = reply.placeholders.len(),
            columns = reply.columns.len(),
            "template analyzed"
        );
        self.state.replace_analysis(reply.placeholders, reply.columns);
        self.state.finish(WorkflowPhase::MappingReady);
        self.publish_phase();
        Ok(())
    }

    fn require_backend(&mut self) -> Result<Arc<dyn BackendApi>, WorkflowError> {
        match &self.backend {
            Some(backend) => Ok(backend.clone()),
            None => Err(self.surface("configuration", WorkflowError::ConfigMissing)),
        }
    }

    async fn require_credentials(
        &mut self,
        action: &str,
    ) -> Result<ProviderTokenSet, WorkflowError> {
        match self.credentials.load().await {
            Ok(Some(tokens)) => Ok(tokens),
            Ok(None) => Err(self.surface(action, WorkflowError::MissingCredential)),
            Err(err) => Err(self.surface(action, err)),
        }
    }

    async fn persist_rotation(
        &self,
        action: &str,
        rotation: &TokenRotation,
    ) -> Result<(), WorkflowError> {
        self.credentials
            .apply_rotation(action, rotation, self.clock.now_millis())
            .await
            .map(|_| ())
    }

    /// Records a failed action: error slot, error phase, error toast.
    fn surface(&mut self, action: &str, err: WorkflowError) -> WorkflowError {
        error!(action, error = %err, "workflow action failed");
        self.state.fail(err.to_string());
        self.publish_phase();
        self.toast(ToastLevel::Error, err.to_string());
        err
    }

    fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        let _ = self.events.send(WorkflowEvent::Toast {
            level,
            message: message.into(),
        });
    }

    fn publish_phase(&self) {
        let _ = self
            .events
            .send(WorkflowEvent::PhaseChanged(self.state.phase));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
