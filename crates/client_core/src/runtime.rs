//! Command queue feeding a single controller. Renderers and host bridges push
//! commands; outcomes come back through state and [`WorkflowEvent`]s.
//!
//! [`WorkflowEvent`]: crate::controller::WorkflowEvent

use shared::domain::{HostContext, PlaceholderId, TemplateId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{controller::WorkflowController, error::WorkflowError};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCommand {
    InitiateLogin,
    LoadTemplates,
    SelectTemplate(Option<TemplateId>),
    AnalyzeTemplate,
    UpdateMapping {
        placeholder_id: PlaceholderId,
        column_id: String,
    },
    ApplySuggestedMappings,
    GenerateDocument,
    SignOut,
    HostContext(HostContext),
}

impl WorkflowCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitiateLogin => "initiate_login",
            Self::LoadTemplates => "load_templates",
            Self::SelectTemplate(_) => "select_template",
            Self::AnalyzeTemplate => "analyze_template",
            Self::UpdateMapping { .. } => "update_mapping",
            Self::ApplySuggestedMappings => "apply_suggested_mappings",
            Self::GenerateDocument => "generate_document",
            Self::SignOut => "sign_out",
            Self::HostContext(_) => "host_context",
        }
    }
}

impl WorkflowController {
    pub async fn handle(&mut self, command: WorkflowCommand) -> Result<(), WorkflowError> {
        match command {
            WorkflowCommand::InitiateLogin => self.initiate_provider_login().await.map(|_| ()),
            WorkflowCommand::LoadTemplates => self.load_templates().await.map(|_| ()),
            WorkflowCommand::SelectTemplate(template_id) => {
                self.select_template(template_id).await
            }
            WorkflowCommand::AnalyzeTemplate => self.analyze_template().await,
            WorkflowCommand::UpdateMapping {
                placeholder_id,
                column_id,
            } => {
                self.update_mapping(&placeholder_id, &column_id);
                Ok(())
            }
            WorkflowCommand::ApplySuggestedMappings => {
                self.apply_suggested_mappings();
                Ok(())
            }
            WorkflowCommand::GenerateDocument => self.generate_document().await.map(|_| ()),
            WorkflowCommand::SignOut => self.sign_out().await,
            WorkflowCommand::HostContext(context) => self.apply_host_context(context).await,
        }
    }
}

/// Drains `commands` in order, one at a time, until every sender is dropped.
/// A failed command is already surfaced by the controller, so the loop moves
/// on to the next one.
pub async fn run_workflow(
    mut controller: WorkflowController,
    mut commands: mpsc::Receiver<WorkflowCommand>,
) -> WorkflowController {
    info!("workflow runtime started");
    while let Some(command) = commands.recv().await {
        let name = command.name();
        debug!(command = name, "handling workflow command");
        if let Err(err) = controller.handle(command).await {
            warn!(command = name, error = %err, "workflow command failed");
        }
    }
    info!("workflow runtime stopped: command channel closed");
    controller
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
