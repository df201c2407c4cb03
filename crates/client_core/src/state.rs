//! Workflow state and the pure transitions on it. Nothing here performs I/O.

use serde::Serialize;
use shared::{
    domain::{
        BoardId, Column, HostContext, MappingTarget, Placeholder, PlaceholderId, Template,
        TemplateId,
    },
    protocol::PlaceholderMappings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    TemplatesLoading,
    TemplatesLoaded,
    Analyzing,
    MappingReady,
    Generating,
    Done,
    Error,
}

/// Which action is awaiting the backend. A renderer disables the matching
/// control while a flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InFlight {
    pub connecting: bool,
    pub loading_templates: bool,
    pub analyzing: bool,
    pub generating: bool,
}

impl InFlight {
    pub fn any(&self) -> bool {
        self.connecting || self.loading_templates || self.analyzing || self.generating
    }
}

/// Placeholder → source mapping whose keys always equal the loaded
/// placeholder ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaceholderMapping(PlaceholderMappings);

impl PlaceholderMapping {
    pub fn unmapped_for(placeholders: &[Placeholder]) -> Self {
        Self(
            placeholders
                .iter()
                .map(|placeholder| (placeholder.id.clone(), MappingTarget::Unmapped))
                .collect(),
        )
    }

    pub fn get(&self, placeholder_id: &PlaceholderId) -> Option<&MappingTarget> {
        self.0.get(placeholder_id)
    }

    /// Returns false, leaving the mapping untouched, for ids it does not hold.
    pub fn set(&mut self, placeholder_id: &PlaceholderId, target: MappingTarget) -> bool {
        match self.0.get_mut(placeholder_id) {
            Some(slot) => {
                *slot = target;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaceholderId, &MappingTarget)> {
        self.0.iter()
    }

    pub fn as_wire(&self) -> &PlaceholderMappings {
        &self.0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    pub phase: WorkflowPhase,
    pub host: Option<HostContext>,
    pub templates: Vec<Template>,
    pub selected_template: Option<TemplateId>,
    pub placeholders: Vec<Placeholder>,
    pub columns: Vec<Column>,
    pub mapping: PlaceholderMapping,
    pub in_flight: InFlight,
    pub error: Option<String>,
    pub last_document: Option<String>,
    /// Template/board pair most recently sent for analysis.
    #[serde(skip)]
    pub analyzed_for: Option<(TemplateId, BoardId)>,
}

impl WorkflowState {
    pub fn board_id(&self) -> Option<&BoardId> {
        self.host.as_ref().and_then(|host| host.board_id.as_ref())
    }

    pub fn host_token(&self) -> Option<&str> {
        self.host
            .as_ref()
            .and_then(|host| host.short_lived_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    /// The pair that should be analyzed next, if both halves are present and
    /// differ from the last analyzed pair.
    pub fn pending_analysis(&self) -> Option<(TemplateId, BoardId)> {
        let template_id = self.selected_template.clone()?;
        let board_id = self.board_id()?.clone();
        let key = (template_id, board_id);
        (self.analyzed_for.as_ref() != Some(&key)).then_some(key)
    }

    /// Clearing the selection forgets the analyzed pair, so picking the same
    /// template again analyzes it again.
    pub fn select_template(&mut self, template_id: Option<TemplateId>) {
        if template_id.is_none() {
            self.analyzed_for = None;
        }
        self.selected_template = template_id;
    }

    pub fn apply_host_context(&mut self, context: HostContext) {
        self.host = Some(context);
    }

    pub fn replace_analysis(&mut self, placeholders: Vec<Placeholder>, columns: Vec<Column>) {
        self.mapping = PlaceholderMapping::unmapped_for(&placeholders);
        self.placeholders = placeholders;
        self.columns = columns;
    }

    pub fn update_mapping(
        &mut self,
        placeholder_id: &PlaceholderId,
        target: MappingTarget,
    ) -> bool {
        self.mapping.set(placeholder_id, target)
    }

    /// Fills unmapped placeholders with the backend's suggested column.
    /// Returns how many entries changed.
    pub fn apply_suggested_mappings(&mut self) -> usize {
        let mut applied = 0;
        for placeholder in &self.placeholders {
            let Some(column_id) = placeholder.suggested_column_id.clone() else {
                continue;
            };
            let unmapped = self
                .mapping
                .get(&placeholder.id)
                .is_some_and(MappingTarget::is_unmapped);
            if unmapped
                && self
                    .mapping
                    .set(&placeholder.id, MappingTarget::Column(column_id))
            {
                applied += 1;
            }
        }
        applied
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn begin(&mut self, phase: WorkflowPhase) {
        self.clear_error();
        self.phase = phase;
    }

    pub fn finish(&mut self, phase: WorkflowPhase) {
        self.phase = phase;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = WorkflowPhase::Error;
        self.error = Some(message.into());
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
