use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    BoardId, Column, ItemId, MappingTarget, Placeholder, PlaceholderId, Template, TemplateId,
};

pub type PlaceholderMappings = BTreeMap<PlaceholderId, MappingTarget>;

/// Body of every `POST` to the backend endpoint; the variant is sent as `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackendRequest {
    GetMsAuthUrl,
    GetTemplates(TemplatesRequest),
    AnalyzeTemplate(AnalyzeTemplateRequest),
    GenerateDocument(GenerateDocumentRequest),
}

impl BackendRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetMsAuthUrl => "get_ms_auth_url",
            Self::GetTemplates(_) => "get_templates",
            Self::AnalyzeTemplate(_) => "analyze_template",
            Self::GenerateDocument(_) => "generate_document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesRequest {
    pub token: String,
}

/// Provider credential triple as sent to the backend. `expires_in` is seconds
/// from now and may be negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeTemplateRequest {
    pub data: AnalyzeTemplateData,
    #[serde(flatten)]
    pub credentials: CredentialPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTemplateData {
    pub template_id: TemplateId,
    pub board_id: BoardId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateDocumentRequest {
    pub data: GenerateDocumentData,
    #[serde(flatten)]
    pub credentials: CredentialPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentData {
    pub template_id: TemplateId,
    pub item_id: ItemId,
    pub placeholder_mappings: PlaceholderMappings,
}

/// Fields common to every reply, read before the action-specific payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Refreshed provider credentials the backend may attach to a successful reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<f64>,
}

impl TokenRotation {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.expires_in.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlReply {
    pub auth_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesReply {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(flatten)]
    pub rotation: TokenRotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReply {
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub rotation: TokenRotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReply {
    #[serde(default)]
    pub document_name: String,
    #[serde(flatten)]
    pub rotation: TokenRotation,
}
