use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, HostPlatform, Notice, NoticeKind, WorkflowCommand, WorkflowController,
};
use shared::domain::{BoardId, HostContext, ItemId, PlaceholderId, TemplateId};
use storage::{KeyValueStore, Storage};
use tracing::debug;

/// Drives the document workflow from a terminal, standing in for the board
/// widget host.
#[derive(Parser, Debug)]
#[command(name = "docgen")]
struct Cli {
    #[arg(long, global = true)]
    board_id: Option<String>,
    #[arg(long, global = true)]
    item_id: Option<String>,
    /// Short-lived session token issued by the host platform.
    #[arg(long, global = true, env = "DOCGEN_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the provider sign-in URL.
    Login,
    /// Forgets the stored provider credentials.
    Logout,
    /// Lists the available templates.
    Templates,
    /// Lists a template's placeholders and the board's columns.
    Analyze {
        #[arg(long)]
        template: String,
    },
    /// Generates a document for the item and attaches it.
    Generate {
        #[arg(long)]
        template: String,
        /// `placeholder=column`; use `name` for the item name and an empty
        /// column to leave the placeholder unmapped.
        #[arg(long = "map", value_parser = parse_mapping)]
        mappings: Vec<(PlaceholderId, String)>,
        /// Fill unmapped placeholders with the suggested columns first.
        #[arg(long)]
        suggested: bool,
    },
}

fn parse_mapping(raw: &str) -> Result<(PlaceholderId, String), String> {
    match raw.split_once('=') {
        Some((placeholder, column)) if !placeholder.trim().is_empty() => Ok((
            PlaceholderId::from(placeholder.trim()),
            column.trim().to_string(),
        )),
        _ => Err(format!("expected placeholder=column, got '{raw}'")),
    }
}

struct TerminalHost;

#[async_trait]
impl HostPlatform for TerminalHost {
    async fn show_notice(&self, notice: Notice) -> Result<()> {
        match notice.kind {
            NoticeKind::Error => eprintln!("{}", notice.message),
            NoticeKind::Success | NoticeKind::Info => println!("{}", notice.message),
        }
        Ok(())
    }

    async fn request_refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn redirect(&self, url: &str) -> Result<()> {
        println!("Open this URL to connect your Microsoft account:\n{url}");
        Ok(())
    }
}

impl Cli {
    fn host_context(&self) -> HostContext {
        HostContext {
            board_id: self.board_id.as_deref().map(BoardId::from),
            item_id: self.item_id.as_deref().map(ItemId::from),
            short_lived_token: self.session_token.clone(),
        }
    }

    fn commands(&self) -> Vec<WorkflowCommand> {
        let context = WorkflowCommand::HostContext(self.host_context());
        match &self.command {
            Command::Login => vec![context, WorkflowCommand::InitiateLogin],
            Command::Logout => vec![WorkflowCommand::SignOut],
            Command::Templates => vec![context, WorkflowCommand::LoadTemplates],
            Command::Analyze { template } => {
                let mut commands = vec![
                    context,
                    WorkflowCommand::SelectTemplate(Some(TemplateId::from(template.as_str()))),
                ];
                // Selection only analyzes once a board is known; ask explicitly
                // so a missing board is reported.
                if self.board_id.is_none() {
                    commands.push(WorkflowCommand::AnalyzeTemplate);
                }
                commands
            }
            Command::Generate {
                template,
                mappings,
                suggested,
            } => {
                let mut commands = vec![
                    context,
                    WorkflowCommand::SelectTemplate(Some(TemplateId::from(template.as_str()))),
                ];
                if *suggested {
                    commands.push(WorkflowCommand::ApplySuggestedMappings);
                }
                commands.extend(mappings.iter().map(|(placeholder_id, column_id)| {
                    WorkflowCommand::UpdateMapping {
                        placeholder_id: placeholder_id.clone(),
                        column_id: column_id.clone(),
                    }
                }));
                commands.push(WorkflowCommand::GenerateDocument);
                commands
            }
        }
    }
}

fn print_templates(controller: &WorkflowController) {
    let templates = &controller.state().templates;
    if templates.is_empty() {
        println!("No templates found.");
    }
    for template in templates {
        println!(
            "{}\t{}\t{}",
            template.id, template.name, template.last_modified
        );
    }
}

fn print_analysis(controller: &WorkflowController) {
    let state = controller.state();
    println!("Placeholders:");
    for placeholder in &state.placeholders {
        let suggested = placeholder
            .suggested_column_id
            .as_ref()
            .map(|column| column.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}\t{}\tsuggested={suggested}",
            placeholder.id, placeholder.name
        );
    }
    println!("Columns:");
    for column in &state.columns {
        println!("  {}\t{}\t{}", column.id, column.title, column.kind);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let settings = load_settings();

    let storage = Storage::new(&settings.credentials_database_url).await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(storage);
    let mut controller = WorkflowController::from_settings(&settings, store, Arc::new(TerminalHost));

    for command in cli.commands() {
        controller.handle(command).await?;
    }

    match &cli.command {
        Command::Login => {}
        Command::Logout => println!("Signed out of Microsoft."),
        Command::Templates => print_templates(&controller),
        Command::Analyze { .. } => print_analysis(&controller),
        Command::Generate { .. } => {
            let Some(document) = controller.state().last_document.as_deref() else {
                bail!("backend did not report a generated document");
            };
            debug!(%document, "generation finished");
        }
    }

    Ok(())
}
