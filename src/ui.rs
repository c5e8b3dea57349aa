// UI layer: the numbered main menu and the single-workflow flows (list,
// fetch, create, rename, delete, activate). Upload, sync and tag flows live
// in their own modules and are dispatched from here.

use crate::api::ApiClient;
use crate::model::{Workflow, WorkflowPayload};
use crate::prompt::Prompt;
use crate::store::{self, WorkflowStore};
use crate::{sync, tags, upload};
use anyhow::{Context, Result};
use crossterm::style::{StyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::{cursor, execute};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::io;
use std::time::Duration;

const MENU: [&str; 12] = [
    "1. List all workflows (ID and name)",
    "2. Fetch workflow details by ID and save as JSON",
    "3. Create a new workflow",
    "4. Update an existing workflow",
    "5. Delete a workflow (by ID)",
    "6. Activate a workflow",
    "7. Deactivate a workflow",
    "8. Upload all workflows to n8n",
    "9. Upload a selected workflow to n8n",
    "10. Compare files with the API & synchronize",
    "11. Workflow tags",
    "0. Exit",
];

/// What every flow needs: the API client and the local file store.
pub struct Session {
    pub api: ApiClient,
    pub store: WorkflowStore,
}

impl Session {
    pub fn new(api: ApiClient, store: WorkflowStore) -> Self {
        Session { api, store }
    }
}

/// Main interactive loop. Each flow's errors are printed and the menu is
/// shown again; only a failure to read the menu choice ends the loop.
pub fn main_menu(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    loop {
        display_menu()?;
        let choice = prompt.text("Choose an option (0-11)")?;
        let outcome = match choice.trim() {
            "1" => list_workflows(session, prompt).map(drop),
            "2" => fetch_workflow(session, prompt),
            "3" => create_workflow(session, prompt),
            "4" => update_workflow(session, prompt),
            "5" => delete_workflow(session, prompt),
            "6" => set_active(session, prompt, true),
            "7" => set_active(session, prompt, false),
            "8" => upload::upload_all(session, prompt).map(drop),
            "9" => upload::upload_selected(session, prompt),
            "10" => sync::compare_and_sync(session, prompt).map(drop),
            "11" => tags::tags_menu(session, prompt),
            "0" => {
                println!("\nLeaving n8n-cli. Goodbye!");
                return Ok(());
            }
            _ => {
                println!("\nInvalid option. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("menu option {} failed: {:#}", choice.trim(), e);
            println!("\nError: {:#}", e);
        }
        prompt.pause()?;
    }
}

fn display_menu() -> Result<()> {
    let mut stdout = io::stdout();
    if stdout.is_tty() {
        execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    }
    println!("\n===== N8N API CLI =====");
    for item in MENU {
        println!("{}", item);
    }
    println!("=======================");
    Ok(())
}

/// Spinner shown on stderr while a request is in flight.
pub(crate) fn with_spinner<T>(message: &str, work: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = work();
    spinner.finish_and_clear();
    out
}

fn status_marker(active: bool) -> StyledContent<&'static str> {
    if active {
        "[Active]".green()
    } else {
        "[Inactive]".dark_grey()
    }
}

pub(crate) fn print_workflows(workflows: &[Workflow]) {
    println!("Found {} workflows:\n", workflows.len());
    for (idx, wf) in workflows.iter().enumerate() {
        println!(
            "{}. {} ID: {} - Name: {}",
            idx + 1,
            status_marker(wf.is_active()),
            wf.id_or_placeholder(),
            wf.display_name()
        );
    }
}

/// Fetch and print every workflow. Returns an empty list (after telling the
/// user) when the instance has none.
pub(crate) fn fetch_and_print(session: &Session) -> Result<Vec<Workflow>> {
    println!("\nFetching workflows...\n");
    let workflows = with_spinner("Fetching workflows...", || session.api.list_workflows())
        .context("Failed to fetch workflows")?;
    if workflows.is_empty() {
        println!("No workflows found.");
    } else {
        print_workflows(&workflows);
    }
    Ok(workflows)
}

/// List workflows and let the user pick one by number. Workflows without an
/// id cannot be addressed and are rejected.
pub(crate) fn pick_workflow(
    session: &Session,
    prompt: &mut dyn Prompt,
    action: &str,
) -> Result<Option<(String, Workflow)>> {
    let mut workflows = fetch_and_print(session)?;
    if workflows.is_empty() {
        return Ok(None);
    }
    let idx = match prompt.choose(&format!("\nNumber of the workflow to {}", action), workflows.len())? {
        Some(idx) => idx,
        None => return Ok(None),
    };
    let workflow = workflows.swap_remove(idx);
    match workflow.id.clone() {
        Some(id) => Ok(Some((id, workflow))),
        None => {
            println!("The selected workflow has no ID.");
            Ok(None)
        }
    }
}

/// Option 1: list workflows and optionally save each one to its own file.
pub fn list_workflows(session: &Session, prompt: &mut dyn Prompt) -> Result<Vec<Workflow>> {
    let workflows = fetch_and_print(session)?;
    if workflows.is_empty() {
        return Ok(workflows);
    }

    if !prompt.confirm("\nSave every workflow to a separate file?")? {
        println!("\nWorkflows were not saved. Returning to the main menu.");
        return Ok(workflows);
    }

    let store = &session.store;
    println!("Files will be saved to {}...", store.dir().display());
    let any_existing = workflows
        .iter()
        .filter_map(|wf| wf.id.as_deref().map(|id| store.path_for(&wf.name, id)))
        .any(|path| path.exists());
    let stage_existing = any_existing && prompt.confirm("Stage existing files in git before overwriting?")?;

    for wf in &workflows {
        let id = match wf.id.as_deref() {
            Some(id) => id,
            None => {
                println!("Skipping '{}': it has no ID.", wf.display_name());
                continue;
            }
        };
        let path = store.path_for(&wf.name, id);
        if path.exists() {
            if !prompt.confirm(&format!("'{}' already exists. Overwrite it?", path.display()))? {
                println!("Skipped '{}'.", path.display());
                continue;
            }
            if stage_existing {
                report_stage(&path);
            }
        }
        match store.write(&path, wf) {
            Ok(()) => println!("Saved workflow '{}': {}", wf.display_name(), path.display()),
            Err(e) => println!("Failed to save workflow {}: {:#}", id, e),
        }
    }
    println!("\nAll selected workflows have been saved.");
    Ok(workflows)
}

/// Option 2: fetch one workflow's full document and save it as JSON.
pub fn fetch_workflow(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, summary) = match pick_workflow(session, prompt, "save")? {
        Some(picked) => picked,
        None => return Ok(()),
    };

    println!("\nFetching details for workflow ID: {}...", id);
    let workflow = with_spinner("Fetching workflow...", || session.api.get_workflow(&id))
        .with_context(|| format!("Failed to fetch workflow {}", id))?;

    let name = if workflow.name.is_empty() { &summary.name } else { &workflow.name };
    let path = session.store.path_for(name, &id);
    if path.exists() {
        if !prompt.confirm(&format!("'{}' already exists. Replace it?", path.display()))? {
            println!("Cancelled.");
            return Ok(());
        }
        if prompt.confirm("Keep the current version in git (git add) first?")? {
            report_stage(&path);
        }
    }

    session.store.write(&path, &workflow)?;
    println!("\nWorkflow details saved: {}", path.display());
    Ok(())
}

/// Option 3: create an empty workflow with the given name.
pub fn create_workflow(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let name = prompt.text("\nName for the new workflow")?;
    let name = name.trim();
    if name.is_empty() {
        println!("Workflow name cannot be empty. Cancelled.");
        return Ok(());
    }

    println!("\nCreating workflow '{}'...", name);
    let created = with_spinner("Creating workflow...", || {
        session.api.create_workflow(&WorkflowPayload::empty(name))
    })
    .context("Failed to create workflow")?;

    println!("\nWorkflow created!");
    println!("ID: {}", created.id_or_placeholder());
    println!("Name: {}", created.display_name());
    Ok(())
}

/// Option 4: rename an existing workflow.
pub fn update_workflow(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, _) = match pick_workflow(session, prompt, "update")? {
        Some(picked) => picked,
        None => return Ok(()),
    };

    let mut current = with_spinner("Fetching workflow...", || session.api.get_workflow(&id))
        .with_context(|| format!("Failed to fetch workflow {}", id))?;
    let new_name = prompt.text(&format!(
        "\nNew name (current: {}, press Enter to keep it)",
        current.display_name()
    ))?;
    if !new_name.trim().is_empty() {
        current.name = new_name.trim().to_string();
    }

    println!("\nUpdating workflow ID: {}...", id);
    with_spinner("Updating workflow...", || {
        session.api.update_workflow(&id, &WorkflowPayload::from_workflow(&current))
    })
    .with_context(|| format!("Failed to update workflow {}", id))?;
    println!("\nWorkflow updated!");
    Ok(())
}

/// Option 5: delete a workflow after the user types DELETE.
pub fn delete_workflow(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, workflow) = match pick_workflow(session, prompt, "DELETE")? {
        Some(picked) => picked,
        None => return Ok(()),
    };

    let confirm = prompt.text(&format!(
        "\nWARNING: you are about to DELETE '{}' (ID: {}).\nThis cannot be undone. Type DELETE to confirm",
        workflow.display_name(),
        id
    ))?;
    if confirm.trim() != "DELETE" {
        println!("\nDeletion cancelled.");
        return Ok(());
    }

    println!("\nDeleting workflow ID: {}...", id);
    with_spinner("Deleting workflow...", || session.api.delete_workflow(&id))
        .with_context(|| format!("Failed to delete workflow {}", id))?;
    println!("\nWorkflow deleted!");
    Ok(())
}

/// Options 6 and 7: activate or deactivate a workflow.
pub fn set_active(session: &Session, prompt: &mut dyn Prompt, active: bool) -> Result<()> {
    let (verb, state) = if active { ("activate", "active") } else { ("deactivate", "inactive") };
    let (id, workflow) = match pick_workflow(session, prompt, verb)? {
        Some(picked) => picked,
        None => return Ok(()),
    };
    let name = workflow.display_name();

    if workflow.is_active() == active {
        println!("\nWarning: workflow '{}' is already {}.", name, state);
        if !prompt.confirm("Continue anyway?")? {
            return Ok(());
        }
    }

    println!("\nWorkflow ID: {} '{}': {}...", id, name, verb);
    with_spinner("Sending request...", || {
        if active {
            session.api.activate_workflow(&id)
        } else {
            session.api.deactivate_workflow(&id)
        }
    })
    .with_context(|| format!("Failed to {} workflow '{}'", verb, name))?;
    println!("\nWorkflow '{}' is now {}!", name, state);
    Ok(())
}

fn report_stage(path: &std::path::Path) {
    match store::stage(path) {
        Ok(()) => println!("Staged the current file in git: {}", path.display()),
        Err(e) => {
            warn!("git staging failed for {}: {:#}", path.display(), e);
            println!("Could not stage {} in git: {:#}", path.display(), e);
        }
    }
}
