// Upload flows: push local workflow files to the instance. Files that carry
// an id update that workflow; files without one become new workflows and get
// the new id written back.

use crate::model::{Workflow, WorkflowPayload};
use crate::prompt::Prompt;
use crate::store::file_name;
use crate::ui::{with_spinner, Session};
use anyhow::{bail, Context, Result};
use log::warn;
use std::path::{Path, PathBuf};

/// Outcome counts of a bulk upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Update workflow `id` from a document, optionally saving the server's
/// current version under `backups/` first. A failed backup is reported but
/// does not stop the update.
pub fn push_update(session: &Session, id: &str, workflow: &Workflow, backup: bool) -> Result<Workflow> {
    if backup {
        let saved = session
            .api
            .get_workflow(id)
            .context("Failed to fetch the current version")
            .and_then(|current| session.store.backup_remote(&current));
        match saved {
            Ok(path) => println!("  Backed up the n8n version: {}", file_name(&path)),
            Err(e) => {
                warn!("backup of {} failed: {:#}", id, e);
                println!("  Could not back up the n8n version: {:#}", e);
            }
        }
    }

    println!("\nUpdating workflow ID {}...", id);
    let updated = match with_spinner("Updating workflow...", || {
        session.api.update_workflow(id, &WorkflowPayload::from_workflow(workflow))
    }) {
        Ok(updated) => updated,
        Err(e) if e.is_not_found() => bail!(
            "Workflow ID {} does not exist on n8n. Remove the id from the file to create it as a new workflow.",
            id
        ),
        Err(e) => return Err(e).with_context(|| format!("Failed to update workflow {}", id)),
    };
    println!("Workflow ID {} updated!", id);
    Ok(updated)
}

/// Create a new workflow named `name` from a document. When `file` is given
/// the assigned id is recorded in it.
pub fn push_create(session: &Session, name: &str, workflow: &Workflow, file: Option<&Path>) -> Result<Workflow> {
    if workflow.nodes.is_none() {
        bail!("the workflow document has no 'nodes'");
    }
    let mut payload = WorkflowPayload::from_workflow(workflow);
    payload.name = name.to_string();

    println!("\nCreating workflow: {}", name);
    let created = with_spinner("Creating workflow...", || session.api.create_workflow(&payload))
        .with_context(|| format!("Failed to create workflow '{}'", name))?;
    println!("New workflow created. ID: {}", created.id_or_placeholder());

    if let (Some(path), Some(id)) = (file, created.id.as_deref()) {
        match session.store.set_id(path, id) {
            Ok(()) => println!("Recorded the new ID in {}", file_name(path)),
            Err(e) => {
                warn!("could not record id {} in {}: {:#}", id, path.display(), e);
                println!("Could not update the file: {:#}", e);
            }
        }
    }
    Ok(created)
}

/// Name for a workflow created from a file: asked for, falling back to the
/// document's name and then to the file stem.
fn creation_name(prompt: &mut dyn Prompt, workflow: &Workflow, path: &Path) -> Result<String> {
    let fallback = if workflow.name.is_empty() {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unnamed workflow".to_string())
    } else {
        workflow.name.clone()
    };
    let answer = prompt.text(&format!("Name for the new workflow (Enter for '{}')", fallback))?;
    let answer = answer.trim();
    Ok(if answer.is_empty() { fallback } else { answer.to_string() })
}

fn list_files(session: &Session) -> Result<Option<Vec<PathBuf>>> {
    let files = session.store.list_files()?;
    if files.is_empty() {
        println!(
            "\nNo workflow files to upload in {}.",
            session.store.dir().display()
        );
        return Ok(None);
    }
    println!("\nFound {} workflow files:", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{}. {}", idx + 1, file_name(path));
    }
    Ok(Some(files))
}

/// Option 8: upload every file in the workflows directory.
pub fn upload_all(session: &Session, prompt: &mut dyn Prompt) -> Result<UploadSummary> {
    let mut summary = UploadSummary::default();
    let files = match list_files(session)? {
        Some(files) => files,
        None => return Ok(summary),
    };
    if !prompt.confirm("\nUpload all workflow files to n8n?")? {
        return Ok(summary);
    }

    for path in &files {
        let workflow = match session.store.read(path) {
            Ok(workflow) => workflow,
            Err(e) => {
                println!("\n{:#}", e);
                summary.failed += 1;
                continue;
            }
        };

        match workflow.id.clone() {
            Some(id) => {
                println!("\nUpdating '{}' (ID: {})...", workflow.display_name(), id);
                match push_update(session, &id, &workflow, false) {
                    Ok(_) => summary.updated += 1,
                    Err(e) => {
                        println!("{:#}", e);
                        summary.failed += 1;
                    }
                }
            }
            None => {
                println!(
                    "\n{} has no workflow ID. A new workflow has to be created.",
                    file_name(path)
                );
                if !prompt.confirm("Create a new workflow?")? {
                    println!("Skipping this file.");
                    summary.skipped += 1;
                    continue;
                }
                let name = creation_name(prompt, &workflow, path)?;
                match push_create(session, &name, &workflow, Some(path.as_path())) {
                    Ok(_) => summary.created += 1,
                    Err(e) => {
                        println!("{:#}", e);
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    println!("\nDone.");
    println!("- {} workflows updated.", summary.updated);
    println!("- {} new workflows created.", summary.created);
    println!("- {} files failed.", summary.failed);
    if summary.skipped > 0 {
        println!("- {} files skipped.", summary.skipped);
    }
    Ok(summary)
}

/// Option 9: upload one file picked from the list.
pub fn upload_selected(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let mut files = match list_files(session)? {
        Some(files) => files,
        None => return Ok(()),
    };
    let idx = match prompt.choose("\nNumber of the workflow file to upload", files.len())? {
        Some(idx) => idx,
        None => return Ok(()),
    };
    let path = files.swap_remove(idx);
    let workflow = session.store.read(&path)?;

    match workflow.id.clone() {
        Some(id) => {
            println!("\nWorkflow '{}' (ID: {}) will be updated.", workflow.display_name(), id);
            if prompt.confirm("Continue?")? {
                push_update(session, &id, &workflow, false)?;
            }
        }
        None => {
            println!(
                "\n{} has no workflow ID. A new workflow has to be created.",
                file_name(&path)
            );
            if prompt.confirm("Create a new workflow?")? {
                let name = creation_name(prompt, &workflow, &path)?;
                push_create(session, &name, &workflow, Some(path.as_path()))?;
            }
        }
    }
    Ok(())
}
