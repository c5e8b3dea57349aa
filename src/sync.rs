// Compare & synchronize: reconcile the workflows directory with the
// instance, show the result as a table and apply the merge actions the user
// chooses.

use crate::compare::Reconciliation;
use crate::model::Workflow;
use crate::prompt::Prompt;
use crate::store::file_name;
use crate::ui::{with_spinner, Session};
use crate::upload::{push_create, push_update};
use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, ContentArrangement, Table};
use log::warn;
use std::path::{Path, PathBuf};

const HEADERS: [&str; 4] = ["File name", "Workflow ID", "Workflow name", "Status"];

/// Option 10. Returns how many workflows were changed on either side.
pub fn compare_and_sync(session: &Session, prompt: &mut dyn Prompt) -> Result<usize> {
    println!("\nFetching workflows from n8n...");
    let remote = with_spinner("Fetching workflows...", || session.api.list_workflows())
        .context("Failed to fetch workflows from n8n")?;
    println!("Found {} workflows on n8n.", remote.len());

    let (local, unreadable) = session.store.load_all()?;
    for (path, e) in &unreadable {
        println!("Skipping {}: {:#}", file_name(path), e);
    }
    println!("Found {} workflow files on disk.", local.len());

    let plan = Reconciliation::build(remote, local);
    for dup in &plan.duplicates {
        warn!("{} repeats workflow id {}", dup.file_name, dup.workflow.id_or_placeholder());
        println!(
            "Ignoring {}: another file already has ID {}.",
            dup.file_name,
            dup.workflow.id_or_placeholder()
        );
    }

    print_table(&plan);
    print_summary(&plan);

    if plan.in_sync() {
        println!("\nAll workflows are in sync!");
        return Ok(0);
    }
    if !prompt.confirm("\nDo you want to apply changes?")? {
        return Ok(0);
    }

    let mut changed = 0;

    if !plan.differing.is_empty() {
        println!("\n--- Workflows with different content ---");
        for (i, pair) in plan.differing.iter().enumerate() {
            let reason = pair.difference.as_ref().map(|d| d.to_string()).unwrap_or_default();
            println!(
                "{}. '{}' (ID: {}): {}",
                i + 1,
                pair.remote.display_name(),
                pair.remote.id_or_placeholder(),
                reason
            );
        }
        for pair in &plan.differing {
            let id = pair.remote.id_or_placeholder();
            println!("\n> Workflow '{}' (ID: {}):", pair.remote.display_name(), id);
            let result = match choose_source(prompt)? {
                Source::File => {
                    let backup = prompt.confirm("  Back up the current n8n version first?")?;
                    println!("  Uploading file content to n8n: {}", pair.local.file_name);
                    push_update(session, id, &pair.local.workflow, backup).map(drop)
                }
                Source::Remote => {
                    println!("  Saving n8n content to file: {}", pair.local.path.display());
                    save_remote(session, prompt, &pair.remote, Some(pair.local.path.as_path())).map(drop)
                }
            };
            match result {
                Ok(()) => {
                    println!("  Updated!");
                    changed += 1;
                }
                Err(e) => println!("  {:#}", e),
            }
        }
    }

    if !plan.remote_only.is_empty() {
        println!("\n--- Workflows only on n8n ---");
        for (i, wf) in plan.remote_only.iter().enumerate() {
            println!("{}. '{}' (ID: {})", i + 1, wf.display_name(), wf.id_or_placeholder());
        }
        if prompt.confirm("\nCreate files for these workflows?")? {
            for wf in &plan.remote_only {
                println!("  Writing workflow file: {}", wf.display_name());
                match save_remote(session, prompt, wf, None) {
                    Ok(_) => {
                        println!("  Saved!");
                        changed += 1;
                    }
                    Err(e) => println!("  {:#}", e),
                }
            }
        }
    }

    if !plan.local_only.is_empty() {
        println!("\n--- Workflows only in files ---");
        for (i, file) in plan.local_only.iter().enumerate() {
            println!(
                "{}. '{}' (ID: {})",
                i + 1,
                file.workflow.display_name(),
                file.workflow.id.as_deref().unwrap_or("not set")
            );
        }
        if prompt.confirm("\nUpload these workflows to n8n?")? {
            for file in &plan.local_only {
                if let Some(stale) = &file.workflow.id {
                    println!("  ID {} does not exist on n8n; a new workflow will be created.", stale);
                }
                let name = if file.workflow.name.is_empty() {
                    file.path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.file_name.clone())
                } else {
                    file.workflow.name.clone()
                };
                match push_create(session, &name, &file.workflow, Some(file.path.as_path())) {
                    Ok(_) => {
                        println!("  Created and recorded the new ID in the file!");
                        changed += 1;
                    }
                    Err(e) => println!("  {:#}", e),
                }
            }
        }
    }

    println!("\nTotal workflows changed: {}", changed);
    Ok(changed)
}

enum Source {
    File,
    Remote,
}

fn choose_source(prompt: &mut dyn Prompt) -> Result<Source> {
    loop {
        let answer = prompt.text("  Which source should win? (file/n8n)")?;
        match answer.trim().to_lowercase().as_str() {
            "file" => return Ok(Source::File),
            "n8n" => return Ok(Source::Remote),
            _ => println!("  Invalid input. Please enter 'file' or 'n8n'."),
        }
    }
}

/// Write an n8n workflow to its canonical file. When it replaces a file
/// under a different name, the old file is either kept as `.bck` or removed.
pub fn save_remote(
    session: &Session,
    prompt: &mut dyn Prompt,
    workflow: &Workflow,
    original: Option<&Path>,
) -> Result<PathBuf> {
    let id = match workflow.id.as_deref() {
        Some(id) if !workflow.name.is_empty() => id,
        _ => bail!("the workflow has no ID or name"),
    };
    let store = &session.store;
    let target = store.path_for(&workflow.name, id);

    store.write(&target, workflow)?;
    println!("  Workflow saved: {}", file_name(&target));

    if let Some(original) = original.filter(|p| p.exists() && *p != target.as_path()) {
        println!("\n  Note: the file was renamed to {}", file_name(&target));
        if prompt.confirm("  Keep the original file as a .bck backup?")? {
            let backup = store.backup_copy(original)?;
            println!("  Original file backed up: {}", backup.display());
        }
        store.remove(original)?;
        println!("  Removed {}", file_name(original));
    }
    Ok(target)
}

fn reconciliation_table(plan: &Reconciliation) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(HEADERS.to_vec());

    let mut add = |file: &str, id: &str, name: &str, status: &str| {
        table.add_row(vec![Cell::new(file), Cell::new(id), Cell::new(name), Cell::new(status)]);
    };
    for pair in &plan.matching {
        add(&pair.local.file_name, pair.remote.id_or_placeholder(), pair.remote.display_name(), "MATCHING");
    }
    for pair in &plan.differing {
        add(&pair.local.file_name, pair.remote.id_or_placeholder(), pair.remote.display_name(), "DIFFERENT");
    }
    for wf in &plan.remote_only {
        add("---", wf.id_or_placeholder(), wf.display_name(), "ONLY IN N8N");
    }
    for file in &plan.local_only {
        add(&file.file_name, "---", file.workflow.display_name(), "ONLY IN FILE");
    }
    table
}

fn print_table(plan: &Reconciliation) {
    println!("\n{}", reconciliation_table(plan));
}

fn print_summary(plan: &Reconciliation) {
    println!("\n=== SUMMARY ===");
    println!("  Matching workflows:     {}", plan.matching.len());
    println!("  Different workflows:    {}", plan.differing.len());
    println!("  Only on n8n:            {}", plan.remote_only.len());
    println!("  Only in files:          {}", plan.local_only.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalWorkflow;
    use serde_json::json;
    use std::path::PathBuf;

    fn workflow(id: Option<&str>, name: &str) -> Workflow {
        let mut doc = json!({"name": name, "nodes": [], "connections": {}});
        if let Some(id) = id {
            doc["id"] = json!(id);
        }
        serde_json::from_value(doc).unwrap()
    }

    fn local(file: &str, id: Option<&str>, name: &str) -> LocalWorkflow {
        LocalWorkflow {
            path: PathBuf::from(file),
            file_name: file.to_string(),
            workflow: workflow(id, name),
        }
    }

    #[test]
    fn table_lists_every_bucket_unclipped() {
        let plan = Reconciliation::build(
            vec![workflow(Some("w1"), "請求書の処理"), workflow(Some("w2"), "Remote only")],
            vec![
                local("日本語のワークフロー.json", Some("w1"), "請求書の処理"),
                local("draft.json", None, "Draft"),
            ],
        );
        let mut table = reconciliation_table(&plan);
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.row_iter().count(), 3);

        let text = table.to_string();
        for expected in HEADERS.iter().chain(&["日本語のワークフロー.json", "請求書の処理", "MATCHING", "ONLY IN N8N", "ONLY IN FILE"]) {
            assert!(text.contains(expected), "missing {} in\n{}", expected, text);
        }
        assert!(text.starts_with('┌'), "{}", text);
    }
}
