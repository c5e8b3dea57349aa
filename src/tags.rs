// Tag flows: list tags, show a workflow's tags, assign a tag and clear tags.

use crate::model::{Tag, TagRef};
use crate::prompt::Prompt;
use crate::ui::{pick_workflow, with_spinner, Session};
use anyhow::{Context, Result};

/// Option 11: tag sub-menu. Runs one action and returns to the main menu.
pub fn tags_menu(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    println!("\n----- Workflow tags -----");
    println!("1. List all tags");
    println!("2. Show a workflow's tags");
    println!("3. Assign a tag to a workflow");
    println!("4. Remove all tags from a workflow");
    println!("0. Back");
    match prompt.choose("Choose an option", 4)? {
        Some(0) => list_tags(session).map(drop),
        Some(1) => show_workflow_tags(session, prompt),
        Some(2) => assign_tag(session, prompt),
        Some(3) => remove_tags(session, prompt),
        _ => Ok(()),
    }
}

fn print_tags(tags: &[Tag]) {
    for (idx, tag) in tags.iter().enumerate() {
        println!("{}. ID: {} - Name: {}", idx + 1, tag.id, tag.name);
    }
}

/// Print every tag defined on the instance.
pub fn list_tags(session: &Session) -> Result<Vec<Tag>> {
    println!("\nFetching tags...");
    let tags = with_spinner("Fetching tags...", || session.api.list_tags())
        .context("Failed to fetch tags")?;
    if tags.is_empty() {
        println!("\nNo tags defined on this instance.");
    } else {
        println!("\nFound {} tags:\n", tags.len());
        print_tags(&tags);
    }
    Ok(tags)
}

pub fn show_workflow_tags(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, _) = match pick_workflow(session, prompt, "inspect")? {
        Some(picked) => picked,
        None => return Ok(()),
    };
    println!("\nFetching tags for workflow ID: {}...", id);
    let tags = session
        .api
        .workflow_tags(&id)
        .with_context(|| format!("Failed to fetch tags of workflow {}", id))?;
    if tags.is_empty() {
        println!("\nThis workflow has no tags.");
    } else {
        println!("\nTags assigned to this workflow:");
        print_tags(&tags);
    }
    Ok(())
}

/// Resolve the user's answer to a tag id: a list number, a known id, or any
/// other non-empty text taken as an id for the server to validate.
fn resolve_tag(answer: &str, tags: &[Tag]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Ok(n) = answer.parse::<usize>() {
        if (1..=tags.len()).contains(&n) {
            return Some(tags[n - 1].id.clone());
        }
    }
    Some(answer.to_string())
}

/// Add one tag to a workflow, keeping the tags it already has.
pub fn assign_tag(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, _) = match pick_workflow(session, prompt, "tag")? {
        Some(picked) => picked,
        None => return Ok(()),
    };
    let tags = list_tags(session)?;

    let answer = prompt.text("\nTag number or ID to assign")?;
    let tag_id = match resolve_tag(&answer, &tags) {
        Some(tag_id) => tag_id,
        None => {
            println!("Tag ID cannot be empty. Cancelled.");
            return Ok(());
        }
    };

    let current = session
        .api
        .workflow_tags(&id)
        .with_context(|| format!("Failed to fetch tags of workflow {}", id))?;
    if current.iter().any(|t| t.id == tag_id) {
        println!("\nWorkflow {} already has tag {}.", id, tag_id);
        return Ok(());
    }
    let mut refs: Vec<TagRef> = current.into_iter().map(|t| TagRef { id: t.id }).collect();
    refs.push(TagRef { id: tag_id });

    println!("\nAssigning tag to workflow ID: {}...", id);
    with_spinner("Assigning tag...", || session.api.set_workflow_tags(&id, &refs))
        .context("Failed to assign tag")?;
    println!("\nTag assigned!");
    Ok(())
}

pub fn remove_tags(session: &Session, prompt: &mut dyn Prompt) -> Result<()> {
    let (id, workflow) = match pick_workflow(session, prompt, "clear tags of")? {
        Some(picked) => picked,
        None => return Ok(()),
    };
    if !prompt.confirm(&format!("Remove all tags from '{}'?", workflow.display_name()))? {
        return Ok(());
    }
    println!("\nRemoving all tags from workflow ID: {}...", id);
    with_spinner("Removing tags...", || session.api.set_workflow_tags(&id, &[]))
        .context("Failed to remove tags")?;
    println!("\nAll tags removed!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn tag(id: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name: format!("tag-{}", id),
            extra: Map::new(),
        }
    }

    #[test]
    fn resolves_numbers_ids_and_blank() {
        let tags = [tag("aa"), tag("bb")];
        assert_eq!(resolve_tag("2", &tags).as_deref(), Some("bb"));
        assert_eq!(resolve_tag(" aa ", &tags).as_deref(), Some("aa"));
        assert_eq!(resolve_tag("17", &tags).as_deref(), Some("17"));
        assert_eq!(resolve_tag("  ", &tags), None);
    }
}
