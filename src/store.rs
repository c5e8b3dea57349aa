// Local workflow files: the `workflows/` directory that mirrors the
// instance and the `backups/` directory for copies taken before overwrites.

use crate::config::Config;
use crate::model::Workflow;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A workflow document read from disk together with where it came from.
#[derive(Debug, Clone)]
pub struct LocalWorkflow {
    pub path: PathBuf,
    pub file_name: String,
    pub workflow: Workflow,
}

#[derive(Debug, Clone)]
pub struct WorkflowStore {
    dir: PathBuf,
    backups_dir: PathBuf,
}

impl WorkflowStore {
    pub fn new(dir: impl Into<PathBuf>, backups_dir: impl Into<PathBuf>) -> Self {
        WorkflowStore {
            dir: dir.into(),
            backups_dir: backups_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.workflows_dir, &config.backups_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// `*.json` files in the workflows directory, sorted by file name.
    /// A missing directory is not an error and yields no files.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn read(&self, path: &Path) -> Result<Workflow> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("{} is not a valid workflow JSON file", file_name(path)))
    }

    /// Read every workflow file. Unreadable files are returned separately so
    /// callers can report them without aborting the whole run.
    pub fn load_all(&self) -> Result<(Vec<LocalWorkflow>, Vec<(PathBuf, anyhow::Error)>)> {
        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for path in self.list_files()? {
            match self.read(&path) {
                Ok(workflow) => loaded.push(LocalWorkflow {
                    file_name: file_name(&path),
                    path,
                    workflow,
                }),
                Err(e) => {
                    warn!("skipping {}: {:#}", path.display(), e);
                    failed.push((path, e));
                }
            }
        }
        Ok((loaded, failed))
    }

    /// Canonical location of a workflow: `{sanitized_name}_{id}.json`.
    pub fn path_for(&self, name: &str, id: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", sanitize_name(name), id))
    }

    /// Write a workflow as pretty JSON, creating the directory if needed.
    pub fn write(&self, path: &Path, workflow: &Workflow) -> Result<()> {
        let json = serde_json::to_string_pretty(workflow)?;
        write_file(path, &json)?;
        info!("wrote {}", path.display());
        Ok(())
    }

    /// Record the id assigned by the server in an existing file. The file is
    /// edited as raw JSON so nothing else in it changes.
    pub fn set_id(&self, path: &Path, id: &str) -> Result<()> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut doc: Value = serde_json::from_str(&data)
            .with_context(|| format!("{} is not valid JSON", file_name(path)))?;
        match doc.as_object_mut() {
            Some(obj) => {
                obj.insert("id".to_string(), Value::String(id.to_string()));
            }
            None => bail!("{} does not contain a JSON object", file_name(path)),
        }
        write_file(path, &serde_json::to_string_pretty(&doc)?)?;
        info!("recorded id {} in {}", id, path.display());
        Ok(())
    }

    /// Save the server's current version under `backups/` with a timestamp.
    pub fn backup_remote(&self, workflow: &Workflow) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = if workflow.name.is_empty() { "unknown" } else { &workflow.name };
        let path = self.backups_dir.join(format!(
            "{}_{}_{}.json",
            sanitize_name(name),
            workflow.id_or_placeholder(),
            stamp
        ));
        write_file(&path, &serde_json::to_string_pretty(workflow)?)?;
        info!("backed up workflow to {}", path.display());
        Ok(path)
    }

    /// Copy a file next to itself with a `.bck` suffix.
    pub fn backup_copy(&self, path: &Path) -> Result<PathBuf> {
        let mut target = path.as_os_str().to_owned();
        target.push(".bck");
        let target = PathBuf::from(target);
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
        Ok(target)
    }

    pub fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))
    }
}

/// Stage a file in git so its current content is kept in the index before
/// it is overwritten.
pub fn stage(path: &Path) -> Result<()> {
    let status = Command::new("git")
        .arg("add")
        .arg(path)
        .status()
        .context("Failed to run git")?;
    if !status.success() {
        bail!("git add {} exited with {}", path.display(), status);
    }
    Ok(())
}

/// Lower-cased name with spaces and path separators replaced by `_`.
pub fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(tmp: &tempfile::TempDir) -> WorkflowStore {
        WorkflowStore::new(tmp.path().join("workflows"), tmp.path().join("backups"))
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_name("Daily Report"), "daily_report");
        assert_eq!(sanitize_name("Ödeme / Iade"), "ödeme___iade");
        assert_eq!(sanitize_name("a\\b"), "a_b");
    }

    #[test]
    fn missing_directory_has_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store(&tmp).list_files().unwrap().is_empty());
    }

    #[test]
    fn write_then_list_and_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let wf: Workflow = serde_json::from_value(json!({"id": "x1", "name": "Sync Job"})).unwrap();
        let path = store.path_for(&wf.name, "x1");
        store.write(&path, &wf).unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let files = store.list_files().unwrap();
        assert_eq!(files, vec![store.dir().join("sync_job_x1.json")]);
        assert_eq!(store.read(&files[0]).unwrap(), wf);

        let text = fs::read_to_string(&files[0]).unwrap();
        assert!(text.contains("\n  \"name\": \"Sync Job\""));
    }

    #[test]
    fn load_all_separates_broken_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("a.json"), r#"{"name":"A"}"#).unwrap();
        fs::write(store.dir().join("b.json"), "{not json").unwrap();

        let (loaded, failed) = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].file_name, "a.json");
        assert_eq!(failed.len(), 1);
        assert!(failed[0].0.ends_with("b.json"));
    }

    #[test]
    fn set_id_keeps_other_fields_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.dir()).unwrap();
        let path = store.dir().join("draft.json");
        let original = r#"{
  "name": "Draft",
  "nodes": [],
  "connections": {},
  "meta": {
    "zeta": "last",
    "alpha": "first"
  }
}"#;
        fs::write(&path, original).unwrap();

        store.set_id(&path, "new-id").unwrap();
        let expected = r#"{
  "name": "Draft",
  "nodes": [],
  "connections": {},
  "meta": {
    "zeta": "last",
    "alpha": "first"
  },
  "id": "new-id"
}"#;
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);

        store.set_id(&path, "newer-id").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), expected.replace("new-id", "newer-id"));
    }

    #[test]
    fn write_keeps_unknown_fields_in_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let wf: Workflow = serde_json::from_str(
            r#"{"id":"k","name":"Keys","versionId":"v9","meta":{"zeta":1,"alpha":2},"createdAt":"2024"}"#,
        )
        .unwrap();
        let path = store.path_for(&wf.name, "k");
        store.write(&path, &wf).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let pos = |key: &str| text.find(key).unwrap();
        assert!(pos("\"versionId\"") < pos("\"meta\""));
        assert!(pos("\"zeta\"") < pos("\"alpha\""));
        assert!(pos("\"meta\"") < pos("\"createdAt\""));
    }

    #[test]
    fn backups() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let wf: Workflow = serde_json::from_value(json!({"id": "q", "name": "Queue Worker"})).unwrap();

        let backup = store.backup_remote(&wf).unwrap();
        let name = file_name(&backup);
        assert!(name.starts_with("queue_worker_q_"), "{}", name);
        assert!(backup.starts_with(tmp.path().join("backups")));

        let path = store.path_for(&wf.name, "q");
        store.write(&path, &wf).unwrap();
        let copy = store.backup_copy(&path).unwrap();
        assert_eq!(file_name(&copy), "queue_worker_q.json.bck");
        assert_eq!(fs::read(&copy).unwrap(), fs::read(&path).unwrap());
    }
}
