// Documents exchanged with the n8n public API and stored on disk.
//
// The platform owns the workflow schema, so only the fields this tool reads
// or writes are typed. Everything else is carried in `extra` and written
// back untouched.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Execution order sent when a document does not carry one.
pub const DEFAULT_EXECUTION_ORDER: &str = "v1";

/// A workflow as returned by `/api/v1/workflows` or read from a local file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// `None` when the document has no `nodes` key at all, which makes it
    /// unusable as an upload source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub connections: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub static_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    pub fn nodes(&self) -> &[Value] {
        self.nodes.as_deref().unwrap_or(&[])
    }

    /// Name for display; files are allowed to omit it.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed workflow"
        } else {
            &self.name
        }
    }

    pub fn id_or_placeholder(&self) -> &str {
        self.id.as_deref().unwrap_or("---")
    }

    pub fn execution_order(&self) -> Option<&Value> {
        self.settings.as_ref().and_then(|s| s.get("executionOrder"))
    }
}

/// A tag entity. Extra fields such as `createdAt` are preserved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tag {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Element of the body sent to `PUT /workflows/{id}/tags`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub id: String,
}

/// The writable subset of a workflow, used for create and update. The API
/// rejects read-only properties such as `id`, `active` or `tags`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    pub name: String,
    pub nodes: Vec<Value>,
    pub connections: Value,
    pub settings: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_data: Option<Value>,
}

impl WorkflowPayload {
    /// Minimal workflow with no nodes.
    pub fn empty(name: &str) -> Self {
        WorkflowPayload {
            name: name.to_string(),
            nodes: Vec::new(),
            connections: Value::Object(Map::new()),
            settings: execution_settings(None),
            static_data: None,
        }
    }

    /// Strip a full document down to what the API accepts.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let connections = match &workflow.connections {
            Some(c) if !c.is_null() => c.clone(),
            _ => Value::Object(Map::new()),
        };
        WorkflowPayload {
            name: workflow.name.clone(),
            nodes: workflow.nodes().to_vec(),
            connections,
            settings: execution_settings(workflow.execution_order()),
            static_data: workflow.static_data.clone().filter(Value::is_object),
        }
    }
}

fn execution_settings(order: Option<&Value>) -> Value {
    let order = order
        .filter(|v| v.is_string())
        .cloned()
        .unwrap_or_else(|| Value::String(DEFAULT_EXECUTION_ORDER.to_string()));
    let mut settings = Map::new();
    settings.insert("executionOrder".to_string(), order);
    Value::Object(settings)
}

/// List responses come either paged (`{"data": [...], "nextCursor": ...}`)
/// or, on older instances, as a bare array.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Listing<T> {
    Page {
        data: Vec<T>,
        #[serde(default, rename = "nextCursor")]
        next_cursor: Option<String>,
    },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    /// Split into items and the cursor of the next page, if any.
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Listing::Page { data, next_cursor } => {
                (data, next_cursor.filter(|c| !c.is_empty()))
            }
            Listing::Bare(items) => (items, None),
        }
    }
}

// Ids are strings on current instances and integers on old ones.
fn id_from_value<E: de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(E::custom(format!("id must be a string or number, got {other}"))),
    }
}

fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    id_from_value(Value::deserialize(d)?)
}

fn required_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    id_from_value(Value::deserialize(d)?)?.ok_or_else(|| de::Error::custom("tag id is empty"))
}

// Keeps an explicit `null` as `Some(Value::Null)` so it is written back.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_become_strings() {
        let wf: Workflow = serde_json::from_value(json!({"id": 42, "name": "Old"})).unwrap();
        assert_eq!(wf.id.as_deref(), Some("42"));

        let wf: Workflow = serde_json::from_value(json!({"id": "", "name": "New"})).unwrap();
        assert_eq!(wf.id, None);

        assert!(serde_json::from_value::<Workflow>(json!({"id": true})).is_err());
    }

    #[test]
    fn unknown_fields_and_nulls_survive_a_round_trip() {
        let doc = json!({
            "id": "abc",
            "name": "Mailer",
            "active": false,
            "nodes": [{"id": "n1", "name": "Start"}],
            "connections": {},
            "settings": {"executionOrder": "v1", "timezone": "Europe/Istanbul"},
            "staticData": null,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "versionId": "v-1"
        });
        let wf: Workflow = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(wf.extra.get("versionId"), Some(&json!("v-1")));
        assert_eq!(serde_json::to_value(&wf).unwrap(), doc);
    }

    #[test]
    fn payload_keeps_only_writable_fields() {
        let wf: Workflow = serde_json::from_value(json!({
            "id": "abc",
            "name": "Mailer",
            "active": true,
            "nodes": [{"id": "n1"}],
            "settings": {"executionOrder": "v0", "saveManualExecutions": true},
            "staticData": {"lastId": 3},
            "tags": [{"id": "t1", "name": "prod"}]
        }))
        .unwrap();

        let body = serde_json::to_value(WorkflowPayload::from_workflow(&wf)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "Mailer",
                "nodes": [{"id": "n1"}],
                "connections": {},
                "settings": {"executionOrder": "v0"},
                "staticData": {"lastId": 3}
            })
        );
    }

    #[test]
    fn empty_payload_defaults_execution_order() {
        let body = serde_json::to_value(WorkflowPayload::empty("Fresh")).unwrap();
        assert_eq!(
            body,
            json!({"name": "Fresh", "nodes": [], "connections": {}, "settings": {"executionOrder": "v1"}})
        );
    }

    #[test]
    fn listing_accepts_both_shapes() {
        let paged: Listing<Tag> =
            serde_json::from_value(json!({"data": [{"id": "1", "name": "a"}], "nextCursor": "c2"}))
                .unwrap();
        let (items, cursor) = paged.into_parts();
        assert_eq!(items.len(), 1);
        assert_eq!(cursor.as_deref(), Some("c2"));

        let bare: Listing<Tag> = serde_json::from_value(json!([{"id": 7, "name": "b"}])).unwrap();
        let (items, cursor) = bare.into_parts();
        assert_eq!(items[0].id, "7");
        assert_eq!(cursor, None);
    }
}
