// Workflow comparison and file/API reconciliation.
//
// Two workflows are considered equal when everything the editor lets a user
// change matches: the name, each node's identity, type, version, position
// and parameters, the connection graph and the execution order. Server
// bookkeeping such as `updatedAt` or `versionId` is ignored.

use crate::model::Workflow;
use crate::store::LocalWorkflow;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Node properties that take part in the comparison.
const NODE_PROPERTIES: [&str; 5] = ["name", "type", "typeVersion", "position", "parameters"];

/// First difference found between two workflows.
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    Name { left: String, right: String },
    NodeCount { left: usize, right: usize },
    MissingNode { node: String },
    NodeProperty { node: String, property: &'static str },
    Connections,
    ExecutionOrder,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Name { left, right } => write!(f, "names differ: '{}' != '{}'", left, right),
            Difference::NodeCount { left, right } => {
                write!(f, "node counts differ: {} != {}", left, right)
            }
            Difference::MissingNode { node } => {
                write!(f, "node '{}' exists in only one workflow", node)
            }
            Difference::NodeProperty { node, property } => {
                write!(f, "node '{}' has a different '{}'", node, property)
            }
            Difference::Connections => write!(f, "connections differ"),
            Difference::ExecutionOrder => write!(f, "settings.executionOrder differs"),
        }
    }
}

/// Compare two workflows and return the first difference, if any.
pub fn compare(left: &Workflow, right: &Workflow) -> Option<Difference> {
    if left.name != right.name {
        return Some(Difference::Name {
            left: left.name.clone(),
            right: right.name.clone(),
        });
    }

    let (left_nodes, right_nodes) = (left.nodes(), right.nodes());
    if left_nodes.len() != right_nodes.len() {
        return Some(Difference::NodeCount {
            left: left_nodes.len(),
            right: right_nodes.len(),
        });
    }

    let right_by_id: HashMap<Option<&str>, &Value> =
        right_nodes.iter().map(|n| (node_id(n), n)).collect();
    for node in left_nodes {
        let id = node_id(node);
        let label = id.unwrap_or("<no id>").to_string();
        let other = match right_by_id.get(&id) {
            Some(other) => other,
            None => return Some(Difference::MissingNode { node: label }),
        };
        for property in NODE_PROPERTIES {
            if !json_eq(&node_property(node, property), &node_property(other, property)) {
                return Some(Difference::NodeProperty {
                    node: label,
                    property,
                });
            }
        }
    }

    if !json_eq(&connections(left), &connections(right)) {
        return Some(Difference::Connections);
    }

    let order = |w: &Workflow| w.execution_order().cloned().unwrap_or(Value::Null);
    if !json_eq(&order(left), &order(right)) {
        return Some(Difference::ExecutionOrder);
    }

    None
}

fn node_id(node: &Value) -> Option<&str> {
    node.get("id").and_then(Value::as_str)
}

// Missing `parameters` is the same as an empty object.
fn node_property(node: &Value, property: &str) -> Value {
    match node.get(property) {
        Some(v) => v.clone(),
        None if property == "parameters" => Value::Object(Map::new()),
        None => Value::Null,
    }
}

fn connections(workflow: &Workflow) -> Value {
    match &workflow.connections {
        Some(c) if !c.is_null() => c.clone(),
        _ => Value::Object(Map::new()),
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).map_or(false, |w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

/// A workflow present both on the instance and on disk.
#[derive(Debug, Clone)]
pub struct Pair {
    pub remote: Workflow,
    pub local: LocalWorkflow,
    pub difference: Option<Difference>,
}

/// Classification of remote workflows and local files.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub matching: Vec<Pair>,
    pub differing: Vec<Pair>,
    pub remote_only: Vec<Workflow>,
    /// Files whose id is unknown to the instance, then files without an id.
    pub local_only: Vec<LocalWorkflow>,
    /// Files repeating an id already claimed by an earlier file.
    pub duplicates: Vec<LocalWorkflow>,
}

impl Reconciliation {
    pub fn build(remote: Vec<Workflow>, local: Vec<LocalWorkflow>) -> Self {
        let mut result = Reconciliation::default();

        let mut by_id: HashMap<String, LocalWorkflow> = HashMap::new();
        let mut order = Vec::new();
        let mut without_id = Vec::new();
        for file in local {
            match file.workflow.id.clone() {
                Some(id) if by_id.contains_key(&id) => result.duplicates.push(file),
                Some(id) => {
                    order.push(id.clone());
                    by_id.insert(id, file);
                }
                None => without_id.push(file),
            }
        }

        for remote in remote {
            let Some(id) = remote.id.clone() else { continue };
            match by_id.remove(&id) {
                Some(local) => {
                    let difference = compare(&remote, &local.workflow);
                    let pair = Pair {
                        remote,
                        local,
                        difference,
                    };
                    if pair.difference.is_none() {
                        result.matching.push(pair);
                    } else {
                        result.differing.push(pair);
                    }
                }
                None => result.remote_only.push(remote),
            }
        }

        result.local_only = order
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .chain(without_id)
            .collect();
        result
    }

    pub fn in_sync(&self) -> bool {
        self.differing.is_empty() && self.remote_only.is_empty() && self.local_only.is_empty()
    }
}
