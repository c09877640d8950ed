//! Value objects for the workflow graph.

use common::ReadableIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::WorkflowError;

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single step in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within its workflow.
    pub id: ReadableIdentifier,

    /// Registered node type (e.g. `"httpRequest"`).
    #[serde(rename = "type")]
    pub node_type: String,

    /// Display name. Defaults to the id.
    pub name: String,

    #[serde(default)]
    pub position: Position,

    /// Node configuration.
    #[serde(default)]
    pub parameters: Map<String, Value>,

    #[serde(default)]
    pub disabled: bool,
}

impl Node {
    /// Creates an enabled node at the origin with no parameters.
    pub fn new(id: ReadableIdentifier, node_type: impl Into<String>) -> Self {
        Self {
            name: id.to_string(),
            id,
            node_type: node_type.into(),
            position: Position::default(),
            parameters: Map::new(),
            disabled: false,
        }
    }

    /// Creates a node from a raw id string.
    pub fn parse(id: &str, node_type: impl Into<String>) -> Result<Self, WorkflowError> {
        Ok(Self::new(ReadableIdentifier::parse(id)?, node_type))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WorkflowError> {
        if self.node_type.trim().is_empty() {
            return Err(WorkflowError::Validation(format!(
                "node {} has an empty type",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns a copy of this node with `patch` applied.
    ///
    /// Parameters merge key by key; a `null` value removes the key.
    pub(crate) fn patched(&self, patch: &NodePatch) -> Node {
        let mut node = self.clone();

        if let Some(node_type) = &patch.node_type {
            node.node_type = node_type.clone();
        }
        if let Some(name) = &patch.name {
            node.name = name.clone();
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(disabled) = patch.disabled {
            node.disabled = disabled;
        }
        for (key, value) in &patch.parameters {
            if value.is_null() {
                node.parameters.remove(key);
            } else {
                node.parameters.insert(key.clone(), value.clone());
            }
        }

        node
    }
}

/// Partial update for a node. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

/// What a connection carries between two ports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Regular item flow.
    #[default]
    Main,
    /// Error output routed to a handler node.
    Error,
    /// Sub-node wiring for AI agents (models, tools, memory).
    Ai,
}

pub const DEFAULT_PORT: &str = "main";

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// Directed edge between two node ports.
///
/// Identity is the whole tuple, so two nodes may be linked through several
/// port pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source_node_id: ReadableIdentifier,
    pub target_node_id: ReadableIdentifier,

    #[serde(default = "default_port")]
    pub source_output: String,

    #[serde(default = "default_port")]
    pub target_input: String,

    #[serde(default)]
    pub kind: ConnectionKind,
}

impl Connection {
    /// Creates a main-port connection.
    pub fn new(source: ReadableIdentifier, target: ReadableIdentifier) -> Self {
        Self {
            source_node_id: source,
            target_node_id: target,
            source_output: default_port(),
            target_input: default_port(),
            kind: ConnectionKind::Main,
        }
    }

    /// Creates a main-port connection from raw id strings.
    pub fn parse(source: &str, target: &str) -> Result<Self, WorkflowError> {
        Ok(Self::new(
            ReadableIdentifier::parse(source)?,
            ReadableIdentifier::parse(target)?,
        ))
    }

    pub fn with_ports(mut self, output: impl Into<String>, input: impl Into<String>) -> Self {
        self.source_output = output.into();
        self.target_input = input.into();
        self
    }

    pub fn with_kind(mut self, kind: ConnectionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns true if `node_id` is either endpoint.
    pub fn touches(&self, node_id: &ReadableIdentifier) -> bool {
        &self.source_node_id == node_id || &self.target_node_id == node_id
    }

    /// Returns true if this connection runs from `source` to `target`.
    pub fn links(&self, source: &ReadableIdentifier, target: &ReadableIdentifier) -> bool {
        &self.source_node_id == source && &self.target_node_id == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_defaults() {
        let node = Node::parse("n1", "httpRequest").unwrap();
        assert_eq!(node.id.as_str(), "n1");
        assert_eq!(node.name, "n1");
        assert_eq!(node.position, Position::default());
        assert!(node.parameters.is_empty());
        assert!(!node.disabled);
    }

    #[test]
    fn node_parse_rejects_blank_id() {
        assert!(matches!(
            Node::parse("  ", "httpRequest"),
            Err(WorkflowError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn node_serializes_type_field() {
        let node = Node::parse("n1", "emailSend").unwrap();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "emailSend");
        assert_eq!(json["id"], "n1");
    }

    #[test]
    fn node_deserializes_with_defaults() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "type": "httpRequest",
            "name": "Fetch invoices"
        }))
        .unwrap();
        assert_eq!(node.name, "Fetch invoices");
        assert!(node.parameters.is_empty());
    }

    #[test]
    fn patch_merges_parameters() {
        let node = Node::parse("n1", "httpRequest")
            .unwrap()
            .with_parameter("url", json!("https://a.example"))
            .with_parameter("method", json!("GET"))
            .with_parameter("timeout", json!(30));

        let patch = NodePatch::new()
            .name("Fetch")
            .parameter("method", json!("POST"))
            .parameter("timeout", Value::Null)
            .parameter("retries", json!(3));

        let patched = node.patched(&patch);

        assert_eq!(patched.name, "Fetch");
        assert_eq!(patched.node_type, "httpRequest");
        assert_eq!(patched.parameters["url"], json!("https://a.example"));
        assert_eq!(patched.parameters["method"], json!("POST"));
        assert_eq!(patched.parameters["retries"], json!(3));
        assert!(!patched.parameters.contains_key("timeout"));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let node = Node::parse("n1", "httpRequest").unwrap();
        assert_eq!(node.patched(&NodePatch::new()), node);
    }

    #[test]
    fn connection_defaults_to_main_ports() {
        let connection = Connection::parse("n1", "n2").unwrap();
        assert_eq!(connection.source_output, DEFAULT_PORT);
        assert_eq!(connection.target_input, DEFAULT_PORT);
        assert_eq!(connection.kind, ConnectionKind::Main);

        let from_json: Connection = serde_json::from_value(json!({
            "source_node_id": "n1",
            "target_node_id": "n2"
        }))
        .unwrap();
        assert_eq!(from_json, connection);
    }

    #[test]
    fn connection_identity_includes_ports() {
        let a = Connection::parse("n1", "n2").unwrap();
        let b = a.clone().with_kind(ConnectionKind::Error);
        assert_ne!(a, b);
        assert!(a.links(&b.source_node_id, &b.target_node_id));
    }

    #[test]
    fn connection_touches_both_endpoints() {
        let connection = Connection::parse("n1", "n2").unwrap();
        assert!(connection.touches(&ReadableIdentifier::parse("n1").unwrap()));
        assert!(connection.touches(&ReadableIdentifier::parse("n2").unwrap()));
        assert!(!connection.touches(&ReadableIdentifier::parse("n3").unwrap()));
    }
}
