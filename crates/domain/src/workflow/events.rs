//! Workflow domain events.

use chrono::{DateTime, Utc};
use common::{Identifier, ReadableIdentifier};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Connection, Node, NodePatch};

/// A change recorded by a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// The workflow the change happened to.
    pub workflow_id: Identifier,

    /// When the change happened.
    pub occurred_at: DateTime<Utc>,

    /// What happened.
    pub kind: WorkflowEventKind,
}

/// Kinds of change a workflow can record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEventKind {
    /// Workflow was created, either fresh or as a copy of another.
    WorkflowCreated(WorkflowCreatedData),

    WorkflowRenamed(WorkflowRenamedData),

    NodeAdded(NodeAddedData),

    /// Node was removed. Connections it took with it follow as
    /// separate `ConnectionRemoved` events.
    NodeRemoved(NodeRemovedData),

    NodeUpdated(NodeUpdatedData),

    ConnectionAdded(ConnectionData),

    ConnectionRemoved(ConnectionData),

    WorkflowActivated,

    WorkflowDeactivated,

    /// Workflow was deleted. Always the last event of its stream.
    WorkflowDeleted(WorkflowDeletedData),
}

/// Data for WorkflowCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCreatedData {
    pub name: String,

    /// Initial graph.
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,

    /// Source workflow when created by duplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicated_from: Option<Identifier>,
}

/// Data for WorkflowRenamed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRenamedData {
    pub old_name: String,
    pub new_name: String,
}

/// Data for NodeAdded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAddedData {
    pub node: Node,
}

/// Data for NodeRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRemovedData {
    /// The node as it was just before removal.
    pub node: Node,
}

/// Data for NodeUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdatedData {
    pub node_id: ReadableIdentifier,

    /// The patch that was applied.
    pub patch: NodePatch,
}

/// Data for ConnectionAdded and ConnectionRemoved events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionData {
    pub connection: Connection,
}

/// Data for WorkflowDeleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDeletedData {
    /// Name at the time of deletion.
    pub name: String,
}

impl WorkflowEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowEventKind::WorkflowCreated(_) => "WorkflowCreated",
            WorkflowEventKind::WorkflowRenamed(_) => "WorkflowRenamed",
            WorkflowEventKind::NodeAdded(_) => "NodeAdded",
            WorkflowEventKind::NodeRemoved(_) => "NodeRemoved",
            WorkflowEventKind::NodeUpdated(_) => "NodeUpdated",
            WorkflowEventKind::ConnectionAdded(_) => "ConnectionAdded",
            WorkflowEventKind::ConnectionRemoved(_) => "ConnectionRemoved",
            WorkflowEventKind::WorkflowActivated => "WorkflowActivated",
            WorkflowEventKind::WorkflowDeactivated => "WorkflowDeactivated",
            WorkflowEventKind::WorkflowDeleted(_) => "WorkflowDeleted",
        }
    }
}

impl WorkflowEvent {
    pub fn new(workflow_id: Identifier, occurred_at: DateTime<Utc>, kind: WorkflowEventKind) -> Self {
        Self {
            workflow_id,
            occurred_at,
            kind,
        }
    }
}

// Convenience constructors for event kinds
impl WorkflowEventKind {
    pub fn workflow_created(
        name: impl Into<String>,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
        duplicated_from: Option<Identifier>,
    ) -> Self {
        WorkflowEventKind::WorkflowCreated(WorkflowCreatedData {
            name: name.into(),
            nodes,
            connections,
            duplicated_from,
        })
    }

    pub fn workflow_renamed(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        WorkflowEventKind::WorkflowRenamed(WorkflowRenamedData {
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    pub fn node_added(node: Node) -> Self {
        WorkflowEventKind::NodeAdded(NodeAddedData { node })
    }

    pub fn node_removed(node: Node) -> Self {
        WorkflowEventKind::NodeRemoved(NodeRemovedData { node })
    }

    pub fn node_updated(node_id: ReadableIdentifier, patch: NodePatch) -> Self {
        WorkflowEventKind::NodeUpdated(NodeUpdatedData { node_id, patch })
    }

    pub fn connection_added(connection: Connection) -> Self {
        WorkflowEventKind::ConnectionAdded(ConnectionData { connection })
    }

    pub fn connection_removed(connection: Connection) -> Self {
        WorkflowEventKind::ConnectionRemoved(ConnectionData { connection })
    }

    pub fn workflow_deleted(name: impl Into<String>) -> Self {
        WorkflowEventKind::WorkflowDeleted(WorkflowDeletedData { name: name.into() })
    }
}

impl DomainEvent for WorkflowEvent {
    fn event_type(&self) -> &'static str {
        self.kind.as_str()
    }

    fn aggregate_id(&self) -> Identifier {
        self.workflow_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_names() {
        let id = Identifier::generate();
        let node = Node::parse("n1", "httpRequest").unwrap();
        let connection = Connection::parse("n1", "n2").unwrap();

        let cases = [
            (
                WorkflowEventKind::workflow_created("Invoice Flow", vec![], vec![], None),
                "WorkflowCreated",
            ),
            (
                WorkflowEventKind::workflow_renamed("a", "b"),
                "WorkflowRenamed",
            ),
            (WorkflowEventKind::node_added(node.clone()), "NodeAdded"),
            (WorkflowEventKind::node_removed(node), "NodeRemoved"),
            (
                WorkflowEventKind::node_updated(
                    ReadableIdentifier::parse("n1").unwrap(),
                    NodePatch::new().disabled(true),
                ),
                "NodeUpdated",
            ),
            (
                WorkflowEventKind::connection_added(connection.clone()),
                "ConnectionAdded",
            ),
            (
                WorkflowEventKind::connection_removed(connection),
                "ConnectionRemoved",
            ),
            (WorkflowEventKind::WorkflowActivated, "WorkflowActivated"),
            (WorkflowEventKind::WorkflowDeactivated, "WorkflowDeactivated"),
            (
                WorkflowEventKind::workflow_deleted("Invoice Flow"),
                "WorkflowDeleted",
            ),
        ];

        for (kind, expected) in cases {
            let event = WorkflowEvent::new(id, Utc::now(), kind);
            assert_eq!(event.event_type(), expected);
            assert_eq!(event.aggregate_id(), id);
        }
    }

    #[test]
    fn payload_is_tagged() {
        let event = WorkflowEvent::new(
            Identifier::generate(),
            Utc::now(),
            WorkflowEventKind::node_added(Node::parse("n1", "httpRequest").unwrap()),
        );

        let payload = event.payload().unwrap();
        assert_eq!(payload["type"], "NodeAdded");
        assert_eq!(payload["data"]["node"]["id"], "n1");
        assert_eq!(payload["data"]["node"]["type"], "httpRequest");
    }

    #[test]
    fn unit_kinds_carry_no_data() {
        let payload = serde_json::to_value(WorkflowEventKind::WorkflowActivated).unwrap();
        assert_eq!(payload, json!({ "type": "WorkflowActivated" }));
    }

    #[test]
    fn created_omits_missing_source() {
        let payload = serde_json::to_value(WorkflowEventKind::workflow_created(
            "Invoice Flow",
            vec![],
            vec![],
            None,
        ))
        .unwrap();
        assert!(payload["data"].get("duplicated_from").is_none());
    }

    #[test]
    fn event_roundtrip() {
        let event = WorkflowEvent::new(
            Identifier::generate(),
            Utc::now(),
            WorkflowEventKind::connection_removed(Connection::parse("n1", "n2").unwrap()),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
