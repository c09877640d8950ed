//! Workflow commands.

use common::{Identifier, ReadableIdentifier};
use serde::{Deserialize, Serialize};

use super::{Connection, Node, NodePatch, WorkflowError};

/// Command to create a new workflow, optionally with an initial graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflow {
    /// The workflow ID to create.
    pub workflow_id: Identifier,

    pub name: String,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl CreateWorkflow {
    /// Creates a new CreateWorkflow command with a generated workflow ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Identifier::generate(), name)
    }

    pub fn with_id(workflow_id: Identifier, name: impl Into<String>) -> Self {
        Self {
            workflow_id,
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }
}

/// Command to rename a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameWorkflow {
    pub workflow_id: Identifier,
    pub name: String,
}

impl RenameWorkflow {
    pub fn new(workflow_id: Identifier, name: impl Into<String>) -> Self {
        Self {
            workflow_id,
            name: name.into(),
        }
    }
}

/// Command to add a node to a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNode {
    pub workflow_id: Identifier,
    pub node: Node,
}

impl AddNode {
    pub fn new(workflow_id: Identifier, node: Node) -> Self {
        Self { workflow_id, node }
    }
}

/// Command to remove a node and its connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveNode {
    pub workflow_id: Identifier,
    pub node_id: ReadableIdentifier,
}

impl RemoveNode {
    pub fn new(workflow_id: Identifier, node_id: ReadableIdentifier) -> Self {
        Self {
            workflow_id,
            node_id,
        }
    }
}

/// Command to patch a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNode {
    pub workflow_id: Identifier,
    pub node_id: ReadableIdentifier,
    pub patch: NodePatch,
}

impl UpdateNode {
    pub fn new(workflow_id: Identifier, node_id: ReadableIdentifier, patch: NodePatch) -> Self {
        Self {
            workflow_id,
            node_id,
            patch,
        }
    }
}

/// Command to connect two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddConnection {
    pub workflow_id: Identifier,
    pub connection: Connection,
}

impl AddConnection {
    pub fn new(workflow_id: Identifier, connection: Connection) -> Self {
        Self {
            workflow_id,
            connection,
        }
    }
}

/// Command to disconnect two nodes.
///
/// By default every connection from source to target goes, whatever its
/// ports. Set `exact` to remove a single connection instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveConnection {
    pub workflow_id: Identifier,
    pub source_node_id: ReadableIdentifier,
    pub target_node_id: ReadableIdentifier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<Connection>,
}

impl RemoveConnection {
    pub fn new(
        workflow_id: Identifier,
        source_node_id: ReadableIdentifier,
        target_node_id: ReadableIdentifier,
    ) -> Self {
        Self {
            workflow_id,
            source_node_id,
            target_node_id,
            exact: None,
        }
    }

    /// Removes only `connection`, matching ports and kind.
    pub fn exact(workflow_id: Identifier, connection: Connection) -> Self {
        Self {
            workflow_id,
            source_node_id: connection.source_node_id.clone(),
            target_node_id: connection.target_node_id.clone(),
            exact: Some(connection),
        }
    }

    /// Returns the single connection to remove, if one was given.
    ///
    /// An exact connection must run between the command's own endpoints.
    pub fn exact_connection(&self) -> Result<Option<&Connection>, WorkflowError> {
        match &self.exact {
            Some(connection) if !connection.links(&self.source_node_id, &self.target_node_id) => {
                Err(WorkflowError::Validation(format!(
                    "connection {} -> {} does not match endpoints {} -> {}",
                    connection.source_node_id,
                    connection.target_node_id,
                    self.source_node_id,
                    self.target_node_id
                )))
            }
            exact => Ok(exact.as_ref()),
        }
    }
}

/// Command to activate a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateWorkflow {
    pub workflow_id: Identifier,
}

impl ActivateWorkflow {
    pub fn new(workflow_id: Identifier) -> Self {
        Self { workflow_id }
    }
}

/// Command to deactivate a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateWorkflow {
    pub workflow_id: Identifier,
}

impl DeactivateWorkflow {
    pub fn new(workflow_id: Identifier) -> Self {
        Self { workflow_id }
    }
}

/// Command to copy a workflow under a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateWorkflow {
    /// The workflow to copy.
    pub source_id: Identifier,

    /// ID of the copy.
    pub workflow_id: Identifier,

    /// Name of the copy.
    pub name: String,
}

impl DuplicateWorkflow {
    /// Creates a new DuplicateWorkflow command with a generated ID for the copy.
    pub fn new(source_id: Identifier, name: impl Into<String>) -> Self {
        Self {
            source_id,
            workflow_id: Identifier::generate(),
            name: name.into(),
        }
    }
}

/// Command to delete a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWorkflow {
    pub workflow_id: Identifier,
}

impl DeleteWorkflow {
    pub fn new(workflow_id: Identifier) -> Self {
        Self { workflow_id }
    }
}

/// Every command the workflow service accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "data")]
pub enum WorkflowCommand {
    Create(CreateWorkflow),
    Rename(RenameWorkflow),
    AddNode(AddNode),
    RemoveNode(RemoveNode),
    UpdateNode(UpdateNode),
    AddConnection(AddConnection),
    RemoveConnection(RemoveConnection),
    Activate(ActivateWorkflow),
    Deactivate(DeactivateWorkflow),
    Duplicate(DuplicateWorkflow),
    Delete(DeleteWorkflow),
}

impl WorkflowCommand {
    /// Returns the command name used in logs, metrics and event metadata.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowCommand::Create(_) => "CreateWorkflow",
            WorkflowCommand::Rename(_) => "RenameWorkflow",
            WorkflowCommand::AddNode(_) => "AddNode",
            WorkflowCommand::RemoveNode(_) => "RemoveNode",
            WorkflowCommand::UpdateNode(_) => "UpdateNode",
            WorkflowCommand::AddConnection(_) => "AddConnection",
            WorkflowCommand::RemoveConnection(_) => "RemoveConnection",
            WorkflowCommand::Activate(_) => "ActivateWorkflow",
            WorkflowCommand::Deactivate(_) => "DeactivateWorkflow",
            WorkflowCommand::Duplicate(_) => "DuplicateWorkflow",
            WorkflowCommand::Delete(_) => "DeleteWorkflow",
        }
    }

    /// Returns the ID of the workflow the command writes to.
    ///
    /// For `Duplicate` that is the copy, not the source.
    pub fn workflow_id(&self) -> Identifier {
        match self {
            WorkflowCommand::Create(cmd) => cmd.workflow_id,
            WorkflowCommand::Rename(cmd) => cmd.workflow_id,
            WorkflowCommand::AddNode(cmd) => cmd.workflow_id,
            WorkflowCommand::RemoveNode(cmd) => cmd.workflow_id,
            WorkflowCommand::UpdateNode(cmd) => cmd.workflow_id,
            WorkflowCommand::AddConnection(cmd) => cmd.workflow_id,
            WorkflowCommand::RemoveConnection(cmd) => cmd.workflow_id,
            WorkflowCommand::Activate(cmd) => cmd.workflow_id,
            WorkflowCommand::Deactivate(cmd) => cmd.workflow_id,
            WorkflowCommand::Duplicate(cmd) => cmd.workflow_id,
            WorkflowCommand::Delete(cmd) => cmd.workflow_id,
        }
    }

    /// Returns true for commands that change the graph's structure.
    pub fn is_structural_edit(&self) -> bool {
        matches!(
            self,
            WorkflowCommand::AddNode(_)
                | WorkflowCommand::RemoveNode(_)
                | WorkflowCommand::UpdateNode(_)
                | WorkflowCommand::AddConnection(_)
                | WorkflowCommand::RemoveConnection(_)
        )
    }
}

macro_rules! impl_from_command {
    ($($cmd:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$cmd> for WorkflowCommand {
                fn from(cmd: $cmd) -> Self {
                    WorkflowCommand::$variant(cmd)
                }
            }
        )*
    };
}

impl_from_command! {
    CreateWorkflow => Create,
    RenameWorkflow => Rename,
    AddNode => AddNode,
    RemoveNode => RemoveNode,
    UpdateNode => UpdateNode,
    AddConnection => AddConnection,
    RemoveConnection => RemoveConnection,
    ActivateWorkflow => Activate,
    DeactivateWorkflow => Deactivate,
    DuplicateWorkflow => Duplicate,
    DeleteWorkflow => Delete,
}
