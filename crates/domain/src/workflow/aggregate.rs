//! Workflow aggregate implementation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use common::{Identifier, ReadableIdentifier};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::event_queue::EventQueue;

use super::{
    Connection, Node, NodePatch, WorkflowError, WorkflowEvent, WorkflowEventKind, WorkflowState,
};

/// Workflow aggregate root.
///
/// Owns a graph of nodes and the connections between them. Every accepted
/// mutation bumps `version`, advances `updated_at` and records one event per
/// observable change. Connections always reference nodes that exist.
///
/// Deserializing re-checks the graph, so a corrupted document fails to load
/// instead of producing a workflow with dangling connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "WorkflowDocument")]
pub struct Workflow {
    id: Identifier,

    name: String,

    #[serde(default)]
    active: bool,

    #[serde(default)]
    nodes: BTreeMap<ReadableIdentifier, Node>,

    #[serde(default)]
    connections: BTreeSet<Connection>,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,

    /// Number of accepted mutations, creation included.
    #[serde(default)]
    version: Version,

    #[serde(skip)]
    pending_events: EventQueue<WorkflowEvent>,
}

impl AggregateRoot for Workflow {
    type Event = WorkflowEvent;

    fn aggregate_type() -> &'static str {
        "Workflow"
    }

    fn id(&self) -> Identifier {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn pending_events(&self) -> &EventQueue<WorkflowEvent> {
        &self.pending_events
    }

    fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        self.pending_events.drain()
    }
}

/// Serialized shape of a [`Workflow`], checked before it becomes one.
#[derive(Deserialize)]
struct WorkflowDocument {
    id: Identifier,
    name: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    nodes: BTreeMap<ReadableIdentifier, Node>,
    #[serde(default)]
    connections: Vec<Connection>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: Version,
}

impl TryFrom<WorkflowDocument> for Workflow {
    type Error = WorkflowError;

    fn try_from(doc: WorkflowDocument) -> Result<Self, Self::Error> {
        if let Some((key, node)) = doc.nodes.iter().find(|(key, node)| **key != node.id) {
            return Err(WorkflowError::Validation(format!(
                "node stored under '{key}' has id '{}'",
                node.id
            )));
        }
        let (nodes, connections) = build_graph(doc.nodes.into_values(), doc.connections)?;

        Ok(Self {
            id: doc.id,
            name: validate_name(&doc.name)?,
            active: doc.active,
            nodes,
            connections,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            version: doc.version,
            pending_events: EventQueue::new(),
        })
    }
}

/// Checks nodes and connections against the graph rules and indexes them.
fn build_graph(
    nodes: impl IntoIterator<Item = Node>,
    connections: impl IntoIterator<Item = Connection>,
) -> Result<(BTreeMap<ReadableIdentifier, Node>, BTreeSet<Connection>), WorkflowError> {
    let mut node_map = BTreeMap::new();
    for node in nodes {
        node.validate()?;
        if node_map.contains_key(&node.id) {
            return Err(WorkflowError::DuplicateNode { node_id: node.id });
        }
        node_map.insert(node.id.clone(), node);
    }

    let mut connection_set = BTreeSet::new();
    for connection in connections {
        for endpoint in [&connection.source_node_id, &connection.target_node_id] {
            if !node_map.contains_key(endpoint) {
                return Err(WorkflowError::NodeNotFound {
                    node_id: endpoint.clone(),
                });
            }
        }
        if connection_set.contains(&connection) {
            return Err(WorkflowError::DuplicateConnection {
                source_node_id: connection.source_node_id,
                target_node_id: connection.target_node_id,
            });
        }
        connection_set.insert(connection);
    }

    Ok((node_map, connection_set))
}

fn validate_name(name: &str) -> Result<String, WorkflowError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkflowError::Validation(
            "workflow name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

// Query methods
impl Workflow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> WorkflowState {
        WorkflowState::from_active(self.active)
    }

    /// Returns all nodes ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, node_id: &ReadableIdentifier) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn has_node(&self, node_id: &ReadableIdentifier) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Returns the connections that start or end at `node_id`.
    pub fn connections_for<'a>(
        &'a self,
        node_id: &'a ReadableIdentifier,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.touches(node_id))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl Workflow {
    /// Creates an empty, inactive workflow.
    pub fn create(id: Identifier, name: &str) -> Result<Self, WorkflowError> {
        Self::create_with_graph(id, name, Vec::new(), Vec::new())
    }

    /// Creates an inactive workflow seeded with an initial graph.
    ///
    /// The graph must satisfy the same rules `add_node` and `add_connection`
    /// enforce. A single `WorkflowCreated` event carries the whole graph.
    pub fn create_with_graph(
        id: Identifier,
        name: &str,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
    ) -> Result<Self, WorkflowError> {
        let name = validate_name(name)?;
        let (node_map, connection_set) = build_graph(nodes, connections)?;

        let now = Utc::now();
        let mut workflow = Self {
            id,
            name,
            active: false,
            nodes: node_map,
            connections: connection_set,
            created_at: now,
            updated_at: now,
            version: Version::first(),
            pending_events: EventQueue::new(),
        };

        let kind = WorkflowEventKind::workflow_created(
            workflow.name.clone(),
            workflow.nodes.values().cloned().collect(),
            workflow.connections.iter().cloned().collect(),
            None,
        );
        workflow.record(now, kind);

        Ok(workflow)
    }

    /// Changes the display name. Renaming to the current name records nothing.
    pub fn rename(&mut self, new_name: &str) -> Result<(), WorkflowError> {
        let new_name = validate_name(new_name)?;
        if new_name == self.name {
            return Ok(());
        }
        self.pending_events.ensure_room(1)?;

        let old_name = std::mem::replace(&mut self.name, new_name);
        let at = self.touch();
        self.record(
            at,
            WorkflowEventKind::workflow_renamed(old_name, self.name.clone()),
        );
        Ok(())
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), WorkflowError> {
        node.validate()?;
        if self.nodes.contains_key(&node.id) {
            return Err(WorkflowError::DuplicateNode { node_id: node.id });
        }
        self.pending_events.ensure_room(1)?;

        self.nodes.insert(node.id.clone(), node.clone());
        let at = self.touch();
        self.record(at, WorkflowEventKind::node_added(node));
        Ok(())
    }

    /// Removes a node together with every connection that references it.
    ///
    /// Records `NodeRemoved` followed by one `ConnectionRemoved` per dropped
    /// connection.
    pub fn remove_node(&mut self, node_id: &ReadableIdentifier) -> Result<(), WorkflowError> {
        if !self.nodes.contains_key(node_id) {
            return Err(WorkflowError::NodeNotFound {
                node_id: node_id.clone(),
            });
        }

        let incident: Vec<Connection> = self.connections_for(node_id).cloned().collect();
        self.pending_events.ensure_room(1 + incident.len())?;

        let Some(node) = self.nodes.remove(node_id) else {
            return Err(WorkflowError::NodeNotFound {
                node_id: node_id.clone(),
            });
        };
        for connection in &incident {
            self.connections.remove(connection);
        }

        let at = self.touch();
        self.record(at, WorkflowEventKind::node_removed(node));
        for connection in incident {
            self.record(at, WorkflowEventKind::connection_removed(connection));
        }
        Ok(())
    }

    /// Applies a partial update to a node.
    ///
    /// A patch that leaves the node unchanged records nothing.
    pub fn update_node(
        &mut self,
        node_id: &ReadableIdentifier,
        patch: NodePatch,
    ) -> Result<(), WorkflowError> {
        let Some(current) = self.nodes.get(node_id) else {
            return Err(WorkflowError::NodeNotFound {
                node_id: node_id.clone(),
            });
        };

        let updated = current.patched(&patch);
        updated.validate()?;
        if &updated == current {
            return Ok(());
        }
        self.pending_events.ensure_room(1)?;

        self.nodes.insert(node_id.clone(), updated);
        let at = self.touch();
        self.record(at, WorkflowEventKind::node_updated(node_id.clone(), patch));
        Ok(())
    }

    pub fn add_connection(&mut self, connection: Connection) -> Result<(), WorkflowError> {
        for endpoint in [&connection.source_node_id, &connection.target_node_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(WorkflowError::NodeNotFound {
                    node_id: endpoint.clone(),
                });
            }
        }
        if self.connections.contains(&connection) {
            return Err(WorkflowError::DuplicateConnection {
                source_node_id: connection.source_node_id,
                target_node_id: connection.target_node_id,
            });
        }
        self.pending_events.ensure_room(1)?;

        self.connections.insert(connection.clone());
        let at = self.touch();
        self.record(at, WorkflowEventKind::connection_added(connection));
        Ok(())
    }

    /// Removes every connection from `source` to `target`, whatever ports
    /// they use. Records one `ConnectionRemoved` per connection.
    pub fn remove_connection(
        &mut self,
        source: &ReadableIdentifier,
        target: &ReadableIdentifier,
    ) -> Result<(), WorkflowError> {
        let matching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.links(source, target))
            .cloned()
            .collect();
        self.remove_connections(source, target, matching)
    }

    /// Removes exactly `connection`, ports and kind included.
    pub fn remove_connection_exact(&mut self, connection: &Connection) -> Result<(), WorkflowError> {
        let matching = if self.connections.contains(connection) {
            vec![connection.clone()]
        } else {
            Vec::new()
        };
        self.remove_connections(
            &connection.source_node_id,
            &connection.target_node_id,
            matching,
        )
    }

    fn remove_connections(
        &mut self,
        source: &ReadableIdentifier,
        target: &ReadableIdentifier,
        matching: Vec<Connection>,
    ) -> Result<(), WorkflowError> {
        if matching.is_empty() {
            return Err(WorkflowError::ConnectionNotFound {
                source_node_id: source.clone(),
                target_node_id: target.clone(),
            });
        }
        self.pending_events.ensure_room(matching.len())?;

        for connection in &matching {
            self.connections.remove(connection);
        }
        let at = self.touch();
        for connection in matching {
            self.record(at, WorkflowEventKind::connection_removed(connection));
        }
        Ok(())
    }

    /// Turns the workflow on. Fails on a workflow without nodes; activating
    /// an active workflow records nothing.
    pub fn activate(&mut self) -> Result<(), WorkflowError> {
        if self.active {
            return Ok(());
        }
        if self.nodes.is_empty() {
            return Err(WorkflowError::Validation(
                "cannot activate a workflow without nodes".to_string(),
            ));
        }
        self.pending_events.ensure_room(1)?;

        self.active = true;
        let at = self.touch();
        self.record(at, WorkflowEventKind::WorkflowActivated);
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), WorkflowError> {
        if !self.active {
            return Ok(());
        }
        self.pending_events.ensure_room(1)?;

        self.active = false;
        let at = self.touch();
        self.record(at, WorkflowEventKind::WorkflowDeactivated);
        Ok(())
    }

    /// Builds an inactive copy under a new id and name.
    ///
    /// Node ids are replaced by freshly generated ones and connections are
    /// rewired to match. The copy records `WorkflowCreated` with
    /// `duplicated_from` set; the source records nothing.
    pub fn duplicate(&self, new_id: Identifier, new_name: &str) -> Result<Workflow, WorkflowError> {
        let name = validate_name(new_name)?;

        let remapped: HashMap<&ReadableIdentifier, ReadableIdentifier> = self
            .nodes
            .keys()
            .map(|old| (old, ReadableIdentifier::generate()))
            .collect();

        let mut nodes = BTreeMap::new();
        for (old_id, node) in &self.nodes {
            if let Some(new_node_id) = remapped.get(old_id) {
                let mut copy = node.clone();
                copy.id = new_node_id.clone();
                nodes.insert(new_node_id.clone(), copy);
            }
        }

        let connections: BTreeSet<Connection> = self
            .connections
            .iter()
            .filter_map(|c| {
                let source = remapped.get(&c.source_node_id)?;
                let target = remapped.get(&c.target_node_id)?;
                let mut copy = c.clone();
                copy.source_node_id = source.clone();
                copy.target_node_id = target.clone();
                Some(copy)
            })
            .collect();

        let now = Utc::now();
        let mut copy = Workflow {
            id: new_id,
            name,
            active: false,
            nodes,
            connections,
            created_at: now,
            updated_at: now,
            version: Version::first(),
            pending_events: EventQueue::with_capacity(self.pending_events.capacity()),
        };

        let kind = WorkflowEventKind::workflow_created(
            copy.name.clone(),
            copy.nodes.values().cloned().collect(),
            copy.connections.iter().cloned().collect(),
            Some(self.id),
        );
        copy.record(now, kind);

        Ok(copy)
    }

    /// Records `WorkflowDeleted`. Removing the workflow from storage is up to
    /// the caller.
    pub fn mark_deleted(&mut self) -> Result<(), WorkflowError> {
        self.pending_events.ensure_room(1)?;

        let at = self.touch();
        self.record(at, WorkflowEventKind::workflow_deleted(self.name.clone()));
        Ok(())
    }

    /// Caps how many events may be pending at once.
    pub fn limit_pending_events(&mut self, capacity: usize) {
        self.pending_events.set_capacity(capacity);
    }

    /// Advances `updated_at` and `version` for an accepted mutation.
    ///
    /// `updated_at` moves forward by at least a microsecond even if the clock
    /// has not.
    fn touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
        self.version = self.version.next();
        self.updated_at
    }

    fn record(&mut self, at: DateTime<Utc>, kind: WorkflowEventKind) {
        self.pending_events
            .push(WorkflowEvent::new(self.id, at, kind));
    }
}
