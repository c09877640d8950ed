//! Workflow queries and read models.

use chrono::{DateTime, Utc};
use common::Identifier;
use event_store::{EventEnvelope, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;

use super::Workflow;

/// Read-side requests the workflow service answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "query", content = "data")]
pub enum WorkflowQuery {
    /// One workflow by id.
    Get { id: Identifier },

    /// Summaries of all workflows, oldest first.
    List {
        #[serde(default)]
        active_only: bool,
    },

    /// Dispatched events of one workflow, in order.
    History { id: Identifier },
}

/// Answer to a [`WorkflowQuery`].
#[derive(Debug, Clone)]
pub enum QueryResult {
    Workflow(Option<Workflow>),
    Workflows(Vec<WorkflowSummary>),
    History(Vec<EventEnvelope>),
}

/// Listing view of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: Identifier,
    pub name: String,
    pub active: bool,
    pub node_count: usize,
    pub connection_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id(),
            name: workflow.name().to_string(),
            active: workflow.is_active(),
            node_count: workflow.node_count(),
            connection_count: workflow.connection_count(),
            created_at: workflow.created_at(),
            updated_at: workflow.updated_at(),
            version: workflow.version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Node;

    #[test]
    fn summary_reflects_workflow() {
        let mut workflow = Workflow::create(Identifier::generate(), "Invoice Flow").unwrap();
        workflow
            .add_node(Node::parse("n1", "httpRequest").unwrap())
            .unwrap();

        let summary = WorkflowSummary::from(&workflow);

        assert_eq!(summary.id, workflow.id());
        assert_eq!(summary.name, "Invoice Flow");
        assert!(!summary.active);
        assert_eq!(summary.node_count, 1);
        assert_eq!(summary.connection_count, 0);
        assert_eq!(summary.version, Version::new(2));
    }

    #[test]
    fn list_defaults_to_all() {
        let query: WorkflowQuery =
            serde_json::from_value(serde_json::json!({ "query": "List", "data": {} })).unwrap();
        assert!(matches!(query, WorkflowQuery::List { active_only: false }));
    }
}
