//! Workflow service: routes commands and queries to the aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use common::Identifier;
use event_store::{EventEnvelope, EventStore, Version};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::aggregate::{AggregateRoot, to_envelopes};
use crate::config::{EditPolicy, ServiceConfig};
use crate::error::DomainError;
use crate::repository::WorkflowRepository;

use super::{
    ActivateWorkflow, AddConnection, AddNode, CreateWorkflow, DeactivateWorkflow, DeleteWorkflow,
    DuplicateWorkflow, QueryResult, RemoveConnection, RemoveNode, RenameWorkflow, UpdateNode,
    Workflow, WorkflowCommand, WorkflowError, WorkflowEvent, WorkflowQuery, WorkflowSummary,
};

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// The workflow the command wrote to.
    pub workflow_id: Identifier,

    /// The workflow after the command, or `None` once deleted.
    pub workflow: Option<Workflow>,

    /// The events that were recorded and dispatched, oldest first.
    pub events: Vec<WorkflowEvent>,

    /// Event-log version of the last dispatched event. `None` when the
    /// command changed nothing.
    pub last_event_version: Option<Version>,
}

/// Service for managing workflows.
///
/// Every command runs load, mutate, save, publish while holding a lock on
/// its workflow id, so commands against one workflow never interleave.
/// Drained events go to the event store after the workflow is saved.
pub struct WorkflowService<R: WorkflowRepository, S: EventStore> {
    repository: R,
    store: S,
    config: ServiceConfig,
    locks: Mutex<HashMap<Identifier, Arc<Mutex<()>>>>,
}

impl<R: WorkflowRepository, S: EventStore> WorkflowService<R, S> {
    /// Creates a new workflow service with the default configuration.
    pub fn new(repository: R, store: S) -> Self {
        Self::with_config(repository, store, ServiceConfig::default())
    }

    pub fn with_config(repository: R, store: S, config: ServiceConfig) -> Self {
        Self {
            repository,
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Executes a command against its workflow.
    #[tracing::instrument(
        skip(self, command),
        fields(command = command.name(), workflow_id = %command.workflow_id())
    )]
    pub async fn execute(&self, command: WorkflowCommand) -> Result<CommandResult, DomainError> {
        let name = command.name();
        metrics::counter!("workflow_commands_total", "command" => name).increment(1);

        let _guard = self.lock(command.workflow_id()).await;
        let result = self.dispatch(command).await;

        match &result {
            Ok(outcome) => tracing::info!(events = outcome.events.len(), "command accepted"),
            Err(err) => {
                metrics::counter!("workflow_command_rejections_total", "command" => name)
                    .increment(1);
                tracing::warn!(error = %err, "command rejected");
            }
        }
        result
    }

    /// Answers a read-side query.
    #[tracing::instrument(skip(self))]
    pub async fn query(&self, query: WorkflowQuery) -> Result<QueryResult, DomainError> {
        match query {
            WorkflowQuery::Get { id } => self.get_workflow(id).await.map(QueryResult::Workflow),
            WorkflowQuery::List { active_only } => self
                .list_workflows(active_only)
                .await
                .map(QueryResult::Workflows),
            WorkflowQuery::History { id } => self.history(id).await.map(QueryResult::History),
        }
    }

    async fn dispatch(&self, command: WorkflowCommand) -> Result<CommandResult, DomainError> {
        let name = command.name();
        let structural = command.is_structural_edit();

        match command {
            WorkflowCommand::Create(cmd) => self.handle_create(cmd, name).await,
            WorkflowCommand::Rename(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| w.rename(&cmd.name))
                    .await
            }
            WorkflowCommand::AddNode(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| w.add_node(cmd.node))
                    .await
            }
            WorkflowCommand::RemoveNode(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| {
                    w.remove_node(&cmd.node_id)
                })
                .await
            }
            WorkflowCommand::UpdateNode(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| {
                    w.update_node(&cmd.node_id, cmd.patch)
                })
                .await
            }
            WorkflowCommand::AddConnection(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| {
                    w.add_connection(cmd.connection)
                })
                .await
            }
            WorkflowCommand::RemoveConnection(cmd) => {
                self.modify(cmd.workflow_id, name, structural, |w| {
                    match cmd.exact_connection()? {
                        Some(connection) => w.remove_connection_exact(connection),
                        None => w.remove_connection(&cmd.source_node_id, &cmd.target_node_id),
                    }
                })
                .await
            }
            WorkflowCommand::Activate(cmd) => {
                self.modify(cmd.workflow_id, name, structural, Workflow::activate)
                    .await
            }
            WorkflowCommand::Deactivate(cmd) => {
                self.modify(cmd.workflow_id, name, structural, Workflow::deactivate)
                    .await
            }
            WorkflowCommand::Duplicate(cmd) => self.handle_duplicate(cmd, name).await,
            WorkflowCommand::Delete(cmd) => self.handle_delete(cmd, name).await,
        }
    }

    async fn handle_create(
        &self,
        cmd: CreateWorkflow,
        command: &'static str,
    ) -> Result<CommandResult, DomainError> {
        self.ensure_unused(cmd.workflow_id).await?;

        let mut workflow =
            Workflow::create_with_graph(cmd.workflow_id, &cmd.name, cmd.nodes, cmd.connections)?;
        workflow.limit_pending_events(self.config.max_pending_events);

        self.commit(workflow, command).await
    }

    async fn handle_duplicate(
        &self,
        cmd: DuplicateWorkflow,
        command: &'static str,
    ) -> Result<CommandResult, DomainError> {
        self.ensure_unused(cmd.workflow_id).await?;

        let source = self.load(cmd.source_id).await?;
        let copy = source.duplicate(cmd.workflow_id, &cmd.name)?;

        self.commit(copy, command).await
    }

    /// Fails unless `id` has never held a workflow.
    ///
    /// A deleted workflow leaves its event stream behind, so the store is
    /// checked as well as the repository.
    async fn ensure_unused(&self, id: Identifier) -> Result<(), DomainError> {
        if self.repository.exists(id).await? {
            return Err(DomainError::WorkflowAlreadyExists(id));
        }
        if self.store.aggregate_version(id).await?.is_some() {
            return Err(DomainError::WorkflowIdRetired(id));
        }
        Ok(())
    }

    async fn handle_delete(
        &self,
        cmd: DeleteWorkflow,
        command: &'static str,
    ) -> Result<CommandResult, DomainError> {
        let mut workflow = self.load(cmd.workflow_id).await?;
        workflow.mark_deleted()?;

        self.repository.delete(cmd.workflow_id).await?;
        let events = workflow.drain_events();
        let last_event_version = self.publish(&events, command).await?;

        Ok(CommandResult {
            workflow_id: cmd.workflow_id,
            workflow: None,
            events,
            last_event_version,
        })
    }

    /// Loads a workflow, applies `change` and commits the outcome.
    async fn modify<F>(
        &self,
        id: Identifier,
        command: &'static str,
        structural: bool,
        change: F,
    ) -> Result<CommandResult, DomainError>
    where
        F: FnOnce(&mut Workflow) -> Result<(), WorkflowError> + Send,
    {
        let mut workflow = self.load(id).await?;

        if structural
            && workflow.is_active()
            && self.config.edit_policy == EditPolicy::RequireInactive
        {
            return Err(DomainError::WorkflowActive(id));
        }

        change(&mut workflow)?;
        self.commit(workflow, command).await
    }

    async fn load(&self, id: Identifier) -> Result<Workflow, DomainError> {
        let mut workflow = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::WorkflowNotFound(id))?;
        workflow.limit_pending_events(self.config.max_pending_events);
        Ok(workflow)
    }

    /// Saves the workflow and dispatches its pending events.
    ///
    /// A workflow with nothing pending is returned as is without a write.
    async fn commit(
        &self,
        mut workflow: Workflow,
        command: &'static str,
    ) -> Result<CommandResult, DomainError> {
        let mut last_event_version = None;
        let mut events = Vec::new();

        if workflow.has_pending_events() {
            self.repository.save(&workflow).await?;
            events = workflow.drain_events();
            last_event_version = self.publish(&events, command).await?;
        }

        Ok(CommandResult {
            workflow_id: workflow.id(),
            workflow: Some(workflow),
            events,
            last_event_version,
        })
    }

    async fn publish(
        &self,
        events: &[WorkflowEvent],
        command: &'static str,
    ) -> Result<Option<Version>, DomainError> {
        if events.is_empty() {
            return Ok(None);
        }

        let envelopes = to_envelopes::<Workflow>(events, command)?;
        let version = self.store.append(envelopes).await?;

        metrics::counter!("workflow_events_published_total").increment(events.len() as u64);
        tracing::debug!(count = events.len(), %version, "published events");

        Ok(Some(version))
    }

    /// Takes the per-workflow lock, dropping entries nobody holds.
    async fn lock(&self, id: Identifier) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// Typed command and query methods
impl<R: WorkflowRepository, S: EventStore> WorkflowService<R, S> {
    /// Creates a new workflow.
    #[tracing::instrument(skip(self))]
    pub async fn create_workflow(&self, cmd: CreateWorkflow) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_workflow(&self, cmd: RenameWorkflow) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_node(&self, cmd: AddNode) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    /// Removes a node and every connection attached to it.
    #[tracing::instrument(skip(self))]
    pub async fn remove_node(&self, cmd: RemoveNode) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_node(&self, cmd: UpdateNode) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_connection(&self, cmd: AddConnection) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_connection(
        &self,
        cmd: RemoveConnection,
    ) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn activate_workflow(
        &self,
        cmd: ActivateWorkflow,
    ) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_workflow(
        &self,
        cmd: DeactivateWorkflow,
    ) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    /// Copies a workflow under a new id and name.
    #[tracing::instrument(skip(self))]
    pub async fn duplicate_workflow(
        &self,
        cmd: DuplicateWorkflow,
    ) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    /// Deletes a workflow. Its event history stays in the event store.
    #[tracing::instrument(skip(self))]
    pub async fn delete_workflow(&self, cmd: DeleteWorkflow) -> Result<CommandResult, DomainError> {
        self.execute(cmd.into()).await
    }

    /// Loads a workflow by ID.
    ///
    /// Returns None if the workflow doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_workflow(&self, id: Identifier) -> Result<Option<Workflow>, DomainError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Lists workflow summaries, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_workflows(
        &self,
        active_only: bool,
    ) -> Result<Vec<WorkflowSummary>, DomainError> {
        let workflows = self.repository.find_all().await?;
        Ok(workflows
            .iter()
            .filter(|w| !active_only || w.is_active())
            .map(WorkflowSummary::from)
            .collect())
    }

    /// Returns the dispatched events of a workflow in order.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, id: Identifier) -> Result<Vec<EventEnvelope>, DomainError> {
        Ok(self.store.events_for_aggregate(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryWorkflowRepository;
    use crate::workflow::{Connection, Node, NodePatch};
    use common::ReadableIdentifier;
    use event_store::InMemoryEventStore;

    type Service = WorkflowService<InMemoryWorkflowRepository, InMemoryEventStore>;

    fn create_service() -> Service {
        WorkflowService::new(InMemoryWorkflowRepository::new(), InMemoryEventStore::new())
    }

    fn rid(raw: &str) -> ReadableIdentifier {
        ReadableIdentifier::parse(raw).unwrap()
    }

    fn node(id: &str, node_type: &str) -> Node {
        Node::parse(id, node_type).unwrap()
    }

    fn event_types(result: &CommandResult) -> Vec<&'static str> {
        use crate::aggregate::DomainEvent;
        result.events.iter().map(|e| e.event_type()).collect()
    }

    async fn create_invoice_flow(service: &Service) -> Identifier {
        let cmd = CreateWorkflow::new("Invoice Flow");
        let id = cmd.workflow_id;
        service.create_workflow(cmd).await.unwrap();
        service
            .add_node(AddNode::new(id, node("n1", "httpRequest")))
            .await
            .unwrap();
        service
            .add_node(AddNode::new(id, node("n2", "emailSend")))
            .await
            .unwrap();
        service
            .add_connection(AddConnection::new(id, Connection::new(rid("n1"), rid("n2"))))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_create_workflow() {
        let service = create_service();
        let cmd = CreateWorkflow::new("Invoice Flow");
        let id = cmd.workflow_id;

        let result = service.create_workflow(cmd).await.unwrap();

        assert_eq!(result.workflow_id, id);
        assert_eq!(result.workflow.as_ref().unwrap().name(), "Invoice Flow");
        assert_eq!(event_types(&result), vec!["WorkflowCreated"]);
        assert_eq!(result.last_event_version, Some(Version::first()));
        assert!(service.get_workflow(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let service = create_service();
        let cmd = CreateWorkflow::new("Invoice Flow");

        service.create_workflow(cmd.clone()).await.unwrap();
        let err = service.create_workflow(cmd).await.unwrap_err();

        assert!(matches!(err, DomainError::WorkflowAlreadyExists(_)));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_command_on_missing_workflow() {
        let service = create_service();
        let err = service
            .activate_workflow(ActivateWorkflow::new(Identifier::generate()))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::WorkflowNotFound(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_events_reach_the_store() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;

        let result = service
            .activate_workflow(ActivateWorkflow::new(id))
            .await
            .unwrap();
        assert_eq!(result.last_event_version, Some(Version::new(5)));

        let history = service.history(id).await.unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "WorkflowCreated",
                "NodeAdded",
                "NodeAdded",
                "ConnectionAdded",
                "WorkflowActivated"
            ]
        );
        assert!(history.iter().all(|e| e.aggregate_type == "Workflow"));
        assert_eq!(
            history[1].metadata.get("command"),
            Some(&serde_json::json!("AddNode"))
        );
    }

    #[tokio::test]
    async fn test_rejected_command_leaves_state() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;

        let err = service
            .add_node(AddNode::new(id, node("n1", "slack")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Workflow(WorkflowError::DuplicateNode { .. })
        ));

        let workflow = service.get_workflow(id).await.unwrap().unwrap();
        assert_eq!(workflow.node_count(), 2);
        assert_eq!(workflow.version(), Version::new(4));
        assert_eq!(service.history(id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_noop_command_dispatches_nothing() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;

        let result = service
            .deactivate_workflow(DeactivateWorkflow::new(id))
            .await
            .unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.last_event_version, None);

        let result = service
            .update_node(UpdateNode::new(id, rid("n1"), NodePatch::new()))
            .await
            .unwrap();
        assert!(result.events.is_empty());
        assert_eq!(service.history(id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_require_inactive_policy() {
        let config = ServiceConfig::default().with_edit_policy(EditPolicy::RequireInactive);
        let service = WorkflowService::with_config(
            InMemoryWorkflowRepository::new(),
            InMemoryEventStore::new(),
            config,
        );
        let id = create_invoice_flow(&service).await;
        service
            .activate_workflow(ActivateWorkflow::new(id))
            .await
            .unwrap();

        let err = service
            .remove_node(RemoveNode::new(id, rid("n2")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::WorkflowActive(w) if w == id));

        // Renaming is not a structural edit.
        service
            .rename_workflow(RenameWorkflow::new(id, "Invoices"))
            .await
            .unwrap();

        service
            .deactivate_workflow(DeactivateWorkflow::new(id))
            .await
            .unwrap();
        let result = service
            .remove_node(RemoveNode::new(id, rid("n2")))
            .await
            .unwrap();
        assert_eq!(event_types(&result), vec!["NodeRemoved", "ConnectionRemoved"]);
    }

    #[tokio::test]
    async fn test_live_edits_allowed_by_default() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;
        service
            .activate_workflow(ActivateWorkflow::new(id))
            .await
            .unwrap();

        let result = service
            .add_node(AddNode::new(id, node("n3", "slack")))
            .await
            .unwrap();
        let workflow = result.workflow.unwrap();
        assert!(workflow.is_active());
        assert_eq!(workflow.node_count(), 3);
    }

    #[tokio::test]
    async fn test_max_pending_events_applies_to_loaded_workflows() {
        let config = ServiceConfig::default().with_max_pending_events(1);
        let service = WorkflowService::with_config(
            InMemoryWorkflowRepository::new(),
            InMemoryEventStore::new(),
            config,
        );
        let id = create_invoice_flow(&service).await;

        let err = service
            .remove_node(RemoveNode::new(id, rid("n1")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Workflow(WorkflowError::EventQueueFull(_))
        ));
        let workflow = service.get_workflow(id).await.unwrap().unwrap();
        assert_eq!(workflow.node_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_workflow() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;

        let result = service
            .delete_workflow(DeleteWorkflow::new(id))
            .await
            .unwrap();

        assert!(result.workflow.is_none());
        assert_eq!(event_types(&result), vec!["WorkflowDeleted"]);
        assert!(service.get_workflow(id).await.unwrap().is_none());

        let history = service.history(id).await.unwrap();
        assert_eq!(history.last().unwrap().event_type, "WorkflowDeleted");

        let err = service
            .delete_workflow(DeleteWorkflow::new(id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_deleted_id_cannot_be_reused() {
        let service = create_service();
        let cmd = CreateWorkflow::new("Invoice Flow");
        let id = cmd.workflow_id;
        service.create_workflow(cmd.clone()).await.unwrap();
        service
            .delete_workflow(DeleteWorkflow::new(id))
            .await
            .unwrap();

        let err = service.create_workflow(cmd).await.unwrap_err();
        assert!(matches!(err, DomainError::WorkflowIdRetired(retired) if retired == id));
        assert!(err.is_conflict());

        let source_id = create_invoice_flow(&service).await;
        let err = service
            .duplicate_workflow(DuplicateWorkflow {
                source_id,
                workflow_id: id,
                name: "Copy".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::WorkflowIdRetired(_)));

        assert!(service.get_workflow(id).await.unwrap().is_none());
        let history = service.history(id).await.unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["WorkflowCreated", "WorkflowDeleted"]);
    }

    #[tokio::test]
    async fn test_mismatched_exact_connection_is_rejected() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;

        let mut cmd = RemoveConnection::exact(id, Connection::new(rid("n1"), rid("n2")));
        cmd.target_node_id = rid("n1");
        let err = service.remove_connection(cmd).await.unwrap_err();

        assert!(matches!(err, DomainError::Workflow(WorkflowError::Validation(_))));
        let workflow = service.get_workflow(id).await.unwrap().unwrap();
        assert_eq!(workflow.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_workflow() {
        let service = create_service();
        let source_id = create_invoice_flow(&service).await;

        let cmd = DuplicateWorkflow::new(source_id, "Invoice Flow (copy)");
        let copy_id = cmd.workflow_id;
        let result = service.duplicate_workflow(cmd).await.unwrap();

        assert_eq!(result.workflow_id, copy_id);
        let copy = result.workflow.unwrap();
        assert_eq!(copy.node_count(), 2);
        assert_eq!(copy.connection_count(), 1);

        assert_eq!(service.history(copy_id).await.unwrap().len(), 1);
        assert_eq!(service.history(source_id).await.unwrap().len(), 4);
        assert_eq!(service.list_workflows(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_dispatch() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;
        service
            .create_workflow(CreateWorkflow::new("Idle"))
            .await
            .unwrap();
        service
            .activate_workflow(ActivateWorkflow::new(id))
            .await
            .unwrap();

        match service.query(WorkflowQuery::Get { id }).await.unwrap() {
            QueryResult::Workflow(Some(workflow)) => assert_eq!(workflow.id(), id),
            other => panic!("unexpected result: {other:?}"),
        }

        match service
            .query(WorkflowQuery::List { active_only: true })
            .await
            .unwrap()
        {
            QueryResult::Workflows(summaries) => {
                assert_eq!(summaries.len(), 1);
                assert_eq!(summaries[0].id, id);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        match service.query(WorkflowQuery::History { id }).await.unwrap() {
            QueryResult::History(events) => assert_eq!(events.len(), 5),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_locks_are_released() {
        let service = create_service();
        let id = create_invoice_flow(&service).await;
        service
            .activate_workflow(ActivateWorkflow::new(id))
            .await
            .unwrap();

        // The next acquisition prunes every idle entry before adding its own.
        let _guard = service.lock(Identifier::generate()).await;
        assert_eq!(service.locks.lock().await.len(), 1);
    }
}
