use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ValidationFailure;
use crate::graph::{Entity, KnowledgeGraph, ObservationResult, Relation};
use crate::operations::{
    self, AddObservationsInput, Command, CreateEntitiesInput, CreateRelationsInput, DeleteEntitiesInput,
    DeleteObservationsInput, DeleteRelationsInput, OpenNodesInput, Operation, SearchNodesInput, Validated,
};
use crate::store::{KnowledgeGraphStore, MemoryStore, StoreError};

/// Either the payload was rejected, or the store refused a valid one.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a command produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Entities(Vec<Entity>),
    Relations(Vec<Relation>),
    Observations(Vec<ObservationResult>),
    Deleted(usize),
    Done,
    Graph(KnowledgeGraph),
}

/// Manager for knowledge graph operations
/// Validates raw input, then hands the checked payload to the store
pub struct KnowledgeGraphManager<S = MemoryStore> {
    store: Arc<S>,
}

impl KnowledgeGraphManager<MemoryStore> {
    /// Manager over an empty in-memory graph
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }
}

impl Default for KnowledgeGraphManager<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: KnowledgeGraphStore> KnowledgeGraphManager<S> {
    pub fn with_store(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `raw` as `operation` and run it. Rejected input never reaches the store.
    pub async fn execute(&self, operation: Operation, raw: &Value) -> Result<Outcome, ManagerError> {
        let command = operations::validate(operation, raw).inspect_err(|failure| {
            warn!(%operation, violations = failure.len(), "rejected payload: {}", failure);
        })?;
        self.apply(command).await
    }

    /// Run a command that already passed validation
    pub async fn apply(&self, command: Validated<Command>) -> Result<Outcome, ManagerError> {
        debug!(operation = %command.operation(), "applying command");
        let outcome = match command.into_inner() {
            Command::CreateEntities(input) => Outcome::Entities(self.store.create_entities(&input.entities)?),
            Command::CreateRelations(input) => Outcome::Relations(self.store.create_relations(&input.relations)?),
            Command::AddObservations(input) => {
                Outcome::Observations(self.store.add_observations(&input.observations)?)
            }
            Command::DeleteEntities(input) => Outcome::Deleted(self.store.delete_entities(&input.entity_names)?),
            Command::DeleteObservations(input) => {
                self.store.delete_observations(&input.deletions)?;
                Outcome::Done
            }
            Command::DeleteRelations(input) => Outcome::Deleted(self.store.delete_relations(&input.relations)?),
            Command::SearchNodes(input) => Outcome::Graph(self.store.search_nodes(&input.query)?),
            Command::OpenNodes(input) => Outcome::Graph(self.store.open_nodes(&input.names)?),
        };
        Ok(outcome)
    }

    /// Create entities (returns only newly created entities)
    pub async fn create_entities(&self, input: Validated<CreateEntitiesInput>) -> Result<Vec<Entity>, StoreError> {
        self.store.create_entities(&input.entities)
    }

    /// Create relations (returns only newly created relations)
    pub async fn create_relations(
        &self,
        input: Validated<CreateRelationsInput>,
    ) -> Result<Vec<Relation>, StoreError> {
        self.store.create_relations(&input.relations)
    }

    /// Add observations to multiple entities (batch operation)
    pub async fn add_observations(
        &self,
        input: Validated<AddObservationsInput>,
    ) -> Result<Vec<ObservationResult>, StoreError> {
        self.store.add_observations(&input.observations)
    }

    /// Delete entities (cascade deletes their relations)
    pub async fn delete_entities(&self, input: Validated<DeleteEntitiesInput>) -> Result<usize, StoreError> {
        self.store.delete_entities(&input.entity_names)
    }

    /// Delete observations from multiple entities (batch operation)
    pub async fn delete_observations(&self, input: Validated<DeleteObservationsInput>) -> Result<(), StoreError> {
        self.store.delete_observations(&input.deletions)
    }

    pub async fn delete_relations(&self, input: Validated<DeleteRelationsInput>) -> Result<usize, StoreError> {
        self.store.delete_relations(&input.relations)
    }

    /// Read entire knowledge graph
    pub async fn read_graph(&self) -> Result<KnowledgeGraph, StoreError> {
        self.store.read_graph()
    }

    pub async fn search_nodes(&self, input: Validated<SearchNodesInput>) -> Result<KnowledgeGraph, StoreError> {
        self.store.search_nodes(&input.query)
    }

    /// Open specific nodes by names
    pub async fn open_nodes(&self, input: Validated<OpenNodesInput>) -> Result<KnowledgeGraph, StoreError> {
        self.store.open_nodes(&input.names)
    }
}
