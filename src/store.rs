//! Graph store contract and the in-memory store behind the server.
//!
//! Stores only receive payloads that already passed validation. They own
//! everything validation cannot know: duplicates, referential integrity and
//! cascading deletes. Every batch is all-or-nothing.

use std::collections::HashSet;

use parking_lot::RwLock;
use thiserror::Error;

use crate::graph::{Entity, KnowledgeGraph, ObservationDeletion, ObservationInput, ObservationResult, Relation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Entity '{0}' does not exist")]
    EntityNotFound(String),

    #[error("Cannot create relation '{from}' -> '{to}' (type: '{relation_type}'): one or both entities do not exist")]
    MissingEndpoint {
        from: String,
        to: String,
        relation_type: String,
    },
}

/// Operations a knowledge graph backend must provide.
pub trait KnowledgeGraphStore: Send + Sync {
    /// Create entities, skipping names already present (returns only newly created)
    fn create_entities(&self, entities: &[Entity]) -> Result<Vec<Entity>, StoreError>;

    /// Create relations between existing entities, skipping exact duplicates
    fn create_relations(&self, relations: &[Relation]) -> Result<Vec<Relation>, StoreError>;

    /// Append observations not already present on each entity
    fn add_observations(&self, inputs: &[ObservationInput]) -> Result<Vec<ObservationResult>, StoreError>;

    /// Delete entities and every relation touching them; absent names are ignored
    fn delete_entities(&self, names: &[String]) -> Result<usize, StoreError>;

    fn delete_observations(&self, deletions: &[ObservationDeletion]) -> Result<(), StoreError>;

    fn delete_relations(&self, relations: &[Relation]) -> Result<usize, StoreError>;

    fn read_graph(&self) -> Result<KnowledgeGraph, StoreError>;

    /// Entities whose name, type or observations contain `query` (case-insensitive),
    /// plus relations between them
    fn search_nodes(&self, query: &str) -> Result<KnowledgeGraph, StoreError>;

    /// Entities with exactly these names, plus relations between them
    fn open_nodes(&self, names: &[String]) -> Result<KnowledgeGraph, StoreError>;
}

/// Knowledge graph held in process memory.
///
/// A batch holds the write lock from its first check to its last change, so
/// batches are atomic and never interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: RwLock<KnowledgeGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing graph
    pub fn with_graph(graph: KnowledgeGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }
}

fn has_entity(graph: &KnowledgeGraph, name: &str) -> bool {
    graph.entities.iter().any(|e| e.name == name)
}

fn require_entities<'a>(
    graph: &KnowledgeGraph,
    mut names: impl Iterator<Item = &'a String>,
) -> Result<(), StoreError> {
    match names.find(|name| !has_entity(graph, name)) {
        Some(missing) => Err(StoreError::EntityNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Sub-graph made of `entities` and the relations with both ends among them
fn subgraph(graph: &KnowledgeGraph, entities: Vec<Entity>) -> KnowledgeGraph {
    let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let relations = graph
        .relations
        .iter()
        .filter(|r| names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
        .cloned()
        .collect();
    KnowledgeGraph { entities, relations }
}

impl KnowledgeGraphStore for MemoryStore {
    fn create_entities(&self, entities: &[Entity]) -> Result<Vec<Entity>, StoreError> {
        let mut graph = self.graph.write();
        let mut created = Vec::new();

        for entity in entities {
            if !has_entity(&graph, &entity.name) {
                graph.entities.push(entity.clone());
                created.push(entity.clone());
            }
        }
        Ok(created)
    }

    fn create_relations(&self, relations: &[Relation]) -> Result<Vec<Relation>, StoreError> {
        let mut graph = self.graph.write();

        // Check every endpoint before touching anything
        if let Some(rel) = relations
            .iter()
            .find(|r| !has_entity(&graph, &r.from) || !has_entity(&graph, &r.to))
        {
            return Err(StoreError::MissingEndpoint {
                from: rel.from.clone(),
                to: rel.to.clone(),
                relation_type: rel.relation_type.clone(),
            });
        }

        let mut created = Vec::new();
        for rel in relations {
            if !graph.relations.contains(rel) {
                graph.relations.push(rel.clone());
                created.push(rel.clone());
            }
        }
        Ok(created)
    }

    fn add_observations(&self, inputs: &[ObservationInput]) -> Result<Vec<ObservationResult>, StoreError> {
        let mut graph = self.graph.write();
        require_entities(&graph, inputs.iter().map(|i| &i.entity_name))?;

        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut added = Vec::new();
            if let Some(entity) = graph.entities.iter_mut().find(|e| e.name == input.entity_name) {
                for obs in &input.contents {
                    if !entity.observations.contains(obs) {
                        entity.observations.push(obs.clone());
                        added.push(obs.clone());
                    }
                }
            }
            results.push(ObservationResult {
                entity_name: input.entity_name.clone(),
                added_observations: added,
            });
        }
        Ok(results)
    }

    fn delete_entities(&self, names: &[String]) -> Result<usize, StoreError> {
        let mut graph = self.graph.write();
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();

        let before = graph.entities.len();
        graph.entities.retain(|e| !doomed.contains(e.name.as_str()));
        let deleted = before - graph.entities.len();

        // cascade
        graph
            .relations
            .retain(|r| !doomed.contains(r.from.as_str()) && !doomed.contains(r.to.as_str()));
        Ok(deleted)
    }

    fn delete_observations(&self, deletions: &[ObservationDeletion]) -> Result<(), StoreError> {
        let mut graph = self.graph.write();
        require_entities(&graph, deletions.iter().map(|d| &d.entity_name))?;

        for deletion in deletions {
            if let Some(entity) = graph.entities.iter_mut().find(|e| e.name == deletion.entity_name) {
                entity.observations.retain(|obs| !deletion.observations.contains(obs));
            }
        }
        Ok(())
    }

    fn delete_relations(&self, relations: &[Relation]) -> Result<usize, StoreError> {
        let mut graph = self.graph.write();
        let before = graph.relations.len();
        graph.relations.retain(|r| !relations.contains(r));
        Ok(before - graph.relations.len())
    }

    fn read_graph(&self) -> Result<KnowledgeGraph, StoreError> {
        Ok(self.graph.read().clone())
    }

    fn search_nodes(&self, query: &str) -> Result<KnowledgeGraph, StoreError> {
        let graph = self.graph.read();
        let needle = query.to_lowercase();
        let matches = |text: &str| text.to_lowercase().contains(&needle);

        let entities = graph
            .entities
            .iter()
            .filter(|e| {
                matches(e.name.as_str())
                    || matches(e.entity_type.as_str())
                    || e.observations.iter().any(|o| matches(o.as_str()))
            })
            .cloned()
            .collect();
        Ok(subgraph(&graph, entities))
    }

    fn open_nodes(&self, names: &[String]) -> Result<KnowledgeGraph, StoreError> {
        let graph = self.graph.read();
        let entities = graph
            .entities
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect();
        Ok(subgraph(&graph, entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: "person".to_string(),
            observations: vec![],
        }
    }

    fn relation(from: &str, to: &str) -> Relation {
        Relation {
            from: from.to_string(),
            to: to.to_string(),
            relation_type: "knows".to_string(),
        }
    }

    #[test]
    fn duplicate_names_inside_one_batch_are_created_once() {
        let store = MemoryStore::new();
        let created = store.create_entities(&[entity("Alice"), entity("Alice")]).unwrap();
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn relation_batch_with_dangling_endpoint_creates_nothing() {
        let store = MemoryStore::new();
        store.create_entities(&[entity("Alice"), entity("Bob")]).unwrap();

        let err = store
            .create_relations(&[relation("Alice", "Bob"), relation("Alice", "Carol")])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingEndpoint { ref to, .. } if to == "Carol"));
        assert!(store.read_graph().unwrap().relations.is_empty());
    }

    #[test]
    fn add_observations_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create_entities(&[entity("Alice")]).unwrap();

        let err = store
            .add_observations(&[
                ObservationInput {
                    entity_name: "Alice".to_string(),
                    contents: vec!["Likes tea".to_string()],
                },
                ObservationInput {
                    entity_name: "Ghost".to_string(),
                    contents: vec!["Boo".to_string()],
                },
            ])
            .unwrap_err();
        assert_eq!(err, StoreError::EntityNotFound("Ghost".to_string()));
        assert!(store.read_graph().unwrap().entities[0].observations.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_keeps_inner_relations() {
        let store = MemoryStore::new();
        store
            .create_entities(&[entity("Alice"), entity("Bob"), entity("Acme")])
            .unwrap();
        store
            .create_relations(&[relation("Alice", "Bob"), relation("Alice", "Acme")])
            .unwrap();

        let found = store.search_nodes("ALICE").unwrap();
        assert_eq!(found.entities.len(), 1);
        assert!(found.relations.is_empty());

        let found = store.search_nodes("PERSON").unwrap();
        assert_eq!(found.entities.len(), 3);
        assert_eq!(found.relations.len(), 2);
    }
}
