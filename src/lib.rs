//! Strict validation and mutation contract for an MCP knowledge graph.
//!
//! Raw JSON payloads for the eight graph commands pass through
//! [`operations::validate`] before any store sees them. Failures list every
//! violation at once; successes are [`Validated`] payloads that a
//! [`KnowledgeGraphStore`] applies atomically.

pub mod error;
pub mod graph;
pub mod logging;
pub mod manager;
pub mod operations;
pub mod rules;
pub mod server;
pub mod shape;
pub mod store;

pub use error::{FieldPath, Rule, ValidationFailure, Violation, ViolationKind};
pub use graph::{Entity, KnowledgeGraph, ObservationDeletion, ObservationInput, ObservationResult, Relation};
pub use manager::{KnowledgeGraphManager, ManagerError, Outcome};
pub use operations::{validate, Command, Operation, UnknownOperation, Validated};
pub use shape::{validate_entity, validate_relation};
pub use store::{KnowledgeGraphStore, MemoryStore, StoreError};
