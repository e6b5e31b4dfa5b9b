//! Command payloads and their validators.
//!
//! Each of the eight graph commands has a strict payload shape. Validation
//! turns raw JSON into a [`Validated`] payload; nothing outside this module
//! can construct one, so a store only ever sees checked input.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{FieldPath, ValidationFailure, Violations};
use crate::graph::{Entity, ObservationDeletion, ObservationInput, Relation};
use crate::rules::{ArrayRule, StrRule, StrictObject};
use crate::shape::{self, ENTITY_REF};

const ENTITIES: ArrayRule = ArrayRule::non_empty("Must provide at least one entity");
const RELATIONS: ArrayRule = ArrayRule::non_empty("Must provide at least one relation");
const OBSERVATION_BATCH: ArrayRule =
    ArrayRule::non_empty("Must provide at least one entity with observations");
const ENTITY_NAMES: ArrayRule = ArrayRule::non_empty("Must provide at least one entity name");
const QUERY: StrRule = StrRule::non_empty("Search query cannot be empty");

/// Payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Validated<T>(T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Validated<U> {
        Validated(f(self.0))
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateEntitiesInput {
    /// Array of entities to create
    #[schemars(length(min = 1))]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRelationsInput {
    /// Array of relations to create
    #[schemars(length(min = 1))]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddObservationsInput {
    /// Array of entities and their observations
    #[schemars(length(min = 1))]
    pub observations: Vec<ObservationInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteEntitiesInput {
    /// Array of entity names to delete
    #[serde(rename = "entityNames")]
    #[schemars(length(min = 1), inner(length(min = 1)))]
    pub entity_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteObservationsInput {
    /// Array of entities and their observations to delete
    #[schemars(length(min = 1))]
    pub deletions: Vec<ObservationDeletion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteRelationsInput {
    /// Array of relations to delete
    #[schemars(length(min = 1))]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchNodesInput {
    /// The search query to match against entity names, types, and observation content
    #[schemars(length(min = 1))]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OpenNodesInput {
    /// Array of entity names to retrieve
    #[schemars(length(min = 1), inner(length(min = 1)))]
    pub names: Vec<String>,
}

/// The eight commands that go through validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateEntities,
    CreateRelations,
    AddObservations,
    DeleteEntities,
    DeleteObservations,
    DeleteRelations,
    SearchNodes,
    OpenNodes,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::CreateEntities,
        Operation::CreateRelations,
        Operation::AddObservations,
        Operation::DeleteEntities,
        Operation::DeleteObservations,
        Operation::DeleteRelations,
        Operation::SearchNodes,
        Operation::OpenNodes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateEntities => "create_entities",
            Operation::CreateRelations => "create_relations",
            Operation::AddObservations => "add_observations",
            Operation::DeleteEntities => "delete_entities",
            Operation::DeleteObservations => "delete_observations",
            Operation::DeleteRelations => "delete_relations",
            Operation::SearchNodes => "search_nodes",
            Operation::OpenNodes => "open_nodes",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// A validated command, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Command {
    CreateEntities(CreateEntitiesInput),
    CreateRelations(CreateRelationsInput),
    AddObservations(AddObservationsInput),
    DeleteEntities(DeleteEntitiesInput),
    DeleteObservations(DeleteObservationsInput),
    DeleteRelations(DeleteRelationsInput),
    SearchNodes(SearchNodesInput),
    OpenNodes(OpenNodesInput),
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::CreateEntities(_) => Operation::CreateEntities,
            Command::CreateRelations(_) => Operation::CreateRelations,
            Command::AddObservations(_) => Operation::AddObservations,
            Command::DeleteEntities(_) => Operation::DeleteEntities,
            Command::DeleteObservations(_) => Operation::DeleteObservations,
            Command::DeleteRelations(_) => Operation::DeleteRelations,
            Command::SearchNodes(_) => Operation::SearchNodes,
            Command::OpenNodes(_) => Operation::OpenNodes,
        }
    }
}

/// Validate `raw` as the payload of `operation`.
pub fn validate(operation: Operation, raw: &Value) -> Result<Validated<Command>, ValidationFailure> {
    Ok(match operation {
        Operation::CreateEntities => validate_create_entities(raw)?.map(Command::CreateEntities),
        Operation::CreateRelations => validate_create_relations(raw)?.map(Command::CreateRelations),
        Operation::AddObservations => validate_add_observations(raw)?.map(Command::AddObservations),
        Operation::DeleteEntities => validate_delete_entities(raw)?.map(Command::DeleteEntities),
        Operation::DeleteObservations => {
            validate_delete_observations(raw)?.map(Command::DeleteObservations)
        }
        Operation::DeleteRelations => validate_delete_relations(raw)?.map(Command::DeleteRelations),
        Operation::SearchNodes => validate_search_nodes(raw)?.map(Command::SearchNodes),
        Operation::OpenNodes => validate_open_nodes(raw)?.map(Command::OpenNodes),
    })
}

/// Open the top-level payload object and build it from its single field.
fn payload<T>(
    raw: &Value,
    field: &'static str,
    expected: &'static str,
    check: impl FnOnce(&Value, &FieldPath, &mut Violations) -> Option<T>,
) -> Result<Validated<T>, ValidationFailure> {
    let mut out = Violations::default();
    let value = StrictObject::open(raw, &FieldPath::root(), &[field], &mut out)
        .and_then(|obj| obj.required(field, expected, &mut out, check));
    out.finish(value).map(Validated)
}

fn entity_names(value: &Value, path: &FieldPath, out: &mut Violations) -> Option<Vec<String>> {
    ENTITY_NAMES.check(value, path, out, |v, p, out| ENTITY_REF.check(v, p, out))
}

pub fn validate_create_entities(raw: &Value) -> Result<Validated<CreateEntitiesInput>, ValidationFailure> {
    payload(raw, "entities", "array", |v, p, out| {
        ENTITIES
            .check(v, p, out, shape::entity)
            .map(|entities| CreateEntitiesInput { entities })
    })
}

pub fn validate_create_relations(raw: &Value) -> Result<Validated<CreateRelationsInput>, ValidationFailure> {
    payload(raw, "relations", "array", |v, p, out| {
        RELATIONS
            .check(v, p, out, shape::relation)
            .map(|relations| CreateRelationsInput { relations })
    })
}

pub fn validate_add_observations(raw: &Value) -> Result<Validated<AddObservationsInput>, ValidationFailure> {
    payload(raw, "observations", "array", |v, p, out| {
        OBSERVATION_BATCH
            .check(v, p, out, shape::observation_input)
            .map(|observations| AddObservationsInput { observations })
    })
}

pub fn validate_delete_entities(raw: &Value) -> Result<Validated<DeleteEntitiesInput>, ValidationFailure> {
    payload(raw, "entityNames", "array", |v, p, out| {
        entity_names(v, p, out).map(|entity_names| DeleteEntitiesInput { entity_names })
    })
}

pub fn validate_delete_observations(
    raw: &Value,
) -> Result<Validated<DeleteObservationsInput>, ValidationFailure> {
    payload(raw, "deletions", "array", |v, p, out| {
        OBSERVATION_BATCH
            .check(v, p, out, shape::observation_deletion)
            .map(|deletions| DeleteObservationsInput { deletions })
    })
}

pub fn validate_delete_relations(raw: &Value) -> Result<Validated<DeleteRelationsInput>, ValidationFailure> {
    payload(raw, "relations", "array", |v, p, out| {
        RELATIONS
            .check(v, p, out, shape::relation)
            .map(|relations| DeleteRelationsInput { relations })
    })
}

pub fn validate_search_nodes(raw: &Value) -> Result<Validated<SearchNodesInput>, ValidationFailure> {
    payload(raw, "query", "string", |v, p, out| {
        QUERY.check(v, p, out).map(|query| SearchNodesInput { query })
    })
}

pub fn validate_open_nodes(raw: &Value) -> Result<Validated<OpenNodesInput>, ValidationFailure> {
    payload(raw, "names", "array", |v, p, out| {
        entity_names(v, p, out).map(|names| OpenNodesInput { names })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        assert_eq!(
            "read_everything".parse::<Operation>().unwrap_err(),
            UnknownOperation("read_everything".to_string())
        );
    }

    #[test]
    fn command_knows_its_operation() {
        let raw = serde_json::json!({ "query": "x" });
        let command = validate(Operation::SearchNodes, &raw).unwrap();
        assert_eq!(command.operation(), Operation::SearchNodes);
    }
}
