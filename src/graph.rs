use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Longest allowed entity name, in chars
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest allowed observation, in chars
pub const MAX_OBSERVATION_LENGTH: usize = 1000;

/// Entity in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    /// The unique identifier name of the entity
    #[schemars(length(min = 1, max = 100))]
    pub name: String,

    /// The type/category of the entity (person, organization, concept, etc.)
    #[serde(rename = "entityType")]
    #[schemars(length(min = 1))]
    pub entity_type: String,

    /// Array of observations about this entity
    #[serde(default)]
    #[schemars(inner(length(min = 1, max = 1000)))]
    pub observations: Vec<String>,
}

/// Directed relation between two entities
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct Relation {
    /// The name of the entity where the relation starts
    #[schemars(length(min = 1))]
    pub from: String,

    /// The name of the entity where the relation ends
    #[schemars(length(min = 1))]
    pub to: String,

    /// The type of the relation (works_at, knows, related_to, etc.)
    #[serde(rename = "relationType")]
    #[schemars(length(min = 1))]
    pub relation_type: String,
}

/// Complete knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

/// Observations to append to one entity
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ObservationInput {
    /// The name of the entity to add observations to
    #[serde(rename = "entityName")]
    #[schemars(length(min = 1))]
    pub entity_name: String,

    /// Array of observations to add
    #[schemars(length(min = 1), inner(length(min = 1, max = 1000)))]
    pub contents: Vec<String>,
}

/// Result of adding observations
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ObservationResult {
    #[serde(rename = "entityName")]
    pub entity_name: String,
    #[serde(rename = "addedObservations")]
    pub added_observations: Vec<String>,
}

/// Observations to remove from one entity
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ObservationDeletion {
    /// The name of the entity containing the observations
    #[serde(rename = "entityName")]
    #[schemars(length(min = 1))]
    pub entity_name: String,

    /// Array of observations to delete
    #[schemars(length(min = 1), inner(length(min = 1)))]
    pub observations: Vec<String>,
}
