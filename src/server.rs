//! MCP tool surface over the knowledge graph manager.
//!
//! Tools advertise the typed schema of their payload, but receive the raw
//! argument object so that strict validation (unknown keys, empty batches,
//! length limits) reports every problem instead of failing inside serde.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::ValidationFailure;
use crate::manager::KnowledgeGraphManager;
use crate::operations::{
    self, AddObservationsInput, CreateEntitiesInput, CreateRelationsInput, DeleteEntitiesInput,
    DeleteObservationsInput, DeleteRelationsInput, OpenNodesInput, Operation, SearchNodesInput,
};

/// Raw tool arguments that advertise the schema of `T`.
pub struct ToolArgs<T> {
    fields: Map<String, Value>,
    payload: PhantomData<fn() -> T>,
}

impl<T> ToolArgs<T> {
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl<'de, T> Deserialize<'de> for ToolArgs<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(|fields| Self {
            fields,
            payload: PhantomData,
        })
    }
}

impl<T: JsonSchema> JsonSchema for ToolArgs<T> {
    fn schema_name() -> Cow<'static, str> {
        T::schema_name()
    }

    fn schema_id() -> Cow<'static, str> {
        T::schema_id()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        T::json_schema(generator)
    }
}

#[derive(Clone)]
pub struct MemoryServer {
    manager: Arc<KnowledgeGraphManager>,
    tool_router: ToolRouter<Self>,
}

impl MemoryServer {
    pub fn new(manager: Arc<KnowledgeGraphManager>) -> Self {
        Self {
            manager,
            tool_router: Self::tool_router(),
        }
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "memory-guard-rs".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: None,
        }
    }
}

#[tool_router]
impl MemoryServer {
    /// Create new entities in knowledge graph
    #[tool(
        name = "create_entities",
        description = "Create multiple new entities in the knowledge graph"
    )]
    async fn create_entities(
        &self,
        Parameters(args): Parameters<ToolArgs<CreateEntitiesInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_create_entities(&args.into_value())
            .map_err(invalid_args(Operation::CreateEntities))?;
        let created = self
            .manager
            .create_entities(input)
            .await
            .map_err(internal_err("Failed to create entities"))?;

        let summary = format!("{} entities created successfully", created.len());
        Ok(structured(summary, &created))
    }

    /// Create relations between entities
    #[tool(
        name = "create_relations",
        description = "Create multiple new relations between entities in the knowledge graph"
    )]
    async fn create_relations(
        &self,
        Parameters(args): Parameters<ToolArgs<CreateRelationsInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_create_relations(&args.into_value())
            .map_err(invalid_args(Operation::CreateRelations))?;
        let created = self
            .manager
            .create_relations(input)
            .await
            .map_err(internal_err("Failed to create relations"))?;

        let summary = format!("{} relations created successfully", created.len());
        Ok(structured(summary, &created))
    }

    /// Add observations to entities
    #[tool(
        name = "add_observations",
        description = "Add new observations to existing entities in the knowledge graph (batch operation)"
    )]
    async fn add_observations(
        &self,
        Parameters(args): Parameters<ToolArgs<AddObservationsInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_add_observations(&args.into_value())
            .map_err(invalid_args(Operation::AddObservations))?;
        let results = self
            .manager
            .add_observations(input)
            .await
            .map_err(internal_err("Failed to add observations"))?;

        let summary = format!("Added observations to {} entities", results.len());
        Ok(structured(summary, &results))
    }

    /// Delete entities and their relations
    #[tool(
        name = "delete_entities",
        description = "Delete entities and their associated relations from the knowledge graph"
    )]
    async fn delete_entities(
        &self,
        Parameters(args): Parameters<ToolArgs<DeleteEntitiesInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_delete_entities(&args.into_value())
            .map_err(invalid_args(Operation::DeleteEntities))?;
        let count = self
            .manager
            .delete_entities(input)
            .await
            .map_err(internal_err("Failed to delete entities"))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "{} entities deleted successfully",
            count
        ))]))
    }

    /// Delete observations from entities
    #[tool(
        name = "delete_observations",
        description = "Delete specific observations from entities in the knowledge graph (batch operation)"
    )]
    async fn delete_observations(
        &self,
        Parameters(args): Parameters<ToolArgs<DeleteObservationsInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_delete_observations(&args.into_value())
            .map_err(invalid_args(Operation::DeleteObservations))?;
        self.manager
            .delete_observations(input)
            .await
            .map_err(internal_err("Failed to delete observations"))?;

        Ok(CallToolResult::success(vec![Content::text(
            "Observations deleted successfully",
        )]))
    }

    /// Delete relations
    #[tool(
        name = "delete_relations",
        description = "Delete specific relations from the knowledge graph"
    )]
    async fn delete_relations(
        &self,
        Parameters(args): Parameters<ToolArgs<DeleteRelationsInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_delete_relations(&args.into_value())
            .map_err(invalid_args(Operation::DeleteRelations))?;
        let count = self
            .manager
            .delete_relations(input)
            .await
            .map_err(internal_err("Failed to delete relations"))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "{} relations deleted successfully",
            count
        ))]))
    }

    /// Read entire knowledge graph
    #[tool(
        name = "read_graph",
        description = "Read the entire knowledge graph"
    )]
    async fn read_graph(&self) -> Result<CallToolResult, McpError> {
        let graph = self
            .manager
            .read_graph()
            .await
            .map_err(internal_err("Failed to read graph"))?;

        let summary = format!(
            "Knowledge graph contains {} entities and {} relations",
            graph.entities.len(),
            graph.relations.len()
        );
        Ok(structured(summary, &graph))
    }

    /// Search nodes by query
    #[tool(
        name = "search_nodes",
        description = "Search for nodes in the knowledge graph. Matches entity names, types, and observations (case-insensitive)."
    )]
    async fn search_nodes(
        &self,
        Parameters(args): Parameters<ToolArgs<SearchNodesInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_search_nodes(&args.into_value())
            .map_err(invalid_args(Operation::SearchNodes))?;
        let result = self
            .manager
            .search_nodes(input)
            .await
            .map_err(internal_err("Failed to search nodes"))?;

        let summary = format!(
            "Found {} entities and {} relations",
            result.entities.len(),
            result.relations.len()
        );
        Ok(structured(summary, &result))
    }

    /// Open specific nodes by names
    #[tool(
        name = "open_nodes",
        description = "Open specific nodes in the knowledge graph by their names"
    )]
    async fn open_nodes(
        &self,
        Parameters(args): Parameters<ToolArgs<OpenNodesInput>>,
    ) -> Result<CallToolResult, McpError> {
        let input = operations::validate_open_nodes(&args.into_value())
            .map_err(invalid_args(Operation::OpenNodes))?;
        let result = self
            .manager
            .open_nodes(input)
            .await
            .map_err(internal_err("Failed to open nodes"))?;

        let summary = format!(
            "Retrieved {} entities and {} relations",
            result.entities.len(),
            result.relations.len()
        );
        Ok(structured(summary, &result))
    }
}

#[tool_handler]
impl ServerHandler for MemoryServer {
    fn get_info(&self) -> ServerInfo {
        self.server_info()
    }
}

fn structured<T: Serialize>(summary: String, payload: &T) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(summary)],
        structured_content: Some(json!(payload)),
        is_error: Some(false),
        meta: None,
    }
}

/// Rejected payloads become `invalid_params` carrying every violation
fn invalid_args(operation: Operation) -> impl FnOnce(ValidationFailure) -> McpError {
    move |failure| {
        warn!(%operation, violations = failure.len(), "rejected tool arguments: {}", failure);
        McpError::invalid_params(
            format!("Invalid arguments for {}", operation),
            Some(json!({ "violations": failure.violations() })),
        )
    }
}

// Helper for error conversion
fn internal_err<T: ToString>(msg: &'static str) -> impl FnOnce(T) -> McpError + Clone {
    move |err| McpError::internal_error(msg, Some(json!({ "error": err.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_args_advertise_payload_schema() {
        let schema = schemars::schema_for!(ToolArgs<CreateEntitiesInput>);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert!(value["properties"]["entities"].is_object());
        assert_eq!(value["additionalProperties"], false);
    }

    #[test]
    fn tool_args_keep_unknown_keys_for_the_validator() {
        let args: ToolArgs<SearchNodesInput> =
            serde_json::from_value(json!({ "query": "x", "qeury": "y" })).unwrap();
        let err = operations::validate_search_nodes(&args.into_value()).unwrap_err();
        assert_eq!(err.at("qeury").len(), 1);
    }
}
