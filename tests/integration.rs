use std::sync::Arc;

use memory_guard_rs::graph::{Entity, KnowledgeGraph, Relation};
use memory_guard_rs::manager::{KnowledgeGraphManager, ManagerError, Outcome};
use memory_guard_rs::operations::Operation;
use memory_guard_rs::store::{KnowledgeGraphStore, MemoryStore, StoreError};
use serde_json::json;

/// Helper to build a manager with Alice and Bob already present
async fn seeded_manager() -> KnowledgeGraphManager {
    let manager = KnowledgeGraphManager::new();
    manager
        .execute(
            Operation::CreateEntities,
            &json!({
                "entities": [
                    { "name": "Alice", "entityType": "person", "observations": ["Lives in Paris"] },
                    { "name": "Bob", "entityType": "person", "observations": ["Lives in London"] }
                ]
            }),
        )
        .await
        .unwrap();
    manager
}

#[tokio::test]
async fn test_create_and_read_entities() {
    let manager = KnowledgeGraphManager::new();

    let outcome = manager
        .execute(
            Operation::CreateEntities,
            &json!({ "entities": [{ "name": "Alice", "entityType": "person" }] }),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Entities(vec![Entity {
            name: "Alice".to_string(),
            entity_type: "person".to_string(),
            observations: vec![],
        }])
    );

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 1);
    assert_eq!(graph.entities[0].name, "Alice");
}

#[tokio::test]
async fn test_deduplication() {
    let manager = seeded_manager().await;

    let outcome = manager
        .execute(
            Operation::CreateEntities,
            &json!({ "entities": [{ "name": "Alice", "entityType": "robot" }] }),
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Entities(vec![])); // Duplicate ignored

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 2);
    assert_eq!(graph.entities[0].entity_type, "person");
}

#[tokio::test]
async fn test_rejected_payload_leaves_graph_untouched() {
    let manager = seeded_manager().await;
    let before = manager.read_graph().await.unwrap();

    // One bad entity poisons the whole batch
    let result = manager
        .execute(
            Operation::CreateEntities,
            &json!({
                "entities": [
                    { "name": "Carol", "entityType": "person" },
                    { "name": "Dave", "entityType": "person", "extra": true }
                ]
            }),
        )
        .await;

    match result {
        Err(ManagerError::Validation(failure)) => {
            assert_eq!(failure.at("entities[1].extra").len(), 1);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert_eq!(manager.read_graph().await.unwrap(), before);
    assert_eq!(manager.store().read_graph().unwrap().entities.len(), 2);
}

#[tokio::test]
async fn test_create_relations() {
    let manager = seeded_manager().await;

    let outcome = manager
        .execute(
            Operation::CreateRelations,
            &json!({ "relations": [{ "from": "Alice", "to": "Bob", "relationType": "knows" }] }),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Relations(ref created) if created.len() == 1));

    // same triple again
    let outcome = manager
        .execute(
            Operation::CreateRelations,
            &json!({ "relations": [{ "from": "Alice", "to": "Bob", "relationType": "knows" }] }),
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Relations(vec![]));

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.relations.len(), 1);
}

#[tokio::test]
async fn test_relation_requires_entities() {
    let manager = seeded_manager().await;

    let result = manager
        .execute(
            Operation::CreateRelations,
            &json!({ "relations": [{ "from": "Alice", "to": "Carol", "relationType": "knows" }] }),
        )
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, ManagerError::Store(StoreError::MissingEndpoint { .. })));
    let msg = err.to_string();
    assert!(msg.contains("Alice"));
    assert!(msg.contains("Carol"));
    assert!(msg.contains("do not exist"));
}

#[tokio::test]
async fn test_self_loop_relation() {
    let manager = seeded_manager().await;

    manager
        .execute(
            Operation::CreateRelations,
            &json!({ "relations": [{ "from": "Alice", "to": "Alice", "relationType": "admires" }] }),
        )
        .await
        .unwrap();

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.relations[0].from, graph.relations[0].to);
}

#[tokio::test]
async fn test_add_observations() {
    let manager = seeded_manager().await;

    let outcome = manager
        .execute(
            Operation::AddObservations,
            &json!({
                "observations": [{ "entityName": "Alice", "contents": ["Lives in Paris", "Speaks French"] }]
            }),
        )
        .await
        .unwrap();

    let Outcome::Observations(results) = outcome else {
        panic!("expected observation results");
    };
    assert_eq!(results[0].added_observations, vec!["Speaks French"]); // already known fact skipped

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities[0].observations.len(), 2);
}

#[tokio::test]
async fn test_error_context_entity_not_found() {
    let manager = seeded_manager().await;

    let result = manager
        .execute(
            Operation::AddObservations,
            &json!({ "observations": [{ "entityName": "NonExistent", "contents": ["test"] }] }),
        )
        .await;

    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("NonExistent"));
    assert!(err_msg.contains("does not exist"));
}

#[tokio::test]
async fn test_cascade_delete() {
    let manager = seeded_manager().await;
    manager
        .execute(
            Operation::CreateRelations,
            &json!({ "relations": [{ "from": "Alice", "to": "Bob", "relationType": "knows" }] }),
        )
        .await
        .unwrap();

    let outcome = manager
        .execute(Operation::DeleteEntities, &json!({ "entityNames": ["Alice", "Nobody"] }))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Deleted(1));

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 1); // Only Bob
    assert_eq!(graph.relations.len(), 0); // Relation deleted
}

#[tokio::test]
async fn test_delete_observations() {
    let manager = seeded_manager().await;

    let outcome = manager
        .execute(
            Operation::DeleteObservations,
            &json!({ "deletions": [{ "entityName": "Alice", "observations": ["Lives in Paris"] }] }),
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);

    let graph = manager.read_graph().await.unwrap();
    assert!(graph.entities[0].observations.is_empty());
    assert_eq!(graph.entities[1].observations.len(), 1);
}

#[tokio::test]
async fn test_delete_relations() {
    let manager = seeded_manager().await;
    let knows = json!({ "relations": [{ "from": "Alice", "to": "Bob", "relationType": "knows" }] });
    manager.execute(Operation::CreateRelations, &knows).await.unwrap();

    let outcome = manager.execute(Operation::DeleteRelations, &knows).await.unwrap();
    assert_eq!(outcome, Outcome::Deleted(1));

    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 2); // Entities still exist
    assert_eq!(graph.relations.len(), 0);
}

#[tokio::test]
async fn test_search_nodes() {
    let manager = seeded_manager().await;

    let Outcome::Graph(result) = manager
        .execute(Operation::SearchNodes, &json!({ "query": "paris" }))
        .await
        .unwrap()
    else {
        panic!("expected graph");
    };
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.entities[0].name, "Alice");

    let Outcome::Graph(result) = manager
        .execute(Operation::SearchNodes, &json!({ "query": "person" }))
        .await
        .unwrap()
    else {
        panic!("expected graph");
    };
    assert_eq!(result.entities.len(), 2);
}

#[tokio::test]
async fn test_empty_search_query_is_rejected() {
    let manager = seeded_manager().await;
    let result = manager.execute(Operation::SearchNodes, &json!({ "query": "" })).await;
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[tokio::test]
async fn test_open_nodes() {
    let store = Arc::new(MemoryStore::with_graph(KnowledgeGraph {
        entities: ["Alice", "Bob", "Charlie"]
            .into_iter()
            .map(|name| Entity {
                name: name.to_string(),
                entity_type: "person".to_string(),
                observations: vec![],
            })
            .collect(),
        relations: vec![
            Relation {
                from: "Alice".to_string(),
                to: "Charlie".to_string(),
                relation_type: "knows".to_string(),
            },
            Relation {
                from: "Alice".to_string(),
                to: "Bob".to_string(),
                relation_type: "knows".to_string(),
            },
        ],
    }));
    let manager = KnowledgeGraphManager::with_store(store);

    let Outcome::Graph(result) = manager
        .execute(Operation::OpenNodes, &json!({ "names": ["Alice", "Charlie"] }))
        .await
        .unwrap()
    else {
        panic!("expected graph");
    };

    let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Charlie"]);
    assert_eq!(result.relations.len(), 1); // Alice -> Bob is outside the opened set
    assert_eq!(result.relations[0].to, "Charlie");
}

#[tokio::test]
async fn test_concurrent_batches_do_not_interleave() {
    let manager = Arc::new(KnowledgeGraphManager::new());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let entities: Vec<_> = (0..10)
                .map(|j| json!({ "name": format!("n{}", j), "entityType": format!("writer{}", i) }))
                .collect();
            manager
                .execute(Operation::CreateEntities, &json!({ "entities": entities }))
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // exactly one batch won every name
    let graph = manager.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 10);
    let first_type = &graph.entities[0].entity_type;
    assert!(graph.entities.iter().all(|e| &e.entity_type == first_type));
}
