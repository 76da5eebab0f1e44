//! Integration tests for the MCP server.

use serde_json::{json, Map, Value as JsonValue};

use docstore_mcp::{ProjectRegistry, ServerError, ToolRegistry};

/// Create a single-project in-memory registry.
fn test_registry() -> ProjectRegistry {
    ProjectRegistry::in_memory(["test-project"], "test-project")
}

/// Create a two-project in-memory registry.
fn multi_registry() -> ProjectRegistry {
    ProjectRegistry::in_memory(["alpha", "beta"], "alpha,beta")
}

/// Helper to dispatch a tool call.
async fn call_tool(
    registry: &ProjectRegistry,
    tools: &ToolRegistry,
    name: &str,
    args: JsonValue,
) -> JsonValue {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    tools
        .dispatch(registry, name, args_map)
        .await
        .unwrap_or_else(|e| panic!("Tool {} failed: {}", name, e))
}

/// Helper to dispatch a tool call and expect an error.
async fn call_tool_err(
    registry: &ProjectRegistry,
    tools: &ToolRegistry,
    name: &str,
    args: JsonValue,
) -> ServerError {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    tools
        .dispatch(registry, name, args_map)
        .await
        .expect_err(&format!("Expected tool {} to fail", name))
}

/// Seed a "people" collection with known ids.
async fn seed_people(registry: &ProjectRegistry, tools: &ToolRegistry) {
    for (name, age) in [("carol", 35), ("alice", 30), ("bob", 20)] {
        call_tool(
            registry,
            tools,
            "createDocument",
            json!({
                "collection": "people",
                "id": name,
                "data": { "name": name, "age": age }
            }),
        )
        .await;
    }
}

// =============================================================================
// Document Tools
// =============================================================================

#[tokio::test]
async fn test_get_missing_document_returns_error_payload() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let result = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "users", "id": "nope"}),
    )
    .await;
    assert_eq!(result, json!({"error": "Document not found"}));
}

#[tokio::test]
async fn test_create_without_id_generates_one() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let created = call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "data": {"name": "a"}}),
    )
    .await;
    let id = created
        .get("id")
        .and_then(|v| v.as_str())
        .expect("Expected generated id")
        .to_string();
    assert!(!id.is_empty());
    assert_eq!(created.get("name"), Some(&json!("a")));

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": &id}),
    )
    .await;
    assert_eq!(fetched, json!({"id": id, "name": "a"}));
}

#[tokio::test]
async fn test_create_with_explicit_id_overwrites() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d1", "data": {"a": 1}}),
    )
    .await;
    // A second create at the same id replaces the first, silently.
    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d1", "data": {"b": 2}}),
    )
    .await;

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d1"}),
    )
    .await;
    assert_eq!(fetched, json!({"id": "d1", "b": 2}));
}

#[tokio::test]
async fn test_update_merge_true_shallow_merges() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": {"a": 1, "b": 2}}),
    )
    .await;
    let updated = call_tool(
        &registry,
        &tools,
        "updateDocument",
        json!({"collection": "c", "id": "d", "data": {"b": 3}}),
    )
    .await;
    assert_eq!(updated, json!({"id": "d", "a": 1, "b": 3}));
}

#[tokio::test]
async fn test_update_merge_false_replaces() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": {"a": 1, "b": 2}}),
    )
    .await;
    let updated = call_tool(
        &registry,
        &tools,
        "updateDocument",
        json!({"collection": "c", "id": "d", "data": {"b": 3}, "merge": false}),
    )
    .await;
    assert_eq!(updated, json!({"id": "d", "b": 3}));
    assert!(updated.get("a").is_none());
}

#[tokio::test]
async fn test_update_missing_document_does_not_write() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let result = call_tool(
        &registry,
        &tools,
        "updateDocument",
        json!({"collection": "c", "id": "ghost", "data": {"a": 1}}),
    )
    .await;
    assert_eq!(result, json!({"error": "Document not found"}));

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "ghost"}),
    )
    .await;
    assert_eq!(fetched, json!({"error": "Document not found"}));
}

#[tokio::test]
async fn test_update_returns_refetched_document() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": {"a": 1, "b": 2}}),
    )
    .await;
    // The merge input lacks "a"; its presence proves the response came from a
    // fresh read of the stored document.
    let updated = call_tool(
        &registry,
        &tools,
        "updateDocument",
        json!({"collection": "c", "id": "d", "data": {"b": 3}}),
    )
    .await;
    assert_eq!(updated.get("a"), Some(&json!(1)));
}

#[tokio::test]
async fn test_delete_document() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": {"a": 1}}),
    )
    .await;
    let deleted = call_tool(
        &registry,
        &tools,
        "deleteDocument",
        json!({"collection": "c", "id": "d"}),
    )
    .await;
    assert_eq!(deleted, json!({"success": true}));

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d"}),
    )
    .await;
    assert_eq!(fetched, json!({"error": "Document not found"}));

    // Deleting again reports the missing document instead of succeeding.
    let deleted = call_tool(
        &registry,
        &tools,
        "deleteDocument",
        json!({"collection": "c", "id": "d"}),
    )
    .await;
    assert_eq!(deleted, json!({"error": "Document not found"}));
}

#[tokio::test]
async fn test_missing_required_argument_is_an_error() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let err = call_tool_err(&registry, &tools, "getDocument", json!({"collection": "c"})).await;
    assert!(matches!(err, ServerError::MissingArg(ref name) if name == "id"));
}

// =============================================================================
// Query Tools
// =============================================================================

#[tokio::test]
async fn test_query_filters_and_orders() {
    let registry = test_registry();
    let tools = ToolRegistry::new();
    seed_people(&registry, &tools).await;

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "people",
            "filters": [{"field": "age", "operator": ">", "value": 25}],
            "orderBy": [{"field": "name", "direction": "asc"}]
        }),
    )
    .await;
    assert_eq!(
        result,
        json!([
            {"id": "alice", "name": "alice", "age": 30},
            {"id": "carol", "name": "carol", "age": 35}
        ])
    );
}

#[tokio::test]
async fn test_query_without_matches_is_empty() {
    let registry = test_registry();
    let tools = ToolRegistry::new();
    seed_people(&registry, &tools).await;

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "people",
            "filters": [{"field": "age", "operator": ">", "value": 99}]
        }),
    )
    .await;
    assert_eq!(result, json!([]));
}

#[tokio::test]
async fn test_query_descending_with_limit() {
    let registry = test_registry();
    let tools = ToolRegistry::new();
    seed_people(&registry, &tools).await;

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "people",
            "orderBy": [{"field": "age", "direction": "desc"}],
            "limit": 2
        }),
    )
    .await;
    let names: Vec<_> = result
        .as_array()
        .expect("Expected array")
        .iter()
        .map(|doc| doc.get("name").and_then(|v| v.as_str()).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["carol", "alice"]);
}

#[tokio::test]
async fn test_query_array_membership_operators() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    for (id, tags) in [("p1", json!(["rust", "db"])), ("p2", json!(["web"]))] {
        call_tool(
            &registry,
            &tools,
            "createDocument",
            json!({"collection": "posts", "id": id, "data": {"tags": tags}}),
        )
        .await;
    }

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "posts",
            "filters": [{"field": "tags", "operator": "array-contains", "value": "rust"}]
        }),
    )
    .await;
    let ids: Vec<_> = result
        .as_array()
        .expect("Expected array")
        .iter()
        .map(|doc| doc.get("id").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(ids, vec!["p1"]);

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "posts",
            "filters": [{"field": "tags", "operator": "array-contains-any", "value": ["web", "cli"]}]
        }),
    )
    .await;
    let ids: Vec<_> = result
        .as_array()
        .expect("Expected array")
        .iter()
        .map(|doc| doc.get("id").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(ids, vec!["p2"]);
}

#[tokio::test]
async fn test_query_in_operator() {
    let registry = test_registry();
    let tools = ToolRegistry::new();
    seed_people(&registry, &tools).await;

    let result = call_tool(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "people",
            "filters": [{"field": "name", "operator": "in", "value": ["bob", "carol"]}],
            "orderBy": [{"field": "name"}]
        }),
    )
    .await;
    let names: Vec<_> = result
        .as_array()
        .expect("Expected array")
        .iter()
        .map(|doc| doc.get("name").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(names, vec!["bob", "carol"]);
}

#[tokio::test]
async fn test_query_rejects_unknown_operator() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let err = call_tool_err(
        &registry,
        &tools,
        "queryDocuments",
        json!({
            "collection": "people",
            "filters": [{"field": "age", "operator": "~", "value": 1}]
        }),
    )
    .await;
    match err {
        ServerError::InvalidArg { name, .. } => assert_eq!(name, "filters[0].operator"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_query_rejects_nonpositive_limit() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let err = call_tool_err(
        &registry,
        &tools,
        "queryDocuments",
        json!({"collection": "people", "limit": 0}),
    )
    .await;
    assert!(matches!(err, ServerError::InvalidArg { ref name, .. } if name == "limit"));
}

// =============================================================================
// Timestamp Normalization
// =============================================================================

#[tokio::test]
async fn test_wire_timestamps_become_native_on_round_trip() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({
            "collection": "events",
            "id": "e1",
            "data": {
                "created": { "seconds": 1700000000, "nanoseconds": 500000000 },
                "nested": { "stamps": [{ "seconds": 1, "nanoseconds": 0 }] }
            }
        }),
    )
    .await;

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "events", "id": "e1"}),
    )
    .await;

    // The wire shape never comes back; reads render the native timestamp.
    let created = fetched.get("created").expect("Expected created field");
    let created = created.as_str().expect("Expected timestamp string");
    assert!(created.starts_with("2023-11-14T22:13:20"));
    assert!(created.ends_with('Z'));

    let stamp = &fetched["nested"]["stamps"][0];
    assert!(stamp.is_string());
    assert!(stamp.as_str().unwrap().starts_with("1970-01-01T00:00:01"));
}

#[tokio::test]
async fn test_non_timestamp_shapes_pass_through() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let data = json!({
        "pair": { "seconds": 1, "other": 2 },
        "triple": { "seconds": 1, "nanoseconds": 2, "note": "x" }
    });
    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": data}),
    )
    .await;

    let fetched = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d"}),
    )
    .await;
    assert_eq!(fetched["pair"], json!({"seconds": 1, "other": 2}));
    assert_eq!(fetched["triple"], json!({"seconds": 1, "nanoseconds": 2, "note": "x"}));
}

// =============================================================================
// Project and Collection Tools
// =============================================================================

#[tokio::test]
async fn test_list_collections_after_writes() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    for collection in ["users", "orders"] {
        call_tool(
            &registry,
            &tools,
            "createDocument",
            json!({"collection": collection, "id": "d", "data": {"a": 1}}),
        )
        .await;
    }

    let result = call_tool(&registry, &tools, "listCollections", json!({})).await;
    assert_eq!(result, json!(["orders", "users"]));
}

#[tokio::test]
async fn test_list_projects_includes_default() {
    let registry = multi_registry();
    let tools = ToolRegistry::new();

    let result = call_tool(&registry, &tools, "listProjects", json!({})).await;
    assert_eq!(
        result,
        json!({
            "projects": ["alpha", "beta"],
            "defaultProject": "alpha",
            "config": "alpha,beta"
        })
    );
}

#[tokio::test]
async fn test_projects_are_isolated() {
    let registry = multi_registry();
    let tools = ToolRegistry::new();

    // Written to the default project (alpha).
    call_tool(
        &registry,
        &tools,
        "createDocument",
        json!({"collection": "c", "id": "d", "data": {"a": 1}}),
    )
    .await;

    let from_beta = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d", "project": "beta"}),
    )
    .await;
    assert_eq!(from_beta, json!({"error": "Document not found"}));

    let from_alpha = call_tool(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d", "project": "alpha"}),
    )
    .await;
    assert_eq!(from_alpha, json!({"id": "d", "a": 1}));
}

#[tokio::test]
async fn test_unknown_project_is_an_error() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let err = call_tool_err(
        &registry,
        &tools,
        "getDocument",
        json!({"collection": "c", "id": "d", "project": "nope"}),
    )
    .await;
    assert!(matches!(err, ServerError::ProjectNotFound(ref id) if id == "nope"));
}

// =============================================================================
// Prompt Tools
// =============================================================================

#[tokio::test]
async fn test_list_prompts_empty_collection_has_message() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let result = call_tool(&registry, &tools, "listPrompts", json!({})).await;
    assert_eq!(
        result,
        json!({
            "message": "No prompts found in collection 'prompts'",
            "prompts": []
        })
    );
}

#[tokio::test]
async fn test_list_prompts_wraps_count() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    for id in ["p1", "p2"] {
        call_tool(
            &registry,
            &tools,
            "createDocument",
            json!({"collection": "prompts", "id": id, "data": {"name": id, "text": "hi"}}),
        )
        .await;
    }

    let result = call_tool(&registry, &tools, "listPrompts", json!({})).await;
    assert_eq!(
        result.get("message"),
        Some(&json!("Found 2 prompt(s) in collection 'prompts'"))
    );
    assert_eq!(result["prompts"].as_array().map(Vec::len), Some(2));

    let limited = call_tool(&registry, &tools, "listPrompts", json!({"limit": 1})).await;
    assert_eq!(limited["prompts"].as_array().map(Vec::len), Some(1));
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_unknown_tool_is_an_error() {
    let registry = test_registry();
    let tools = ToolRegistry::new();

    let err = call_tool_err(&registry, &tools, "doesNotExist", json!({})).await;
    match err {
        ServerError::UnknownTool(name) => assert_eq!(name, "doesNotExist"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_tool_listing_covers_all_tools() {
    let tools = ToolRegistry::new();
    let names: Vec<_> = tools.tools().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "getDocument",
            "createDocument",
            "updateDocument",
            "deleteDocument",
            "queryDocuments",
            "listCollections",
            "listProjects",
            "listPrompts",
        ]
    );
    for tool in tools.tools() {
        assert!(tool.input_schema.get("properties").is_some());
    }
}
