//! Structured query tool.
//!
//! Tool: queryDocuments

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{doc_response, get_string_arg};
use crate::error::{Result, ServerError};
use crate::query::Query;
use crate::registry::ProjectRegistry;
use crate::tools::{resolve_store, ToolDef};

/// Get the query tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        "queryDocuments",
        "Query a collection. Filters are AND-combined in listed order, then order \
         directives apply in listed order, then the limit. Returns the matching \
         documents; an empty list if none match.",
        query_schema(),
    )]
}

// The nested filter/orderBy item schemas don't fit the flat schema! macro.
fn query_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "collection": { "type": "string" },
            "filters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "operator": {
                            "type": "string",
                            "enum": [
                                "==", "!=", "<", "<=", ">", ">=",
                                "array-contains", "array-contains-any", "in", "not-in"
                            ]
                        },
                        "value": {}
                    },
                    "required": ["field", "operator", "value"]
                }
            },
            "orderBy": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "direction": { "type": "string", "enum": ["asc", "desc"], "default": "asc" }
                    },
                    "required": ["field"]
                }
            },
            "limit": { "type": "integer", "minimum": 1 },
            "project": { "type": "string" }
        },
        "required": ["collection"]
    })
}

/// Dispatch a query tool call.
pub async fn dispatch(
    projects: &ProjectRegistry,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "queryDocuments" => {
            let collection = get_string_arg(&args, "collection")?;
            let query = Query::from_args(&args)?;
            let store = resolve_store(projects, &args)?;

            let matches = store.query(&collection, &query).await?;
            Ok(JsonValue::Array(
                matches
                    .into_iter()
                    .map(|(id, doc)| doc_response(&id, doc))
                    .collect(),
            ))
        }
        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}
