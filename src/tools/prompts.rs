//! Prompt collection tools and the prompts/list reshaping.
//!
//! Tool: listPrompts

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{doc_response, get_optional_string};
use crate::error::{Result, ServerError};
use crate::query::{parse_limit, Query};
use crate::registry::ProjectRegistry;
use crate::schema;
use crate::store::DocumentStore;
use crate::tools::{resolve_store, ToolDef};

/// Collection consulted when a call doesn't name one.
pub const DEFAULT_COLLECTION: &str = "prompts";

/// Get all prompt tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        "listPrompts",
        "List documents from a prompt collection (default \"prompts\"), up to an optional \
         limit, wrapped in a count message.",
        schema!(object {
            optional: { "collection": string, "limit": integer, "project": string }
        }),
    )]
}

/// Dispatch a prompt tool call.
pub async fn dispatch(
    projects: &ProjectRegistry,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "listPrompts" => {
            let collection = get_optional_string(&args, "collection")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
            let limit = parse_limit(&args)?;
            let store = resolve_store(projects, &args)?;

            let docs = store.query(&collection, &Query::with_limit(limit)).await?;
            if docs.is_empty() {
                return Ok(json!({
                    "message": format!("No prompts found in collection '{collection}'"),
                    "prompts": [],
                }));
            }
            let prompts: Vec<JsonValue> = docs
                .into_iter()
                .map(|(id, doc)| doc_response(&id, doc))
                .collect();
            Ok(json!({
                "message": format!("Found {} prompt(s) in collection '{collection}'", prompts.len()),
                "prompts": prompts,
            }))
        }
        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}

/// Records for the MCP `prompts/list` operation: documents from the default
/// project's prompt collection reshaped to `{id, name, description, text,
/// metadata}`. Never fails outward; internal errors degrade to an empty list.
pub async fn prompt_records(store: &dyn DocumentStore) -> Vec<JsonValue> {
    let docs = match store.query(DEFAULT_COLLECTION, &Query::default()).await {
        Ok(docs) => docs,
        Err(err) => {
            tracing::debug!(error = %err, "prompt listing failed; returning no prompts");
            return Vec::new();
        }
    };
    docs.into_iter().map(|(id, doc)| reshape(&id, doc)).collect()
}

fn reshape(id: &str, doc: mongodb::bson::Document) -> JsonValue {
    let mut fields = match doc_response(id, doc) {
        JsonValue::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.remove("id");
    let name = fields
        .remove("name")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| id.to_string());
    let description = fields
        .remove("description")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let text = fields
        .remove("text")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    json!({
        "id": id,
        "name": name,
        "description": description,
        "text": text,
        "metadata": fields,
    })
}
