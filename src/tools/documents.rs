//! Document CRUD tools.
//!
//! Tools: getDocument, createDocument, updateDocument, deleteDocument

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{
    doc_response, get_object_arg, get_optional_bool, get_optional_string, get_string_arg,
    normalize_doc,
};
use crate::error::{Result, ServerError};
use crate::registry::ProjectRegistry;
use crate::schema;
use crate::tools::{resolve_store, ToolDef};

/// Payload returned when a document id does not exist.
fn not_found() -> JsonValue {
    json!({ "error": "Document not found" })
}

/// Get all document tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "getDocument",
            "Fetch a single document by id from a collection. Returns the document fields \
             with the id merged in, or an error payload if the id does not exist.",
            schema!(object {
                required: { "collection": string, "id": string },
                optional: { "project": string }
            }),
        ),
        ToolDef::new(
            "createDocument",
            "Create a document in a collection. With an explicit id the document is written \
             at that id, silently overwriting any existing document; otherwise an id is \
             generated and returned.",
            schema!(object {
                required: { "collection": string, "data": object },
                optional: { "id": string, "project": string }
            }),
        ),
        ToolDef::new(
            "updateDocument",
            "Update an existing document. merge=true (the default) shallow-merges the given \
             fields into the document; merge=false replaces it wholesale. Returns the \
             post-update document.",
            schema!(object {
                required: { "collection": string, "id": string, "data": object },
                optional: { "merge": boolean, "project": string }
            }),
        ),
        ToolDef::new(
            "deleteDocument",
            "Delete a document by id after verifying it exists.",
            schema!(object {
                required: { "collection": string, "id": string },
                optional: { "project": string }
            }),
        ),
    ]
}

/// Dispatch a document tool call.
pub async fn dispatch(
    projects: &ProjectRegistry,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "getDocument" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let store = resolve_store(projects, &args)?;

            match store.get(&collection, &id).await? {
                Some(doc) => Ok(doc_response(&id, doc)),
                None => Ok(not_found()),
            }
        }

        "createDocument" => {
            let collection = get_string_arg(&args, "collection")?;
            let data = normalize_doc(get_object_arg(&args, "data")?);
            let explicit_id = get_optional_string(&args, "id");
            let store = resolve_store(projects, &args)?;

            match explicit_id {
                Some(id) => {
                    store.set(&collection, &id, data.clone(), false).await?;
                    Ok(doc_response(&id, data))
                }
                None => {
                    let id = store.insert(&collection, data.clone()).await?;
                    Ok(doc_response(&id, data))
                }
            }
        }

        "updateDocument" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let data = normalize_doc(get_object_arg(&args, "data")?);
            let merge = get_optional_bool(&args, "merge").unwrap_or(true);
            let store = resolve_store(projects, &args)?;

            if store.get(&collection, &id).await?.is_none() {
                return Ok(not_found());
            }
            store.set(&collection, &id, data, merge).await?;

            // The response is built from a fresh read, not the merge input.
            match store.get(&collection, &id).await? {
                Some(doc) => Ok(doc_response(&id, doc)),
                None => Ok(not_found()),
            }
        }

        "deleteDocument" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let store = resolve_store(projects, &args)?;

            if store.get(&collection, &id).await?.is_none() {
                return Ok(not_found());
            }
            store.delete(&collection, &id).await?;
            Ok(json!({ "success": true }))
        }

        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}
