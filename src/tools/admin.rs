//! Project and collection administration tools.
//!
//! Tools: listCollections, listProjects

use serde_json::{json, Map, Value as JsonValue};

use crate::error::{Result, ServerError};
use crate::registry::ProjectRegistry;
use crate::schema;
use crate::tools::{resolve_store, ToolDef};

/// Get all administration tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "listCollections",
            "List the collection names visible at the project's database root.",
            schema!(object {
                optional: { "project": string }
            }),
        ),
        ToolDef::new(
            "listProjects",
            "List the registered project ids, the default project, and the raw project \
             configuration string.",
            schema!(object {}),
        ),
    ]
}

/// Dispatch an administration tool call.
pub async fn dispatch(
    projects: &ProjectRegistry,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "listCollections" => {
            let store = resolve_store(projects, &args)?;
            let names = store.list_collections().await?;
            Ok(json!(names))
        }

        "listProjects" => Ok(json!({
            "projects": projects.project_ids(),
            "defaultProject": projects.default_project(),
            "config": projects.raw_config(),
        })),

        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}
