//! Multi-project connection registry.
//!
//! Built once at startup and shared immutably with the dispatcher; tools
//! resolve a project per call and never mutate the registry.

use std::path::Path;
use std::sync::Arc;

use crate::config::{ProjectCredentials, Settings};
use crate::error::{Result, ServerError};
use crate::store::memory::MemoryStore;
use crate::store::mongo::MongoStore;
use crate::store::DocumentStore;

/// Immutable registry of project id -> document store handle.
///
/// The first registered project is the default used when a tool call omits
/// `project`.
pub struct ProjectRegistry {
    projects: Vec<(String, Arc<dyn DocumentStore>)>,
    raw_config: String,
}

impl std::fmt::Debug for ProjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field(
                "projects",
                &self.projects.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ProjectRegistry {
    /// Initialize one store per project with a readable, parseable credentials
    /// file. Projects with missing or broken credentials are skipped with a
    /// warning; an empty result is an error and the caller exits.
    pub async fn initialize(settings: &Settings) -> Result<Self> {
        let mut projects: Vec<(String, Arc<dyn DocumentStore>)> = Vec::new();

        for id in &settings.projects {
            let path = settings.credential_path(id);
            if !path.exists() {
                tracing::warn!(
                    project = %id,
                    path = %path.display(),
                    "credentials file not found; skipping project"
                );
                continue;
            }
            let creds = match read_credentials(&path) {
                Ok(creds) => creds,
                Err(reason) => {
                    tracing::warn!(
                        project = %id,
                        path = %path.display(),
                        %reason,
                        "unusable credentials file; skipping project"
                    );
                    continue;
                }
            };
            let database = creds.database.as_deref().unwrap_or(id);
            match MongoStore::connect(&creds.uri, database).await {
                Ok(store) => {
                    tracing::info!(
                        project = %id,
                        database = %database,
                        backend = store.backend_name(),
                        "project registered"
                    );
                    projects.push((id.clone(), Arc::new(store)));
                }
                Err(err) => {
                    tracing::warn!(
                        project = %id,
                        error = %err,
                        "failed to build database client; skipping project"
                    );
                }
            }
        }

        if projects.is_empty() {
            return Err(ServerError::Config(
                "no projects could be initialized".to_string(),
            ));
        }
        Ok(Self {
            projects,
            raw_config: settings.raw_projects.clone(),
        })
    }

    /// Registry of in-memory stores, one per id (`--memory` mode and tests).
    pub fn in_memory<I, S>(ids: I, raw_config: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let projects = ids
            .into_iter()
            .map(|id| {
                (
                    id.into(),
                    Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>,
                )
            })
            .collect();
        Self {
            projects,
            raw_config: raw_config.to_string(),
        }
    }

    /// Resolve a project id to its store; `None` resolves to the default
    /// (first registered) project.
    pub fn resolve(&self, id: Option<&str>) -> Result<&Arc<dyn DocumentStore>> {
        match id {
            None => self
                .projects
                .first()
                .map(|(_, store)| store)
                .ok_or_else(|| ServerError::Internal("empty project registry".to_string())),
            Some(id) => self
                .projects
                .iter()
                .find(|(project, _)| project.as_str() == id)
                .map(|(_, store)| store)
                .ok_or_else(|| ServerError::ProjectNotFound(id.to_string())),
        }
    }

    /// The default project id.
    pub fn default_project(&self) -> &str {
        self.projects
            .first()
            .map(|(id, _)| id.as_str())
            .unwrap_or("")
    }

    /// All registered project ids, in registration order.
    pub fn project_ids(&self) -> Vec<&str> {
        self.projects.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// The raw configuration string the registry was built from.
    pub fn raw_config(&self) -> &str {
        &self.raw_config
    }
}

fn read_credentials(path: &Path) -> std::result::Result<ProjectCredentials, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| e.to_string())
}
