//! Server configuration.
//!
//! Projects come from `DOCSTORE_PROJECTS` (a comma-separated id list);
//! credentials are one JSON file per project in a `creds/` directory next to
//! the executable, with `DOCSTORE_CREDENTIALS` overriding the file path
//! outright for whichever project is being initialized.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable listing project ids.
pub const PROJECTS_ENV: &str = "DOCSTORE_PROJECTS";
/// Environment variable overriding the credentials file path.
pub const CREDENTIALS_ENV: &str = "DOCSTORE_CREDENTIALS";
/// Project id assumed when no configuration is present.
pub const DEFAULT_PROJECT: &str = "demo-project";

/// Resolved startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Project ids, in configuration order.
    pub projects: Vec<String>,
    /// The raw configuration string the ids were parsed from.
    pub raw_projects: String,
    /// Single-file credentials override.
    pub credentials_override: Option<PathBuf>,
    /// Directory holding per-project credential files.
    pub credentials_dir: PathBuf,
}

impl Settings {
    /// Build settings from the raw projects string and optional overrides.
    pub fn new(
        raw_projects: Option<String>,
        credentials_override: Option<PathBuf>,
        credentials_dir: Option<PathBuf>,
    ) -> Self {
        let raw = raw_projects.unwrap_or_else(|| DEFAULT_PROJECT.to_string());
        let mut projects = parse_projects(&raw);
        if projects.is_empty() {
            projects.push(DEFAULT_PROJECT.to_string());
        }
        Self {
            projects,
            raw_projects: raw,
            credentials_override,
            credentials_dir: credentials_dir.unwrap_or_else(default_credentials_dir),
        }
    }

    /// Credentials file path for one project.
    pub fn credential_path(&self, project: &str) -> PathBuf {
        match &self.credentials_override {
            Some(path) => path.clone(),
            None => self.credentials_dir.join(format!("{project}.json")),
        }
    }
}

/// Split a comma-separated project list, dropping empty segments.
fn parse_projects(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `creds/` next to the executable, falling back to the working directory.
fn default_credentials_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("creds")
}

/// Per-project credentials file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCredentials {
    /// Connection string for the project's database cluster.
    pub uri: String,
    /// Database name; defaults to the project id.
    #[serde(default)]
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_are_trimmed_and_filtered() {
        let settings = Settings::new(Some(" a, b ,,c".to_string()), None, None);
        assert_eq!(settings.projects, vec!["a", "b", "c"]);
        assert_eq!(settings.raw_projects, " a, b ,,c");
    }

    #[test]
    fn test_absent_configuration_uses_placeholder() {
        let settings = Settings::new(None, None, None);
        assert_eq!(settings.projects, vec![DEFAULT_PROJECT]);
        let settings = Settings::new(Some(",,".to_string()), None, None);
        assert_eq!(settings.projects, vec![DEFAULT_PROJECT]);
    }

    #[test]
    fn test_credentials_override_wins() {
        let settings = Settings::new(
            Some("a".to_string()),
            Some(PathBuf::from("/tmp/creds.json")),
            Some(PathBuf::from("/srv/creds")),
        );
        assert_eq!(settings.credential_path("a"), PathBuf::from("/tmp/creds.json"));

        let settings = Settings::new(Some("a".to_string()), None, Some(PathBuf::from("/srv/creds")));
        assert_eq!(settings.credential_path("a"), PathBuf::from("/srv/creds/a.json"));
    }
}
