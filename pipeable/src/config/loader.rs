//! Loads the settings tiers from disk.

use super::SettingsNode;
use crate::errors::ConfigError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads one settings tier. The document root must be a JSON object.
pub fn read_tier(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn read_optional_tier(path: Option<&Path>) -> Result<Map<String, Value>, ConfigError> {
    match path {
        None => Ok(Map::new()),
        Some(path) if !path.exists() => {
            debug!(path = %path.display(), "Settings tier not found, using empty tier");
            Ok(Map::new())
        }
        Some(path) => read_tier(path),
    }
}

/// Builder locating the site, project and user settings files.
///
/// The site file defines the schema and must exist. Project and user files
/// are optional; a missing file counts as an empty tier.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    site: PathBuf,
    project: Option<PathBuf>,
    user: Option<PathBuf>,
}

impl SettingsLoader {
    /// Creates a loader for the given site file.
    #[must_use]
    pub fn new(site: impl Into<PathBuf>) -> Self {
        Self {
            site: site.into(),
            project: None,
            user: None,
        }
    }

    /// Sets the project tier file.
    #[must_use]
    pub fn with_project(mut self, path: impl Into<PathBuf>) -> Self {
        self.project = Some(path.into());
        self
    }

    /// Sets the user tier file.
    #[must_use]
    pub fn with_user(mut self, path: impl Into<PathBuf>) -> Self {
        self.user = Some(path.into());
        self
    }

    /// Reads all tiers and resolves them.
    pub fn load(&self) -> Result<SettingsNode, ConfigError> {
        let site = read_tier(&self.site)?;
        let project = read_optional_tier(self.project.as_deref())?;
        let user = read_optional_tier(self.user.as_deref())?;

        let settings = SettingsNode::resolve(&site, &project, &user)?;
        info!(
            site = %self.site.display(),
            keys = settings.len(),
            project_overrides = project.keys().filter(|k| site.contains_key(*k)).count(),
            user_overrides = user.keys().filter(|k| site.contains_key(*k)).count(),
            "Settings loaded"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_three_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site.json");
        let project = dir.path().join("project.json");
        let user = dir.path().join("user.json");
        fs::write(&site, r#"{"root": "/site", "cache": "{root}/cache", "level": "info"}"#).unwrap();
        fs::write(&project, r#"{"root": "/project", "level": "warn"}"#).unwrap();
        fs::write(&user, r#"{"level": "debug", "extra": 1}"#).unwrap();

        let settings = SettingsLoader::new(&site)
            .with_project(&project)
            .with_user(&user)
            .load()
            .unwrap();

        assert_eq!(settings.get_str("cache"), Some("/project/cache"));
        assert_eq!(settings.get_str("level"), Some("debug"));
        assert!(settings.get("extra").is_none());
    }

    #[test]
    fn test_missing_optional_tiers_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site.json");
        fs::write(&site, r#"{"a": "x"}"#).unwrap();

        let settings = SettingsLoader::new(&site)
            .with_project(dir.path().join("nope.json"))
            .load()
            .unwrap();
        assert_eq!(settings.get_str("a"), Some("x"));
    }

    #[test]
    fn test_missing_site_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SettingsLoader::new(dir.path().join("site.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_documents() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        let list = dir.path().join("list.json");
        fs::write(&broken, "{not json").unwrap();
        fs::write(&list, "[1, 2]").unwrap();

        assert!(matches!(read_tier(&broken), Err(ConfigError::Parse { .. })));
        assert!(matches!(read_tier(&list), Err(ConfigError::NotAMapping { .. })));
    }
}
