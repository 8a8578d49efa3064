use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};
use crate::task::Marker;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub host: HostConfig,
    #[serde(default)]
    pub prefs: UserPrefs,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HostConfig {
    pub endpoint: String,
    #[serde(default)]
    pub token: String,
}

/// User preferences mirrored from the host application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserPrefs {
    #[serde(default = "default_date_format")]
    pub preferred_date_format: String,
    #[serde(default = "default_todo_marker")]
    pub preferred_todo_marker: String,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            preferred_date_format: default_date_format(),
            preferred_todo_marker: default_todo_marker(),
        }
    }
}

impl UserPrefs {
    /// The marker new tasks are created with. Validation guarantees this
    /// parses, so fall back to TODO rather than erroring at use sites.
    pub fn todo_marker(&self) -> Marker {
        Marker::from_token(&self.preferred_todo_marker).unwrap_or(Marker::Todo)
    }
}

fn default_date_format() -> String {
    "MMM do, yyyy".into()
}

fn default_todo_marker() -> String {
    "TODO".into()
}

impl AppConfig {
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::defaults()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TODO_").split("_").lowercase(false))
            .extract()
            .map_err(|e| TodoError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.endpoint.is_empty() {
            return Err(TodoError::Config("host.endpoint is required".into()));
        }
        if self.host.token.is_empty() {
            return Err(TodoError::Config(
                "host.token is required (set in config or TODO_HOST_TOKEN env var)".into(),
            ));
        }
        match Marker::from_token(&self.prefs.preferred_todo_marker) {
            Some(m) if !m.is_completed() => {}
            _ => {
                return Err(TodoError::Config(format!(
                    "prefs.preferred_todo_marker must be an incomplete marker, got {:?}",
                    self.prefs.preferred_todo_marker
                )))
            }
        }
        Ok(())
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(|xdg| PathBuf::from(xdg).join("todo-sync"))
            .or_else(|| {
                directories::BaseDirs::new()
                    .map(|dirs| dirs.home_dir().join(".config").join("todo-sync"))
            })
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = r#"[host]
endpoint = "http://127.0.0.1:12315"
token = ""  # or set TODO_HOST_TOKEN env var

[prefs]
preferred_date_format = "MMM do, yyyy"
preferred_todo_marker = "TODO"  # TODO | LATER | NOW | DOING | WAITING
"#;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn defaults() -> Self {
        Self {
            host: HostConfig {
                endpoint: String::new(),
                token: String::new(),
            },
            prefs: UserPrefs::default(),
        }
    }
}
