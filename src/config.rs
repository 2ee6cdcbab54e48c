//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/iacreate/iacreate.toml`
//! 3. Local config: `./iacreate.toml` or the file passed with `--config`
//! 4. Environment variables: `IACREATE_*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{ContentRef, PropertyKind};

/// Name of the local config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "iacreate.toml";

/// Content type definition: property kinds and the properties validation requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentTypeConfig {
    pub properties: BTreeMap<String, PropertyKind>,
    pub required: Vec<String>,
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub app_data_dir: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
    pub parent_id: Option<u64>,
    pub types: Option<BTreeMap<String, ContentTypeConfig>>,
}

/// Unified configuration for iacreate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory relative paths resolve against (default: App_Data)
    pub app_data_dir: PathBuf,
    /// Spreadsheet to import (default: Content.xlsx)
    pub source_file: PathBuf,
    /// Where the content tree is stored (default: content.toml)
    pub store_file: PathBuf,
    /// Node the import hangs level-0 rows under (default: the start node)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    /// Content types by name
    pub types: BTreeMap<String, ContentTypeConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_data_dir: PathBuf::from("App_Data"),
            source_file: PathBuf::from("Content.xlsx"),
            store_file: PathBuf::from("content.toml"),
            parent_id: None,
            types: default_types(),
        }
    }
}

fn default_types() -> BTreeMap<String, ContentTypeConfig> {
    let page = ContentTypeConfig {
        properties: BTreeMap::from([
            ("title".to_string(), PropertyKind::String),
            ("body".to_string(), PropertyKind::Xhtml),
            ("show_in_menu".to_string(), PropertyKind::Bool),
        ]),
        required: vec!["title".to_string()],
    };
    let article = ContentTypeConfig {
        properties: BTreeMap::from([
            ("title".to_string(), PropertyKind::String),
            ("teaser".to_string(), PropertyKind::String),
            ("body".to_string(), PropertyKind::Xhtml),
            ("priority".to_string(), PropertyKind::Number),
        ]),
        required: vec!["title".to_string()],
    };
    BTreeMap::from([("Page".to_string(), page), ("Article".to_string(), article)])
}

/// Get the XDG config directory for iacreate.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "iacreate").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("iacreate.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path, leaving it unchanged on failure.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Spreadsheet path; relative paths resolve against `app_data_dir`.
    pub fn source_path(&self) -> PathBuf {
        self.app_data_dir.join(&self.source_file)
    }

    /// Store file path; relative paths resolve against `app_data_dir`.
    pub fn store_path(&self) -> PathBuf {
        self.app_data_dir.join(&self.store_file)
    }

    /// Node level-0 rows are created under.
    pub fn parent_ref(&self) -> ContentRef {
        self.parent_id.map(ContentRef).unwrap_or(ContentRef::START)
    }

    fn expand_paths(&mut self) {
        self.app_data_dir = expand_path(&self.app_data_dir);
        self.source_file = expand_path(&self.source_file);
        self.store_file = expand_path(&self.store_file);
    }

    /// Overlay specified values. Type tables merge by name, the overlay's definition wins.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut types = self.types.clone();
        if let Some(overlay_types) = &overlay.types {
            for (name, cfg) in overlay_types {
                types.insert(name.clone(), cfg.clone());
            }
        }
        Self {
            app_data_dir: overlay
                .app_data_dir
                .clone()
                .unwrap_or_else(|| self.app_data_dir.clone()),
            source_file: overlay
                .source_file
                .clone()
                .unwrap_or_else(|| self.source_file.clone()),
            store_file: overlay
                .store_file
                .clone()
                .unwrap_or_else(|| self.store_file.clone()),
            parent_id: overlay.parent_id.or(self.parent_id),
            types,
        }
    }

    /// Apply global config onto defaults. A `types` table REPLACES the default types.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut merged = self.merge_with(&RawSettings {
            types: None,
            ..global.clone()
        });
        if let Some(types) = &global.types {
            merged.types = types.clone();
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Explicit local config; must exist. Without it `./iacreate.toml` is
    ///   used when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                let local = Path::new(LOCAL_CONFIG_FILE);
                if local.exists() {
                    current = current.merge_with(&load_raw_settings(local)?);
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply IACREATE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing: IACREATE_APP_DATA_DIR -> app_data_dir
        let builder = Config::builder().add_source(
            Environment::with_prefix("IACREATE")
                .prefix_separator("_")
                .separator("__"),
        );
        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("app_data_dir") {
            settings.app_data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("source_file") {
            settings.source_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("store_file") {
            settings.store_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("parent_id") {
            let id = val.trim().parse::<u64>().map_err(|e| ApplicationError::Config {
                message: format!("IACREATE_PARENT_ID={val}: {e}"),
            })?;
            settings.parent_id = Some(id);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# iacreate configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/iacreate/iacreate.toml
#   Local:  ./iacreate.toml (or --config <file>)
#   Env:    IACREATE_* environment variables (APP_DATA_DIR, SOURCE_FILE, STORE_FILE, PARENT_ID)
#
# A [types] section in the global config replaces the built-in types;
# local type tables are added to (or replace by name) the global ones.

# Directory relative paths below resolve against
# app_data_dir = "App_Data"

# Spreadsheet to import: first worksheet, columns type | name | level | name:value ...
# source_file = "Content.xlsx"

# Content tree storage
# store_file = "content.toml"

# Node to create level-0 rows under (default: the start node, id 1)
# parent_id = 1

# Content types. Property kinds: string, xhtml, number, bool
[types.Page]
properties = { title = "string", body = "xhtml", show_in_menu = "bool" }
required = ["title"]

[types.Article]
properties = { title = "string", teaser = "string", body = "xhtml", priority = "number" }
required = ["title"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
