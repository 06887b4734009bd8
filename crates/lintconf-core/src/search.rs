//! Configuration file discovery and loading
//!
//! [`FsConfigSearch`] looks for a project's conventional configuration files
//! in a directory and, depending on the [`SearchStrategy`], its ancestors:
//!
//! 1. `package.json` (only when it has a top-level key named after the module)
//! 2. `.{name}rc` (YAML, which also accepts JSON)
//! 3. `.{name}rc.json` / `.{name}rc.jsonc` (JSON with comments and trailing commas)
//! 4. `.{name}rc.yaml` / `.{name}rc.yml`
//! 5. `.{name}rc.toml`
//! 6. `.config/{name}rc`, `.config/{name}rc.json`, `.config/{name}rc.yaml`, `.config/{name}rc.yml`
//! 7. `{name}.config.json`, `{name}.config.yaml`, `{name}.config.toml`
//!
//! Empty files are skipped while searching.

use crate::config::RawConfigResult;
use crate::error::LintConfigError;
use crate::result::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default module name used to derive configuration file names
pub const DEFAULT_MODULE_NAME: &str = "lintconf";

/// Environment variable that marks a test environment
pub const ENV_VAR: &str = "LINTCONF_ENV";

/// How far upward a search may walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Only look in the start directory
    None,
    /// Walk up until a directory containing `package.json` (inclusive)
    Project,
    /// Walk up until the stop directory (inclusive) or the filesystem root
    #[default]
    Global,
}

/// Options for the filesystem search collaborator
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Base name the configuration files are derived from
    pub module_name: String,
    /// Directory at which upward traversal halts
    pub stop_dir: Option<PathBuf>,
    /// Traversal strategy
    pub strategy: SearchStrategy,
}

impl SearchOptions {
    /// Options for `module_name`, with the stop directory detected from the environment
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            stop_dir: detect_stop_dir(),
            strategy: SearchStrategy::default(),
        }
    }

    pub fn with_stop_dir(mut self, stop_dir: Option<PathBuf>) -> Self {
        self.stop_dir = stop_dir;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// File names checked in each directory, in priority order
    pub fn search_places(&self) -> Vec<String> {
        let name = &self.module_name;
        vec![
            "package.json".to_string(),
            format!(".{name}rc"),
            format!(".{name}rc.json"),
            format!(".{name}rc.jsonc"),
            format!(".{name}rc.yaml"),
            format!(".{name}rc.yml"),
            format!(".{name}rc.toml"),
            format!(".config/{name}rc"),
            format!(".config/{name}rc.json"),
            format!(".config/{name}rc.yaml"),
            format!(".config/{name}rc.yml"),
            format!("{name}.config.json"),
            format!("{name}.config.yaml"),
            format!("{name}.config.toml"),
        ]
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_NAME)
    }
}

/// Stop directory for the current environment.
///
/// Test environments (`LINTCONF_ENV=test`) stop at the process working
/// directory so searches stay inside the sandbox; otherwise the search is
/// unbounded.
pub fn detect_stop_dir() -> Option<PathBuf> {
    match std::env::var(ENV_VAR) {
        Ok(env) if env == "test" => std::env::current_dir().ok(),
        _ => None,
    }
}

/// Search collaborator used by the resolver
#[async_trait]
pub trait ConfigSearch: Send + Sync {
    /// Search for a configuration starting at `start`
    ///
    /// Returns `None` when nothing is found within the search bounds.
    async fn search(&self, start: &Path) -> Result<Option<RawConfigResult>>;

    /// Load a specific configuration file, without walking any directories
    ///
    /// Fails when the file is missing, empty or malformed.
    async fn load(&self, path: &Path) -> Result<RawConfigResult>;
}

/// Filesystem-backed configuration search
#[derive(Debug, Clone, Default)]
pub struct FsConfigSearch {
    options: SearchOptions,
}

impl FsConfigSearch {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    async fn is_file(path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Whether the walk must not go above `dir`
    async fn stops_at(&self, dir: &Path) -> bool {
        match self.options.strategy {
            SearchStrategy::None => true,
            SearchStrategy::Project => Self::is_file(&dir.join("package.json")).await,
            SearchStrategy::Global => self.options.stop_dir.as_deref() == Some(dir),
        }
    }

    async fn read_place(&self, path: &Path) -> Result<Option<RawConfigResult>> {
        if !Self::is_file(path).await {
            return Ok(None);
        }
        trace!("Checking {}", path.display());
        let config = read_config_file(path, &self.options.module_name).await?;
        Ok(config.map(|config| RawConfigResult::new(config, path)))
    }
}

#[async_trait]
impl ConfigSearch for FsConfigSearch {
    async fn search(&self, start: &Path) -> Result<Option<RawConfigResult>> {
        let mut current = if Self::is_file(start).await {
            start.parent().unwrap_or(start).to_path_buf()
        } else {
            start.to_path_buf()
        };
        let places = self.options.search_places();

        loop {
            for place in &places {
                if let Some(found) = self.read_place(&current.join(place)).await? {
                    debug!("Found config: {}", found.filepath.display());
                    return Ok(Some(found));
                }
            }

            if self.stops_at(&current).await {
                break;
            }

            // Move up to parent directory
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        debug!("No config found searching from {}", start.display());
        Ok(None)
    }

    async fn load(&self, path: &Path) -> Result<RawConfigResult> {
        let config = read_config_file(path, &self.options.module_name)
            .await?
            .ok_or_else(|| {
                let is_package = path.file_name().is_some_and(|name| name == "package.json");
                if is_package {
                    LintConfigError::parse_error(
                        path,
                        format!("no \"{}\" key found", self.options.module_name),
                    )
                } else {
                    LintConfigError::parse_error(path, "configuration file is empty")
                }
            })?;

        debug!("Loaded config from: {}", path.display());
        Ok(RawConfigResult::new(config, path))
    }
}

/// Read and parse a configuration file.
///
/// Returns `None` for empty files and for `package.json` files without a
/// `module_name` key.
pub(crate) async fn read_config_file(path: &Path, module_name: &str) -> Result<Option<Value>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LintConfigError::io_error(path, e))?;
    parse_config(path, &content, module_name)
}

/// Parse configuration file contents, picking the format from the file name
pub(crate) fn parse_config(path: &Path, content: &str, module_name: &str) -> Result<Option<Value>> {
    if content.trim().is_empty() {
        return Ok(None);
    }

    if path.file_name().is_some_and(|name| name == "package.json") {
        let mut package: Value =
            serde_json::from_str(content).map_err(|e| LintConfigError::parse_error(path, e))?;
        return Ok(package
            .as_object_mut()
            .and_then(|package| package.remove(module_name)));
    }

    let ext = path.extension().and_then(|e| e.to_str());
    let value: Value = match ext {
        Some("json") | Some("jsonc") => {
            json5::from_str(content).map_err(|e| LintConfigError::parse_error(path, e))?
        }
        Some("yaml") | Some("yml") | None => {
            serde_yaml::from_str(content).map_err(|e| LintConfigError::parse_error(path, e))?
        }
        Some("toml") => toml::from_str(content).map_err(|e| LintConfigError::parse_error(path, e))?,
        Some(other) => {
            return Err(LintConfigError::parse_error(
                path,
                format!("unsupported configuration file extension '.{other}'"),
            ));
        }
    };

    // A YAML file holding only comments parses to null
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(value))
}
