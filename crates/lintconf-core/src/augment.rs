//! Configuration augmentation
//!
//! Augmentation turns a raw configuration into the effective one for a file:
//!
//! - `extends` entries (relative or absolute paths) are loaded, augmented in
//!   turn, and merged underneath the extending configuration
//! - relative `plugins` and `processors` entries and `ignoreFiles` globs are
//!   made absolute against the directory of the configuration that declared
//!   them
//! - `overrides` entries whose `files` globs match the linted file are merged
//!   on top, and the `overrides` key is dropped from the result
//!
//! Merge rules: `rules` merge per rule (later wins); `plugins`, `processors`
//! and `ignoreFiles` are concatenated without duplicates; `overrides` are
//! concatenated; every other key is replaced by the later value.

use crate::config::{
    OVERRIDES_KEY, RawConfigResult, ResolvedConfig, ResolverOptions, is_truthy, normalize_path,
};
use crate::error::LintConfigError;
use crate::result::Result;
use crate::search::{DEFAULT_MODULE_NAME, read_config_file};
use async_trait::async_trait;
use futures::future::BoxFuture;
use glob::{MatchOptions, Pattern};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const EXTENDS_KEY: &str = "extends";
const PLUGINS_KEY: &str = "plugins";
const PROCESSORS_KEY: &str = "processors";
const IGNORE_FILES_KEY: &str = "ignoreFiles";
const FILES_KEY: &str = "files";

/// Keys whose values are concatenated (without duplicates) when merging
const LIST_KEYS: &[&str] = &[PLUGINS_KEY, PROCESSORS_KEY, IGNORE_FILES_KEY];

/// Augmentation collaborator used by the resolver
///
/// Implementations must be pure with respect to `raw` and `file_path`: the
/// resolver caches their output for explicit configurations without
/// `overrides`.
#[async_trait]
pub trait Augment: Send + Sync {
    /// Produce the effective configuration for `file_path` from `raw`
    async fn augment(
        &self,
        options: &ResolverOptions,
        file_path: Option<&Path>,
        raw: RawConfigResult,
    ) -> Result<ResolvedConfig>;
}

/// Default augmentation: resolves `extends`, `plugins` and `overrides`
#[derive(Debug, Clone)]
pub struct StandardAugmenter {
    module_name: String,
}

impl StandardAugmenter {
    pub fn new() -> Self {
        Self::with_module_name(DEFAULT_MODULE_NAME)
    }

    /// Module name used to pick the configuration key out of an extended `package.json`
    pub fn with_module_name(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Load an extended configuration file
    async fn load_extended(&self, name: &str, path: &Path) -> Result<Map<String, Value>> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(LintConfigError::config_error(format!(
                "Could not find \"{name}\" (resolved to {})",
                path.display()
            )));
        }
        let config = read_config_file(path, &self.module_name)
            .await?
            .ok_or_else(|| {
                LintConfigError::config_error(format!(
                    "Extended configuration \"{name}\" is empty"
                ))
            })?;
        expect_object(config, path)
    }

    /// Resolve `extends` of `config`, which lives in `config_dir`
    ///
    /// `chain` holds the files currently being extended, to catch cycles.
    fn resolve_extends<'a>(
        &'a self,
        mut config: Map<String, Value>,
        config_dir: PathBuf,
        chain: &'a mut Vec<PathBuf>,
    ) -> BoxFuture<'a, Result<Map<String, Value>>> {
        Box::pin(async move {
            let Some(extends) = config.remove(EXTENDS_KEY) else {
                return Ok(config);
            };

            let mut merged = Map::new();
            for name in string_list(extends, EXTENDS_KEY)? {
                let path = extends_path(&name, &config_dir)?;
                if chain.contains(&path) {
                    let cycle = chain
                        .iter()
                        .chain(std::iter::once(&path))
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    return Err(LintConfigError::config_error(format!(
                        "Circular \"extends\" detected: {cycle}"
                    )));
                }

                trace!("Extending {} from {}", path.display(), config_dir.display());
                let mut extended = self.load_extended(&name, &path).await?;
                let extended_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                anchor_relative_entries(&mut extended, &extended_dir);
                anchor_override_patterns(&mut extended, &extended_dir);

                chain.push(path);
                let extended = self.resolve_extends(extended, extended_dir, chain).await;
                chain.pop();

                merged = merge_configs(merged, extended?);
            }

            Ok(merge_configs(merged, config))
        })
    }

    /// Merge the `overrides` entries matching `file_path` into `config`
    async fn apply_overrides(
        &self,
        mut config: Map<String, Value>,
        config_dir: &Path,
        file_path: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Map<String, Value>> {
        let overrides = config.remove(OVERRIDES_KEY);
        if !is_truthy(overrides.as_ref()) {
            return Ok(config);
        }
        let Some(Value::Array(entries)) = overrides else {
            return Err(LintConfigError::config_error(
                "The \"overrides\" property must be an array",
            ));
        };

        for entry in entries {
            let Value::Object(mut entry) = entry else {
                return Err(LintConfigError::config_error(
                    "Each \"overrides\" entry must be an object",
                ));
            };
            let files = entry.remove(FILES_KEY).ok_or_else(|| {
                LintConfigError::config_error(
                    "Each \"overrides\" entry must have a \"files\" property",
                )
            })?;
            let patterns = string_list(files, FILES_KEY)?;

            if !matches_any(&patterns, config_dir, file_path)? {
                continue;
            }

            debug!(
                "Applying override {:?} to {}",
                patterns,
                file_path.display()
            );
            anchor_relative_entries(&mut entry, config_dir);
            let entry = self
                .resolve_extends(entry, config_dir.to_path_buf(), chain)
                .await?;
            config = merge_configs(config, entry);
        }

        config.remove(OVERRIDES_KEY);
        Ok(config)
    }
}

impl Default for StandardAugmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Augment for StandardAugmenter {
    async fn augment(
        &self,
        options: &ResolverOptions,
        file_path: Option<&Path>,
        raw: RawConfigResult,
    ) -> Result<ResolvedConfig> {
        let config_dir = normalize_path(raw.config_dir());
        let mut chain = vec![normalize_path(&raw.filepath)];

        let mut config = expect_object(raw.config, &raw.filepath)?;
        anchor_relative_entries(&mut config, &config_dir);
        let mut config = self
            .resolve_extends(config, config_dir.clone(), &mut chain)
            .await?;

        match file_path {
            Some(file_path) => {
                let file_path = options.absolutize(file_path);
                config = self
                    .apply_overrides(config, &config_dir, &file_path, &mut chain)
                    .await?;
            }
            None => {
                config.remove(OVERRIDES_KEY);
            }
        }

        Ok(ResolvedConfig::new(Value::Object(config), raw.filepath))
    }
}

fn expect_object(config: Value, path: &Path) -> Result<Map<String, Value>> {
    match config {
        Value::Object(map) => Ok(map),
        other => Err(LintConfigError::config_error(format!(
            "Configuration from {} must be an object, found {}",
            path.display(),
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Accept a single string or an array of strings
fn string_list(value: Value, key: &str) -> Result<Vec<String>> {
    let invalid = || {
        LintConfigError::config_error(format!(
            "The \"{key}\" property must be a string or an array of strings"
        ))
    };
    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

/// Resolve an `extends` entry to a file path
fn extends_path(name: &str, config_dir: &Path) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else if name.starts_with("./") || name.starts_with("../") {
        Ok(normalize_path(&config_dir.join(path)))
    } else {
        Err(LintConfigError::config_error(format!(
            "Could not find \"{name}\": only relative (\"./\", \"../\") or absolute paths can be extended"
        )))
    }
}

/// Make relative entries of `config` absolute against `config_dir`: `./`
/// and `../` entries of `plugins` and `processors`, and every relative
/// `ignoreFiles` glob
fn anchor_relative_entries(config: &mut Map<String, Value>, config_dir: &Path) {
    let anchor_module = |name: &mut String| {
        if name.starts_with('.') {
            *name = normalize_path(&config_dir.join(&*name)).display().to_string();
        }
    };
    for key in [PLUGINS_KEY, PROCESSORS_KEY] {
        let Some(Value::Array(entries)) = config.get_mut(key) else {
            continue;
        };
        for entry in entries.iter_mut() {
            match entry {
                Value::String(name) => anchor_module(name),
                // [name, options]
                Value::Array(pair) => {
                    if let Some(Value::String(name)) = pair.first_mut() {
                        anchor_module(name);
                    }
                }
                _ => {}
            }
        }
    }

    match config.get_mut(IGNORE_FILES_KEY) {
        Some(Value::String(pattern)) => anchor_glob(pattern, config_dir),
        Some(Value::Array(patterns)) => {
            for pattern in patterns.iter_mut() {
                if let Value::String(pattern) = pattern {
                    anchor_glob(pattern, config_dir);
                }
            }
        }
        _ => {}
    }
}

/// Prefix a relative glob with the (escaped) `config_dir`
fn anchor_glob(pattern: &mut String, config_dir: &Path) {
    if Path::new(pattern.as_str()).is_absolute() {
        return;
    }
    let dir = Pattern::escape(&config_dir.display().to_string());
    let joined = format!("{}/{}", dir.trim_end_matches('/'), pattern);
    *pattern = normalize_path(Path::new(&joined)).display().to_string();
}

/// Make path-like override globs of an extended config absolute, so they keep
/// matching relative to the file that declared them
fn anchor_override_patterns(config: &mut Map<String, Value>, config_dir: &Path) {
    let Some(Value::Array(entries)) = config.get_mut(OVERRIDES_KEY) else {
        return;
    };
    let anchor = |pattern: &mut String| {
        if pattern.contains('/') {
            anchor_glob(pattern, config_dir);
        }
    };
    for entry in entries.iter_mut() {
        match entry.get_mut(FILES_KEY) {
            Some(Value::String(pattern)) => anchor(pattern),
            Some(Value::Array(patterns)) => {
                for pattern in patterns.iter_mut() {
                    if let Value::String(pattern) = pattern {
                        anchor(pattern);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Whether any of `patterns` matches `file_path`.
///
/// Relative patterns match the path relative to `config_dir`; patterns
/// without a separator also match the bare file name.
fn matches_any(patterns: &[String], config_dir: &Path, file_path: &Path) -> Result<bool> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let relative = file_path.strip_prefix(config_dir).unwrap_or(file_path);

    for raw in patterns {
        let pattern = Pattern::new(raw.trim_start_matches("./")).map_err(|e| {
            LintConfigError::config_error(format!("Invalid \"files\" glob \"{raw}\": {e}"))
        })?;

        let matched = if Path::new(raw).is_absolute() {
            pattern.matches_path_with(file_path, options)
        } else {
            pattern.matches_path_with(relative, options)
                || (!raw.contains('/')
                    && file_path
                        .file_name()
                        .is_some_and(|name| pattern.matches_path_with(Path::new(name), options)))
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

fn into_list(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Merge `overlay` on top of `base`
pub(crate) fn merge_configs(
    mut base: Map<String, Value>,
    overlay: Map<String, Value>,
) -> Map<String, Value> {
    for (key, value) in overlay {
        if key == "rules" {
            let rules = match (base.remove(&key), value) {
                (Some(Value::Object(mut rules)), Value::Object(more)) => {
                    rules.extend(more);
                    Value::Object(rules)
                }
                (_, value) => value,
            };
            base.insert(key, rules);
        } else if LIST_KEYS.contains(&key.as_str()) {
            let mut items = into_list(base.remove(&key));
            for item in into_list(Some(value)) {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            base.insert(key, Value::Array(items));
        } else if key == OVERRIDES_KEY {
            let mut items = into_list(base.remove(&key));
            items.extend(into_list(Some(value)));
            base.insert(key, Value::Array(items));
        } else {
            base.insert(key, value);
        }
    }
    base
}
