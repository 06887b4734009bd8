//! Configuration values passed between the resolver and its collaborators
//!
//! Configuration objects are kept as untyped JSON values: the resolver never
//! interprets them beyond checking for an `overrides` field, and the
//! augmentation step works on arbitrary keys (`rules`, `plugins`, ...).

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Name of the field holding per-file override rules
pub const OVERRIDES_KEY: &str = "overrides";

/// Returns true when `value` would be considered set by a configuration author.
///
/// Missing, `null`, `false`, `0` and `""` count as unset; every array or
/// object (even an empty one) counts as set.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Whether a configuration object carries per-file overrides
pub fn has_overrides(config: &Value) -> bool {
    is_truthy(config.get(OVERRIDES_KEY))
}

/// Identity of a [`SpecifiedConfig`], used as the cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId(usize);

/// A configuration object supplied directly by the caller.
///
/// Clones share the same identity; two values built separately with
/// [`SpecifiedConfig::new`] never do, even when structurally equal.
#[derive(Debug, Clone)]
pub struct SpecifiedConfig {
    inner: Arc<Value>,
}

impl SpecifiedConfig {
    /// Wrap a configuration object, giving it a fresh identity
    pub fn new(config: Value) -> Self {
        Self {
            inner: Arc::new(config),
        }
    }

    /// Identity of this configuration object
    pub fn id(&self) -> ConfigId {
        ConfigId(Arc::as_ptr(&self.inner) as usize)
    }

    /// The raw configuration value
    pub fn value(&self) -> &Value {
        &self.inner
    }

    /// Whether the configuration carries per-file overrides
    pub fn has_overrides(&self) -> bool {
        has_overrides(&self.inner)
    }

    /// Whether both handles refer to the same configuration object
    pub fn same_identity(&self, other: &SpecifiedConfig) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Equality is identity: structurally equal objects built separately differ
impl PartialEq for SpecifiedConfig {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for SpecifiedConfig {}

impl From<Value> for SpecifiedConfig {
    fn from(config: Value) -> Self {
        Self::new(config)
    }
}

/// A raw configuration as found on disk (or supplied by the caller), before
/// `extends`, `plugins` and `overrides` are resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawConfigResult {
    /// The configuration object
    pub config: Value,
    /// Absolute path the configuration originates from
    pub filepath: PathBuf,
}

impl RawConfigResult {
    pub fn new(config: Value, filepath: impl Into<PathBuf>) -> Self {
        Self {
            config,
            filepath: filepath.into(),
        }
    }

    /// Directory relative paths inside the configuration resolve against
    pub fn config_dir(&self) -> &Path {
        self.filepath.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// A fully resolved configuration, ready to lint with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// The effective configuration object
    pub config: Value,
    /// Path of the configuration it was resolved from
    pub filepath: PathBuf,
}

impl ResolvedConfig {
    pub fn new(config: Value, filepath: impl Into<PathBuf>) -> Self {
        Self {
            config,
            filepath: filepath.into(),
        }
    }

    /// The effective `rules` table, if any
    pub fn rules(&self) -> Option<&Map<String, Value>> {
        self.config.get("rules").and_then(Value::as_object)
    }

    /// Look up the setting of a single rule
    pub fn rule(&self, name: &str) -> Option<&Value> {
        self.rules().and_then(|rules| rules.get(name))
    }
}

/// Per-session options the resolver and its collaborators work from
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Base working directory
    pub cwd: PathBuf,
    /// Explicit configuration object; disables filesystem search
    pub config: Option<SpecifiedConfig>,
    /// Explicit configuration file; loaded instead of searching
    pub config_file: Option<PathBuf>,
}

impl ResolverOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: impl Into<SpecifiedConfig>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Resolve `path` against the base directory when it is relative
    pub fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.cwd.join(path))
        }
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment, without touching the filesystem.
///
/// `..` above the root stays at the root; leading `..` of a relative path
/// is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }
    components.iter().collect()
}
