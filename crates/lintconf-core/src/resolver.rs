//! Configuration resolution
//!
//! [`ConfigResolver`] decides which configuration governs a file. A resolver
//! is a session: it owns the options, the collaborators and the
//! specified-configuration cache, and the cache lives exactly as long as the
//! resolver does.
//!
//! Exactly one path runs per request:
//!
//! - an explicit configuration object is augmented (and cached by identity
//!   unless it carries `overrides`);
//! - otherwise the explicit configuration file is loaded, or the filesystem is
//!   searched from the search path and then from the base directory.

use crate::augment::{Augment, StandardAugmenter};
use crate::cache::SpecifiedConfigCache;
use crate::config::{RawConfigResult, ResolvedConfig, ResolverOptions, SpecifiedConfig};
use crate::error::LintConfigError;
use crate::result::Result;
use crate::search::{ConfigSearch, DEFAULT_MODULE_NAME, FsConfigSearch, SearchOptions, SearchStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Path segment appended to the base directory to form the origin of an
/// explicit configuration object. Directory-of-origin computations then
/// yield the base directory itself.
pub const ARGUMENT_CONFIG_SENTINEL: &str = "argument-config";

/// The resolution path chosen for a request
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveMode<'a> {
    /// Augment the caller-supplied configuration object
    SpecifiedConfig(&'a SpecifiedConfig),
    /// Load exactly this file
    ConfigFile(PathBuf),
    /// Search the filesystem starting here
    Search(PathBuf),
}

impl<'a> ResolveMode<'a> {
    /// Pick the mode for a request against `options`
    pub fn select(options: &'a ResolverOptions, search_path: Option<&Path>) -> Self {
        if let Some(config) = &options.config {
            ResolveMode::SpecifiedConfig(config)
        } else if let Some(config_file) = &options.config_file {
            ResolveMode::ConfigFile(options.absolutize(config_file))
        } else {
            let start = search_path
                .map(|path| options.absolutize(path))
                .unwrap_or_else(|| options.cwd.clone());
            ResolveMode::Search(start)
        }
    }
}

/// Search collaborator wrapped so that every match is augmented before it
/// counts as found
struct TransformingSearch<'a> {
    search: &'a dyn ConfigSearch,
    augmenter: &'a dyn Augment,
    options: &'a ResolverOptions,
    file_path: Option<&'a Path>,
}

impl TransformingSearch<'_> {
    async fn transform(&self, raw: RawConfigResult) -> Result<ResolvedConfig> {
        trace!("Augmenting {}", raw.filepath.display());
        self.augmenter.augment(self.options, self.file_path, raw).await
    }

    async fn search(&self, start: &Path) -> Result<Option<ResolvedConfig>> {
        match self.search.search(start).await? {
            Some(raw) => self.transform(raw).await.map(Some),
            None => Ok(None),
        }
    }

    async fn load(&self, path: &Path) -> Result<ResolvedConfig> {
        let raw = self.search.load(path).await?;
        self.transform(raw).await
    }
}

/// Resolves the effective configuration for files
pub struct ConfigResolver {
    options: ResolverOptions,
    augmenter: Arc<dyn Augment>,
    search: Arc<dyn ConfigSearch>,
    cache: SpecifiedConfigCache,
}

impl ConfigResolver {
    /// Create a resolver with the standard augmenter and filesystem search
    pub fn new(options: ResolverOptions) -> Self {
        let search_options =
            SearchOptions::new(DEFAULT_MODULE_NAME).with_strategy(SearchStrategy::Global);
        Self {
            options,
            augmenter: Arc::new(StandardAugmenter::new()),
            search: Arc::new(FsConfigSearch::new(search_options)),
            cache: SpecifiedConfigCache::new(),
        }
    }

    /// Replace the augmentation collaborator
    pub fn with_augmenter(mut self, augmenter: Arc<dyn Augment>) -> Self {
        self.augmenter = augmenter;
        self
    }

    /// Replace the search collaborator
    pub fn with_search(mut self, search: Arc<dyn ConfigSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// The session's specified-configuration cache
    pub fn cache(&self) -> &SpecifiedConfigCache {
        &self.cache
    }

    /// Resolve the configuration for `file_path`, searching from `search_path`
    /// (the base directory when `None`)
    ///
    /// Fails with a configuration error when no configuration can be found.
    /// Errors from augmentation or from reading configuration files are
    /// returned as-is.
    pub async fn resolve(
        &self,
        search_path: Option<&Path>,
        file_path: Option<&Path>,
    ) -> Result<Arc<ResolvedConfig>> {
        match ResolveMode::select(&self.options, search_path) {
            ResolveMode::SpecifiedConfig(config) => {
                self.resolve_specified(config, file_path).await
            }
            ResolveMode::ConfigFile(path) => {
                let explorer = self.explorer(file_path);
                debug!("Loading config file {}", path.display());
                explorer.load(&path).await.map(Arc::new)
            }
            ResolveMode::Search(start) => {
                let explorer = self.explorer(file_path);
                let mut found = explorer.search(&start).await?;

                if found.is_none() {
                    debug!(
                        "No config found from {}, retrying from {}",
                        start.display(),
                        self.options.cwd.display()
                    );
                    found = explorer.search(&self.options.cwd).await?;
                }

                found.map(Arc::new).ok_or_else(|| not_found(search_path))
            }
        }
    }

    /// Resolve the configuration for a file, searching from its directory
    pub async fn resolve_for_file(&self, file_path: &Path) -> Result<Arc<ResolvedConfig>> {
        let absolute = self.options.absolutize(file_path);
        let search_path = absolute.parent().map(Path::to_path_buf);
        self.resolve(search_path.as_deref(), Some(file_path)).await
    }

    fn explorer<'a>(&'a self, file_path: Option<&'a Path>) -> TransformingSearch<'a> {
        TransformingSearch {
            search: self.search.as_ref(),
            augmenter: self.augmenter.as_ref(),
            options: &self.options,
            file_path,
        }
    }

    async fn resolve_specified(
        &self,
        config: &SpecifiedConfig,
        file_path: Option<&Path>,
    ) -> Result<Arc<ResolvedConfig>> {
        // With overrides the effective config may differ per file, so the
        // cached value is never served; it is still refreshed below.
        if config.has_overrides() {
            self.cache.record_miss();
            let resolved = Arc::new(self.augment_specified(config, file_path).await?);
            self.cache.insert(config, resolved.clone()).await;
            return Ok(resolved);
        }

        // The slot stays locked while augmenting so concurrent first
        // resolutions of the same object augment it once.
        let slot = self.cache.slot(config);
        let mut cached = slot.lock().await;
        if let Some(resolved) = cached.as_ref() {
            trace!("Specified config cache hit");
            self.cache.record_hit();
            return Ok(resolved.clone());
        }

        self.cache.record_miss();
        let resolved = Arc::new(self.augment_specified(config, file_path).await?);
        *cached = Some(resolved.clone());
        Ok(resolved)
    }

    async fn augment_specified(
        &self,
        config: &SpecifiedConfig,
        file_path: Option<&Path>,
    ) -> Result<ResolvedConfig> {
        let raw = RawConfigResult::new(
            config.value().clone(),
            self.options.cwd.join(ARGUMENT_CONFIG_SENTINEL),
        );
        self.augmenter.augment(&self.options, file_path, raw).await
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// An empty search path counts as absent
fn not_found(search_path: Option<&Path>) -> LintConfigError {
    match search_path.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => LintConfigError::config_error(format!(
            "No configuration provided for {}",
            path.display()
        )),
        None => LintConfigError::config_error("No configuration provided"),
    }
}
