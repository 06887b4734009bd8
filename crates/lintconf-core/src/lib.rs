//! lintconf core
//!
//! Resolves the effective configuration a linter should use for a file.
//! The configuration comes either from an explicitly supplied object or from a
//! configuration file discovered on disk, and is always augmented (`extends`,
//! `plugins`, `overrides`) before it is handed out.
//!
//! ```rust,no_run
//! use lintconf_core::{ConfigResolver, ResolverOptions};
//! use std::path::Path;
//!
//! # async fn example() -> lintconf_core::Result<()> {
//! let resolver = ConfigResolver::new(ResolverOptions::new("/path/to/project"));
//! let resolved = resolver.resolve_for_file(Path::new("src/button.css")).await?;
//! println!("{} -> {:?}", resolved.filepath.display(), resolved.rules());
//! # Ok(())
//! # }
//! ```

pub mod augment;
pub mod cache;
pub mod config;
pub mod error;
pub mod resolver;
pub mod result;
pub mod search;

pub use augment::{Augment, StandardAugmenter};
pub use cache::{CacheStats, SpecifiedConfigCache};
pub use config::{
    ConfigId, RawConfigResult, ResolvedConfig, ResolverOptions, SpecifiedConfig, has_overrides,
    normalize_path,
};
pub use error::{CONFIG_ERROR_EXIT_CODE, ErrorKind, LintConfigError};
pub use resolver::{ARGUMENT_CONFIG_SENTINEL, ConfigResolver, ResolveMode};
pub use result::Result;
pub use search::{
    ConfigSearch, DEFAULT_MODULE_NAME, FsConfigSearch, SearchOptions, SearchStrategy,
    detect_stop_dir,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
