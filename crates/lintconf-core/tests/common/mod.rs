//! Stub collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lintconf_core::{
    Augment, ConfigSearch, LintConfigError, RawConfigResult, ResolvedConfig, ResolverOptions,
    Result,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// One recorded augmentation call
#[derive(Debug, Clone)]
pub struct AugmentCall {
    pub file_path: Option<PathBuf>,
    pub raw: RawConfigResult,
}

/// Augmenter that passes configs through unchanged and records every call
#[derive(Default)]
pub struct CountingAugmenter {
    calls: AtomicUsize,
    seen: Mutex<Vec<AugmentCall>>,
    delay: Option<Duration>,
}

impl CountingAugmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every augmentation, to widen race windows
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<AugmentCall> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Augment for CountingAugmenter {
    async fn augment(
        &self,
        _options: &ResolverOptions,
        file_path: Option<&Path>,
        raw: RawConfigResult,
    ) -> Result<ResolvedConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(AugmentCall {
            file_path: file_path.map(Path::to_path_buf),
            raw: raw.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ResolvedConfig::new(raw.config, raw.filepath))
    }
}

/// Augmenter that always fails with a configuration error carrying `message`
pub struct FailingAugmenter {
    pub message: String,
}

#[async_trait]
impl Augment for FailingAugmenter {
    async fn augment(
        &self,
        _options: &ResolverOptions,
        _file_path: Option<&Path>,
        _raw: RawConfigResult,
    ) -> Result<ResolvedConfig> {
        Err(LintConfigError::config_error(self.message.clone()))
    }
}

/// In-memory search: `search(dir)` returns the entry registered for exactly
/// that directory, `load(path)` the entry registered for that file
#[derive(Default)]
pub struct StubSearch {
    by_dir: HashMap<PathBuf, RawConfigResult>,
    by_file: HashMap<PathBuf, RawConfigResult>,
    fail_with_parse_error: bool,
    searches: Mutex<Vec<PathBuf>>,
    loads: Mutex<Vec<PathBuf>>,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>, raw: RawConfigResult) -> Self {
        self.by_dir.insert(dir.into(), raw);
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>, raw: RawConfigResult) -> Self {
        self.by_file.insert(file.into(), raw);
        self
    }

    /// Make every search fail as if a found file were malformed
    pub fn failing() -> Self {
        Self {
            fail_with_parse_error: true,
            ..Self::default()
        }
    }

    pub fn searches(&self) -> Vec<PathBuf> {
        self.searches.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigSearch for StubSearch {
    async fn search(&self, start: &Path) -> Result<Option<RawConfigResult>> {
        self.searches.lock().unwrap().push(start.to_path_buf());
        if self.fail_with_parse_error {
            return Err(LintConfigError::parse_error(
                start.join(".lintconfrc.json"),
                "unexpected end of input",
            ));
        }
        Ok(self.by_dir.get(start).cloned())
    }

    async fn load(&self, path: &Path) -> Result<RawConfigResult> {
        self.loads.lock().unwrap().push(path.to_path_buf());
        self.by_file.get(path).cloned().ok_or_else(|| {
            LintConfigError::io_error(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            )
        })
    }
}
