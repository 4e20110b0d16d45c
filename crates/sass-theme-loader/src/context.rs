//! Per-invocation loader context.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A [`LoaderContext`] is created by the host for every stylesheet it
//! compiles. It carries the loader options, the host's resolve settings,
//! the dependency registry and the completion handle. The compiler gets a
//! [`CompilerContext`], a shallow copy that shares the dependency registry
//! but holds compiler options instead of loader options.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tokio::sync::oneshot;

use crate::error::LoaderError;
use crate::importer::AliasMap;
use crate::options::{CompilerOptions, LoaderOptions};

/// Result delivered through the completion handle.
pub type LoaderResult = Result<LoaderOutput, LoaderError>;

/// Module resolution settings owned by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveOptions {
    #[serde(default)]
    pub alias: AliasMap,
}

/// Positional loader arguments.
#[derive(Debug, Clone, Default)]
pub struct LoaderInput {
    /// Stylesheet source
    pub content: String,
    /// Incoming source map, if an earlier loader produced one
    pub source_map: Option<String>,
}

impl LoaderInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_map: None,
        }
    }
}

/// Compiled stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOutput {
    pub css: String,
    pub source_map: Option<String>,
}

/// Files whose changes invalidate the current output.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct Dependencies(Arc<Mutex<Vec<PathBuf>>>);

impl Dependencies {
    /// Register `path`; registering the same path twice is a no-op.
    pub fn add(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut paths = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !paths.contains(&path) {
            tracing::debug!(dependency = %path.display(), "Registered build dependency");
            paths.push(path);
        }
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// One-shot completion handle; consumed when signalled.
#[derive(Debug)]
pub struct AsyncCallback {
    sender: oneshot::Sender<LoaderResult>,
}

impl AsyncCallback {
    pub fn complete(self, result: LoaderResult) {
        if self.sender.send(result).is_err() {
            tracing::debug!("Loader result dropped: nobody is waiting for it");
        }
    }
}

/// Host side of the completion handle.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<LoaderResult>,
}

impl Completion {
    /// Wait for the loader to report. A loader that drops its handle
    /// without reporting yields [`LoaderError::Cancelled`].
    pub async fn wait(self) -> LoaderResult {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(LoaderError::Cancelled))
    }
}

/// Context for one loader invocation.
#[derive(Debug)]
pub struct LoaderContext {
    resource_path: PathBuf,
    options: LoaderOptions,
    resolve: ResolveOptions,
    dependencies: Dependencies,
    callback: Option<AsyncCallback>,
}

impl LoaderContext {
    /// Create a context for `resource_path` along with the handle the host
    /// waits on.
    pub fn new(
        resource_path: impl Into<PathBuf>,
        options: LoaderOptions,
        resolve: ResolveOptions,
    ) -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        let context = Self {
            resource_path: resource_path.into(),
            options,
            resolve,
            dependencies: Dependencies::default(),
            callback: Some(AsyncCallback { sender }),
        };
        (context, Completion { receiver })
    }

    /// Take the completion handle. Returns `None` once it has been taken.
    pub fn async_callback(&mut self) -> Option<AsyncCallback> {
        self.callback.take()
    }

    pub fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn resolve(&self) -> &ResolveOptions {
        &self.resolve
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn add_dependency(&self, path: impl Into<PathBuf>) {
        self.dependencies.add(path);
    }

    /// Shallow copy for the compiler, sharing this context's dependency registry.
    pub fn downstream(&self) -> CompilerContext {
        CompilerContext {
            resource_path: self.resource_path.clone(),
            options: CompilerOptions::default(),
            resolve: self.resolve.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Context handed to the underlying compiler.
#[derive(Debug, Clone)]
pub struct CompilerContext {
    resource_path: PathBuf,
    options: CompilerOptions,
    resolve: ResolveOptions,
    dependencies: Dependencies,
}

impl CompilerContext {
    pub fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    /// Directory of the stylesheet being compiled.
    pub fn resource_dir(&self) -> &Path {
        self.resource_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CompilerOptions) {
        self.options = options;
    }

    pub fn resolve(&self) -> &ResolveOptions {
        &self.resolve
    }

    pub fn add_dependency(&self, path: impl Into<PathBuf>) {
        self.dependencies.add(path);
    }
}
