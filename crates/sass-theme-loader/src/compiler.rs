//! The underlying style compiler.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Key components:
//! - `StyleCompiler`: the seam the loader delegates compilation through
//! - `GrassCompiler`: native implementation using the grass crate
//! - `ImporterFs`: adapter implementing `grass::Fs` that consults the
//!   importer chain before the real file system

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use grass::Options;

use crate::context::{CompilerContext, LoaderInput, LoaderOutput};
use crate::error::CompileError;
use crate::importer::ImporterChain;
use crate::request::{ImportRequest, import_urls, normalize_path};

/// Extensions grass appends, in probe order, to an import without one.
const PROBE_EXTENSIONS: [&str; 6] = ["import.sass", "sass", "import.css", "css", "import.scss", "scss"];

/// Compiles one stylesheet with the options installed on the context.
#[async_trait]
pub trait StyleCompiler: Debug + Send + Sync {
    async fn compile(
        &self,
        context: &CompilerContext,
        input: LoaderInput,
    ) -> Result<LoaderOutput, CompileError>;
}

/// SCSS compilation using grass.
///
/// The input is compiled as if read from the resource path, so relative
/// imports resolve against the importing file's directory, then the
/// configured load paths, then the stylesheet's directory. grass does not
/// emit source maps, so the output never carries one.
///
/// grass is synchronous: importers are driven to completion on the
/// compiling thread and must not wait on a tokio timer or channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

impl GrassCompiler {
    pub fn new() -> Self {
        Self
    }

    fn compile_sync(context: &CompilerContext, input: LoaderInput) -> Result<LoaderOutput, CompileError> {
        let options = context.options();
        let resource = context.resource_path();

        let mut load_paths = Vec::with_capacity(options.load_paths.len() + 1);
        load_paths.extend(options.load_paths.iter().cloned());
        load_paths.push(context.resource_dir().to_path_buf());

        let fs = ImporterFs::new(&options.sass_options.importer);
        fs.insert(resource, input.content);
        let grass_options = Options::default()
            .fs(&fs)
            .load_paths(&load_paths)
            .style(options.style.into());

        let css = grass::from_path(resource, &grass_options).map_err(|e| CompileError::Sass {
            resource: resource.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(LoaderOutput {
            css,
            source_map: None,
        })
    }
}

#[async_trait]
impl StyleCompiler for GrassCompiler {
    async fn compile(
        &self,
        context: &CompilerContext,
        input: LoaderInput,
    ) -> Result<LoaderOutput, CompileError> {
        tracing::debug!(resource = %context.resource_path().display(), "Compiling stylesheet");
        Self::compile_sync(context, input)
    }
}

/// Adapter that implements `grass::Fs` on top of an importer chain.
///
/// Whenever grass reads a stylesheet, each URL it imports is offered to the
/// chain as written, with the stylesheet's directory as the base. An answer
/// is served at the SCSS paths grass probes for that URL (`_name.scss`,
/// `name.import.scss`, ...). The paths grass tries before those, in other
/// syntaxes, are hidden so the importer wins over files on disk.
/// Each (URL, base) pair reaches the chain at most once per compilation.
/// Paths nobody answered for go to the real file system.
pub struct ImporterFs<'a> {
    importers: &'a ImporterChain,
    files: Mutex<HashMap<PathBuf, Arc<str>>>,
    hidden: Mutex<HashSet<PathBuf>>,
    answers: Mutex<HashMap<(String, PathBuf), Option<Arc<str>>>>,
}

impl<'a> ImporterFs<'a> {
    pub fn new(importers: &'a ImporterChain) -> Self {
        Self {
            importers,
            files: Mutex::new(HashMap::new()),
            hidden: Mutex::new(HashSet::new()),
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `contents` at `path` instead of reading it from disk.
    pub fn insert(&self, path: &Path, contents: impl Into<Arc<str>>) {
        lock(&self.files).insert(normalize_path(path), contents.into());
    }

    fn file(&self, path: &Path) -> Option<Arc<str>> {
        lock(&self.files).get(&normalize_path(path)).cloned()
    }

    fn is_hidden(&self, path: &Path) -> bool {
        lock(&self.hidden).contains(&normalize_path(path))
    }

    /// Ask the chain about `request`, once per URL and base directory.
    fn answer(&self, request: &ImportRequest) -> Option<Arc<str>> {
        let key = (request.url.clone(), request.base_dir.clone());
        if let Some(answer) = lock(&self.answers).get(&key) {
            return answer.clone();
        }

        // Not locked while resolving: importers may take their time.
        let answer = pollster::block_on(self.importers.resolve(request)).map(|hit| hit.contents);
        lock(&self.answers).insert(key, answer.clone());
        answer
    }

    /// Offer the imports of the stylesheet at `path` to the chain.
    fn resolve_imports(&self, path: &Path, source: &str) {
        if self.importers.is_empty() {
            return;
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        for url in import_urls(source) {
            let request = ImportRequest::new(url, base_dir);
            let Some(contents) = self.answer(&request) else {
                continue;
            };

            tracing::debug!(url = %request.url, base = %base_dir.display(), "Import served by importer");
            let mut files = lock(&self.files);
            let mut hidden = lock(&self.hidden);
            for (probe, served) in probe_paths(&base_dir.join(&request.url)) {
                if served {
                    files.entry(probe).or_insert_with(|| Arc::clone(&contents));
                } else if !files.contains_key(&probe) {
                    hidden.insert(probe);
                }
            }
        }
    }
}

impl Debug for ImporterFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImporterFs")
            .field("importers", &self.importers.len())
            .field("files", &lock(&self.files).len())
            .finish()
    }
}

impl grass::Fs for ImporterFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.file(path).is_none() && path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.file(path).is_some() || (!self.is_hidden(path) && path.is_file())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let contents = match self.file(path) {
            Some(contents) => contents.as_bytes().to_vec(),
            None => std::fs::read(path)?,
        };
        if let Ok(source) = std::str::from_utf8(&contents) {
            self.resolve_imports(path, source);
        }
        Ok(contents)
    }
}

/// Every path grass tries, normalized and in order, when importing
/// `target`. The flag is false for paths in another syntax than SCSS, where
/// an importer's answer must not be served.
fn probe_paths(target: &Path) -> Vec<(PathBuf, bool)> {
    let target = normalize_path(target);
    let explicit = target
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| matches!(*ext, "scss" | "sass" | "css"))
        .map(str::to_owned);

    let decorated = match explicit {
        Some(ext) => vec![(target.with_extension(format!("import.{ext}")), true), (target, true)],
        None => PROBE_EXTENSIONS
            .iter()
            .map(|ext| (target.with_extension(ext), ext.ends_with("scss")))
            .collect(),
    };

    decorated
        .into_iter()
        .flat_map(|(path, served)| {
            let partial = partial_of(&path);
            [(path, served), (partial, served)]
        })
        .collect()
}

fn partial_of(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => dir.join(format!("_{}", name.to_string_lossy())),
        _ => path.to_path_buf(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
