//! Resolution hooks ("importers") and the theme importer.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! An importer is given the chance to supply the contents of an import
//! before the compiler falls back to reading from disk. Importers are kept
//! in an [`ImporterChain`]; the first one to answer wins.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::request::{ImportRequest, imports_to_resolve, resolve_path, split_root};

/// Alias root (first path segment of a request) to replacement base path.
pub type AliasMap = BTreeMap<String, PathBuf>;

/// Contents supplied by an importer in place of a file read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub contents: Arc<str>,
}

/// A resolution hook.
///
/// `resolve` returns `Some` to short-circuit resolution with the given
/// contents, or `None` to let the next importer (and eventually the
/// compiler's own resolver) handle the request. It is called once per
/// import URL and importing directory.
///
/// [`GrassCompiler`](crate::GrassCompiler) drives importers with a plain
/// executor on the compiling thread, so they must not wait on a tokio
/// timer, socket or channel.
#[async_trait]
pub trait Importer: Debug + Send + Sync {
    async fn resolve(&self, request: &ImportRequest) -> Option<Resolved>;
}

/// Serves precompiled theme variables for requests that point at the theme file.
#[derive(Debug, Clone)]
pub struct ThemeImporter {
    theme_path: Arc<Path>,
    contents: Arc<str>,
    aliases: Arc<AliasMap>,
}

impl ThemeImporter {
    /// Create an importer for `theme_path`.
    ///
    /// `theme_path` must already be absolute and normalized; it is compared
    /// verbatim against resolved candidates.
    pub fn new(theme_path: impl Into<PathBuf>, contents: impl Into<Arc<str>>, aliases: AliasMap) -> Self {
        Self {
            theme_path: Arc::from(theme_path.into()),
            contents: contents.into(),
            aliases: Arc::new(aliases),
        }
    }

    pub fn theme_path(&self) -> &Path {
        &self.theme_path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Whether `request` refers to the theme file, either directly or
    /// through one alias lookup. Stops at the first matching candidate.
    pub fn matches(&self, request: &ImportRequest) -> bool {
        imports_to_resolve(&request.url)
            .iter()
            .any(|candidate| self.candidate_matches(&request.base_dir, candidate))
    }

    fn candidate_matches(&self, base_dir: &Path, candidate: &str) -> bool {
        if resolve_path(base_dir, candidate) == *self.theme_path {
            return true;
        }

        if self.aliases.is_empty() {
            return false;
        }
        let (root, rest) = split_root(candidate);
        match self.aliases.get(root) {
            Some(target) => resolve_path(target, rest) == *self.theme_path,
            None => false,
        }
    }
}

#[async_trait]
impl Importer for ThemeImporter {
    async fn resolve(&self, request: &ImportRequest) -> Option<Resolved> {
        if self.matches(request) {
            tracing::debug!(url = %request.url, theme = %self.theme_path.display(), "Serving precompiled theme variables");
            Some(Resolved {
                contents: Arc::clone(&self.contents),
            })
        } else {
            None
        }
    }
}

/// Importers as supplied by the caller, before the theme importer is added.
#[derive(Debug, Clone, Default)]
pub enum ImporterOption {
    #[default]
    None,
    Single(Arc<dyn Importer>),
    Many(Vec<Arc<dyn Importer>>),
}

impl ImporterOption {
    /// Normalize to an ordered list.
    pub fn into_vec(self) -> Vec<Arc<dyn Importer>> {
        match self {
            ImporterOption::None => Vec::new(),
            ImporterOption::Single(importer) => vec![importer],
            ImporterOption::Many(importers) => importers,
        }
    }
}

impl From<Arc<dyn Importer>> for ImporterOption {
    fn from(importer: Arc<dyn Importer>) -> Self {
        ImporterOption::Single(importer)
    }
}

impl From<Vec<Arc<dyn Importer>>> for ImporterOption {
    fn from(importers: Vec<Arc<dyn Importer>>) -> Self {
        ImporterOption::Many(importers)
    }
}

/// Ordered importers; earlier entries take precedence.
#[derive(Debug, Clone, Default)]
pub struct ImporterChain {
    importers: Vec<Arc<dyn Importer>>,
}

impl ImporterChain {
    pub fn new(importers: Vec<Arc<dyn Importer>>) -> Self {
        Self { importers }
    }

    /// Caller importers followed by `last`.
    pub fn with_last(option: ImporterOption, last: Arc<dyn Importer>) -> Self {
        let mut importers = option.into_vec();
        importers.push(last);
        Self { importers }
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Importer>> {
        self.importers.iter()
    }

    /// Ask each importer in turn; the first answer wins.
    pub async fn resolve(&self, request: &ImportRequest) -> Option<Resolved> {
        for importer in &self.importers {
            if let Some(resolved) = importer.resolve(request).await {
                return Some(resolved);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn theme_importer(aliases: AliasMap) -> ThemeImporter {
        ThemeImporter::new("/abs/themes/vars.scss", "$primary: #1890ff;\n", aliases)
    }

    fn alias_map() -> AliasMap {
        AliasMap::from([("@theme".to_string(), PathBuf::from("/abs/themes"))])
    }

    #[derive(Debug)]
    struct Fixed(&'static str);

    #[async_trait]
    impl Importer for Fixed {
        async fn resolve(&self, _request: &ImportRequest) -> Option<Resolved> {
            Some(Resolved {
                contents: Arc::from(self.0),
            })
        }
    }

    #[derive(Debug, Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Importer for Counting {
        async fn resolve(&self, _request: &ImportRequest) -> Option<Resolved> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn test_direct_relative_match() {
        let importer = theme_importer(AliasMap::new());
        let request = ImportRequest::new("../themes/vars", "/abs/styles");
        let resolved = pollster::block_on(importer.resolve(&request)).unwrap();
        assert_eq!(&*resolved.contents, "$primary: #1890ff;\n");
    }

    #[test]
    fn test_direct_absolute_match() {
        let importer = theme_importer(AliasMap::new());
        let request = ImportRequest::new("/abs/themes/vars.scss", "/somewhere/else");
        assert!(pollster::block_on(importer.resolve(&request)).is_some());
    }

    #[test]
    fn test_alias_match() {
        let importer = theme_importer(alias_map());
        let request = ImportRequest::new("@theme/vars", "/abs/app/src");
        let resolved = pollster::block_on(importer.resolve(&request)).unwrap();
        assert_eq!(&*resolved.contents, importer.contents());
    }

    #[test]
    fn test_alias_with_nested_remainder() {
        let importer = ThemeImporter::new("/abs/themes/dark/vars.scss", "", alias_map());
        let request = ImportRequest::new("@theme/dark/vars", "/abs/app/src");
        assert!(importer.matches(&request));
    }

    #[test]
    fn test_unknown_alias_root_is_unresolved() {
        let importer = theme_importer(alias_map());
        let request = ImportRequest::new("@other/vars", "/abs/app/src");
        assert!(pollster::block_on(importer.resolve(&request)).is_none());
    }

    #[test]
    fn test_empty_alias_map_falls_back_to_direct_comparison() {
        let importer = theme_importer(AliasMap::new());
        let aliased = ImportRequest::new("@theme/vars", "/abs/app/src");
        assert!(pollster::block_on(importer.resolve(&aliased)).is_none());

        let direct = ImportRequest::new("vars", "/abs/themes");
        assert!(pollster::block_on(importer.resolve(&direct)).is_some());
    }

    #[test]
    fn test_non_theme_request_is_unresolved() {
        let importer = theme_importer(alias_map());
        for url in ["buttons", "./layout/grid", "~bootstrap", "reset.css", "vars"] {
            let request = ImportRequest::new(url, "/abs/app/src");
            assert!(
                pollster::block_on(importer.resolve(&request)).is_none(),
                "{url} should not resolve to the theme"
            );
        }
    }

    #[test]
    fn test_importer_option_normalization() {
        let a: Arc<dyn Importer> = Arc::new(Fixed("a"));
        let b: Arc<dyn Importer> = Arc::new(Fixed("b"));

        assert!(ImporterOption::None.into_vec().is_empty());
        assert_eq!(ImporterOption::from(a.clone()).into_vec().len(), 1);
        assert_eq!(ImporterOption::from(vec![a, b]).into_vec().len(), 2);
    }

    #[test]
    fn test_chain_first_answer_wins() {
        let first: Arc<dyn Importer> = Arc::new(Fixed("first"));
        let second: Arc<dyn Importer> = Arc::new(Fixed("second"));
        let chain = ImporterChain::new(vec![first, second]);
        let request = ImportRequest::new("anything", "/");
        let resolved = pollster::block_on(chain.resolve(&request)).unwrap();
        assert_eq!(&*resolved.contents, "first");
    }

    #[test]
    fn test_chain_stops_after_match() {
        let counter = Arc::new(Counting::default());
        let theme: Arc<dyn Importer> = Arc::new(theme_importer(AliasMap::new()));
        let chain = ImporterChain::new(vec![theme, counter.clone() as Arc<dyn Importer>]);

        let request = ImportRequest::new("/abs/themes/vars.scss", "/");
        assert!(pollster::block_on(chain.resolve(&request)).is_some());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        let miss = ImportRequest::new("buttons", "/abs/app");
        assert!(pollster::block_on(chain.resolve(&miss)).is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_user_importer_takes_precedence_over_theme() {
        let theme: Arc<dyn Importer> = Arc::new(theme_importer(AliasMap::new()));
        let chain = ImporterChain::with_last(ImporterOption::Single(Arc::new(Fixed("user"))), theme);
        let request = ImportRequest::new("/abs/themes/vars.scss", "/");
        let resolved = pollster::block_on(chain.resolve(&request)).unwrap();
        assert_eq!(&*resolved.contents, "user");
    }
}
