//! Loader options and the option overloader.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::ResolveOptions;
use crate::error::ThemeError;
use crate::importer::{ImporterChain, ImporterOption, ThemeImporter};
use crate::theme::{ThemeCompiler, theme_path};

/// CSS output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl From<OutputStyle> for grass::OutputStyle {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        }
    }
}

/// Options given to the loader by its caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoaderOptions {
    /// Theme file whose variables are served to every stylesheet.
    /// Consumed by the loader and never passed to the compiler.
    #[serde(default, alias = "scssThemePath")]
    pub scss_theme_path: Option<PathBuf>,

    #[serde(default)]
    pub style: OutputStyle,

    /// Extra directories searched for imports
    #[serde(default, alias = "loadPaths")]
    pub load_paths: Vec<PathBuf>,

    /// Caller importers, consulted before the theme importer
    #[serde(skip)]
    pub importer: ImporterOption,
}

/// Compiler-specific options nested under the compiler options.
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    pub importer: ImporterChain,
}

/// Options as seen by the underlying style compiler.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub style: OutputStyle,
    pub load_paths: Vec<PathBuf>,
    pub sass_options: SassOptions,
}

/// Loader options with the importer chain attached, still carrying the
/// theme path until the entry point strips it.
#[derive(Debug, Clone)]
pub struct OverloadedOptions {
    pub scss_theme_path: Option<PathBuf>,
    pub style: OutputStyle,
    pub load_paths: Vec<PathBuf>,
    pub sass_options: SassOptions,
}

impl OverloadedOptions {
    /// Drop the theme path and hand the rest to the compiler.
    pub fn into_compiler_options(self) -> CompilerOptions {
        let OverloadedOptions {
            scss_theme_path: _,
            style,
            load_paths,
            sass_options,
        } = self;
        CompilerOptions {
            style,
            load_paths,
            sass_options,
        }
    }
}

/// Precompile the theme and append a theme importer to the caller's importers.
///
/// The input options are left untouched. Caller importers keep their order
/// and precedence; the theme importer is always last. The theme is compiled
/// with the same load paths as the stylesheet.
pub async fn overload_options(
    options: &LoaderOptions,
    resolve: &ResolveOptions,
    theme_compiler: &dyn ThemeCompiler,
) -> Result<OverloadedOptions, ThemeError> {
    let LoaderOptions {
        scss_theme_path,
        style,
        load_paths,
        importer,
    } = options.clone();

    let path = theme_path(options)?;
    let contents = theme_compiler.compile_theme(&path, &load_paths).await?;
    let theme_importer = ThemeImporter::new(path, contents, resolve.alias.clone());

    let importer = ImporterChain::with_last(importer, Arc::new(theme_importer));
    tracing::debug!(importers = importer.len(), "Attached theme importer");

    Ok(OverloadedOptions {
        scss_theme_path,
        style,
        load_paths,
        sass_options: SassOptions { importer },
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::importer::{AliasMap, Importer, Resolved};
    use crate::request::ImportRequest;

    #[derive(Debug, Default)]
    struct StaticTheme {
        calls: AtomicUsize,
        load_paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ThemeCompiler for StaticTheme {
        async fn compile_theme(&self, _theme_path: &Path, load_paths: &[PathBuf]) -> Result<String, ThemeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.load_paths.lock().unwrap() = load_paths.to_vec();
            Ok("$primary: red;\n".to_string())
        }
    }

    #[derive(Debug)]
    struct FailingTheme;

    #[async_trait]
    impl ThemeCompiler for FailingTheme {
        async fn compile_theme(&self, theme_path: &Path, _load_paths: &[PathBuf]) -> Result<String, ThemeError> {
            Err(ThemeError::Compile {
                path: theme_path.to_path_buf(),
                message: "Undefined variable.".to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct Named(&'static str);

    #[async_trait]
    impl Importer for Named {
        async fn resolve(&self, request: &ImportRequest) -> Option<Resolved> {
            (request.url == self.0).then(|| Resolved {
                contents: Arc::from(self.0),
            })
        }
    }

    fn options_with(importer: ImporterOption) -> LoaderOptions {
        LoaderOptions {
            scss_theme_path: Some(PathBuf::from("/abs/themes/vars.scss")),
            importer,
            ..Default::default()
        }
    }

    fn overload(options: &LoaderOptions) -> OverloadedOptions {
        pollster::block_on(overload_options(
            options,
            &ResolveOptions::default(),
            &StaticTheme::default(),
        ))
        .unwrap()
    }

    /// Which importer answers each request, in chain order.
    fn answers(chain: &ImporterChain, url: &str) -> Vec<Option<String>> {
        chain
            .iter()
            .map(|importer| {
                pollster::block_on(importer.resolve(&ImportRequest::new(url, "/abs")))
                    .map(|resolved| resolved.contents.to_string())
            })
            .collect()
    }

    #[test]
    fn test_no_importer_yields_theme_importer_only() {
        let result = overload(&options_with(ImporterOption::None));
        let chain = &result.sass_options.importer;
        assert_eq!(chain.len(), 1);
        assert_eq!(
            answers(chain, "/abs/themes/vars.scss"),
            vec![Some("$primary: red;\n".to_string())]
        );
    }

    #[test]
    fn test_single_importer_comes_first() {
        let hook_a: Arc<dyn Importer> = Arc::new(Named("a"));
        let result = overload(&options_with(ImporterOption::Single(hook_a)));
        let chain = &result.sass_options.importer;
        assert_eq!(chain.len(), 2);
        assert_eq!(answers(chain, "a"), vec![Some("a".to_string()), None]);
    }

    #[test]
    fn test_many_importers_keep_order() {
        let hook_a: Arc<dyn Importer> = Arc::new(Named("a"));
        let hook_b: Arc<dyn Importer> = Arc::new(Named("b"));
        let result = overload(&options_with(ImporterOption::Many(vec![hook_a, hook_b])));
        let chain = &result.sass_options.importer;
        assert_eq!(chain.len(), 3);
        assert_eq!(answers(chain, "b"), vec![None, Some("b".to_string()), None]);
        assert_eq!(
            answers(chain, "/abs/themes/vars.scss"),
            vec![None, None, Some("$primary: red;\n".to_string())]
        );
    }

    #[test]
    fn test_input_options_untouched() {
        let options = options_with(ImporterOption::Single(Arc::new(Named("a"))));
        let _ = overload(&options);
        assert!(matches!(options.importer, ImporterOption::Single(_)));
        assert_eq!(options.scss_theme_path, Some(PathBuf::from("/abs/themes/vars.scss")));
    }

    #[test]
    fn test_theme_compiled_once_per_call() {
        let theme = StaticTheme::default();
        let options = options_with(ImporterOption::None);
        for _ in 0..2 {
            pollster::block_on(overload_options(&options, &ResolveOptions::default(), &theme)).unwrap();
        }
        assert_eq!(theme.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_aliases_reach_theme_importer() {
        let resolve = ResolveOptions {
            alias: AliasMap::from([("@theme".to_string(), PathBuf::from("/abs/themes"))]),
        };
        let options = options_with(ImporterOption::None);
        let result =
            pollster::block_on(overload_options(&options, &resolve, &StaticTheme::default())).unwrap();
        let request = ImportRequest::new("@theme/vars", "/abs/app");
        assert!(pollster::block_on(result.sass_options.importer.resolve(&request)).is_some());
    }

    #[test]
    fn test_theme_compiled_with_loader_load_paths() {
        let theme = StaticTheme::default();
        let options = LoaderOptions {
            load_paths: vec![PathBuf::from("/abs/shared")],
            ..options_with(ImporterOption::None)
        };
        pollster::block_on(overload_options(&options, &ResolveOptions::default(), &theme)).unwrap();
        assert_eq!(*theme.load_paths.lock().unwrap(), vec![PathBuf::from("/abs/shared")]);
    }

    #[test]
    fn test_theme_failure_propagates() {
        let options = options_with(ImporterOption::None);
        let result = pollster::block_on(overload_options(&options, &ResolveOptions::default(), &FailingTheme));
        assert!(matches!(result, Err(ThemeError::Compile { .. })));
    }

    #[test]
    fn test_missing_theme_path_fails() {
        let result = pollster::block_on(overload_options(
            &LoaderOptions::default(),
            &ResolveOptions::default(),
            &StaticTheme::default(),
        ));
        assert!(matches!(result, Err(ThemeError::MissingThemePath)));
    }

    #[test]
    fn test_compiler_options_drop_theme_path() {
        let result = overload(&LoaderOptions {
            style: OutputStyle::Compressed,
            load_paths: vec![PathBuf::from("/abs/shared")],
            ..options_with(ImporterOption::None)
        });
        assert!(result.scss_theme_path.is_some());

        let compiler_options = result.into_compiler_options();
        assert_eq!(compiler_options.style, OutputStyle::Compressed);
        assert_eq!(compiler_options.load_paths, vec![PathBuf::from("/abs/shared")]);
        assert_eq!(compiler_options.sass_options.importer.len(), 1);
    }

    #[test]
    fn test_deserialize_both_spellings() {
        let kebab: LoaderOptions =
            serde_json::from_str(r#"{"scss-theme-path": "/t.scss", "style": "compressed"}"#).unwrap();
        assert_eq!(kebab.scss_theme_path, Some(PathBuf::from("/t.scss")));
        assert_eq!(kebab.style, OutputStyle::Compressed);

        let camel: LoaderOptions =
            serde_json::from_str(r#"{"scssThemePath": "/t.scss", "loadPaths": ["/lib"]}"#).unwrap();
        assert_eq!(camel.scss_theme_path, Some(PathBuf::from("/t.scss")));
        assert_eq!(camel.load_paths, vec![PathBuf::from("/lib")]);
        assert!(matches!(camel.importer, ImporterOption::None));
    }
}
