//! Loader entry point.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Wraps the underlying style compiler: precompiles the theme, installs the
//! theme importer, registers the theme file as a build dependency and
//! delegates to the compiler with the adjusted options.

use std::sync::Arc;

use crate::compiler::{GrassCompiler, StyleCompiler};
use crate::context::{LoaderContext, LoaderInput, LoaderResult};
use crate::error::LoaderError;
use crate::options::overload_options;
use crate::theme::{ScssThemeCompiler, ThemeCompiler, theme_path};

/// The collaborators a loader invocation delegates to.
#[derive(Debug, Clone)]
pub struct LoaderServices {
    pub compiler: Arc<dyn StyleCompiler>,
    pub theme_compiler: Arc<dyn ThemeCompiler>,
}

impl LoaderServices {
    pub fn new(compiler: Arc<dyn StyleCompiler>, theme_compiler: Arc<dyn ThemeCompiler>) -> Self {
        Self {
            compiler,
            theme_compiler,
        }
    }
}

impl Default for LoaderServices {
    fn default() -> Self {
        Self {
            compiler: Arc::new(GrassCompiler::new()),
            theme_compiler: Arc::new(ScssThemeCompiler::new()),
        }
    }
}

/// Run the loader for one stylesheet and report through the context's
/// completion handle.
///
/// Failures while preparing options are reported without their source
/// chain; compiler failures are forwarded unchanged. If the completion
/// handle was already taken the loader does nothing.
pub async fn theme_sass_loader(context: &mut LoaderContext, input: LoaderInput, services: &LoaderServices) {
    let Some(callback) = context.async_callback() else {
        tracing::error!(
            resource = %context.resource_path().display(),
            "Completion handle already taken, skipping loader invocation"
        );
        return;
    };

    let result = run_loader(context, input, services).await;
    callback.complete(result);
}

/// Same as [`theme_sass_loader`] but returns the result directly.
pub async fn run_loader(context: &LoaderContext, input: LoaderInput, services: &LoaderServices) -> LoaderResult {
    let options = context.options();
    let mut downstream = context.downstream();

    let overloaded = overload_options(options, context.resolve(), services.theme_compiler.as_ref())
        .await
        .map_err(|e| {
            tracing::debug!(resource = %context.resource_path().display(), error = %e, "Theme setup failed");
            LoaderError::without_trace(e)
        })?;

    downstream.set_options(overloaded.into_compiler_options());

    let dependency = theme_path(options).map_err(LoaderError::without_trace)?;
    downstream.add_dependency(dependency);

    let output = services.compiler.compile(&downstream, input).await?;
    tracing::info!(resource = %context.resource_path().display(), "Compiled stylesheet with theme variables");
    Ok(output)
}
