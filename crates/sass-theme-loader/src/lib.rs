//! SCSS loader that serves precompiled theme variables.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - A theme importer that answers imports of the theme file with its
//!   precompiled variables, directly or through a resolve alias
//! - Option overloading that appends the theme importer to caller importers
//! - The loader entry point, which also registers the theme file as a
//!   build dependency
//! - A grass-backed style compiler that honours importer chains

mod compiler;
mod config;
mod context;
mod error;
mod importer;
mod loader;
mod options;
mod request;
mod theme;

pub use compiler::{GrassCompiler, ImporterFs, StyleCompiler};
pub use config::{CONFIG_FILE_NAME, LoaderConfig};
pub use context::{
    AsyncCallback, Completion, CompilerContext, Dependencies, LoaderContext, LoaderInput,
    LoaderOutput, LoaderResult, ResolveOptions,
};
pub use error::{CompileError, LoaderError, ThemeError};
pub use importer::{AliasMap, Importer, ImporterChain, ImporterOption, Resolved, ThemeImporter};
pub use loader::{LoaderServices, run_loader, theme_sass_loader};
pub use options::{
    CompilerOptions, LoaderOptions, OutputStyle, OverloadedOptions, SassOptions, overload_options,
};
pub use request::{
    ImportRequest, import_urls, imports_to_resolve, normalize_path, resolve_path, url_to_request,
};
pub use theme::{ScssThemeCompiler, ThemeCompiler, theme_path, top_level_variables};
