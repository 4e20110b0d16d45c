//! Loader configuration file.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! ```toml
//! [loader]
//! scss-theme-path = "theme/vars.scss"
//! style = "expanded"
//! load-paths = ["styles"]
//!
//! [resolve.alias]
//! "@theme" = "theme"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::context::ResolveOptions;
use crate::error::LoaderError;
use crate::options::LoaderOptions;
use crate::request::resolve_path;

/// Conventional configuration file name.
pub const CONFIG_FILE_NAME: &str = "sass-theme.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    #[serde(default)]
    pub loader: LoaderOptions,
    #[serde(default)]
    pub resolve: ResolveOptions,
}

impl LoaderConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, LoaderError> {
        let text = std::fs::read_to_string(path).map_err(|e| LoaderError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base_dir).map_err(|message| LoaderError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse configuration text, resolving relative paths against `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, String> {
        let mut config: LoaderConfig = toml::from_str(text).map_err(|e| e.to_string())?;
        config.rebase(base_dir);
        Ok(config)
    }

    /// Look for [`CONFIG_FILE_NAME`] in `start` and its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    fn rebase(&mut self, base_dir: &Path) {
        if let Some(theme) = self.loader.scss_theme_path.take() {
            self.loader.scss_theme_path = Some(resolve_path(base_dir, theme));
        }
        for load_path in &mut self.loader.load_paths {
            *load_path = resolve_path(base_dir, &*load_path);
        }
        for target in self.resolve.alias.values_mut() {
            *target = resolve_path(base_dir, &*target);
        }
    }
}
