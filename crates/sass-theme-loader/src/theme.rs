//! Theme file lookup and variable precompilation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The theme file is evaluated once per loader invocation. Every top-level
//! `$variable` it declares is evaluated by the SASS compiler and written out
//! as a flat declaration, so the result can be served to any stylesheet
//! without the theme's own imports or functions:
//!
//! ```text
//! // theme.scss                      // precompiled contents
//! @import "palette";                 $primary-color: #1890ff;
//! $primary-color: $blue-6;           $link-color: #1890ff;
//! $link-color: $primary-color;
//! ```

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use grass::{Options, OutputStyle};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::ImporterFs;
use crate::error::ThemeError;
use crate::importer::ImporterChain;
use crate::options::LoaderOptions;
use crate::request::normalize_path;

/// A variable declaration at the start of a statement, capturing its name.
static VARIABLE_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\$([A-Za-z_][A-Za-z0-9_-]*)\s*:").unwrap());

/// Block and line comments.
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|(?m)//[^\n]*$").unwrap());

/// Selector of the rule used to read evaluated values back out of the CSS.
const PROBE_SELECTOR: &str = ".sass-theme-loader-variables";

/// Property name prefix inside the probe rule.
const PROBE_PROPERTY: &str = "theme-var-";

/// Locate the theme file named by the loader options.
///
/// The returned path is absolute and lexically normalized, so it can be
/// compared directly against resolved import candidates.
pub fn theme_path(options: &LoaderOptions) -> Result<PathBuf, ThemeError> {
    let raw = options
        .scss_theme_path
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(ThemeError::MissingThemePath)?;

    let absolute = std::path::absolute(raw).map_err(|source| ThemeError::InvalidThemePath {
        path: raw.to_path_buf(),
        source,
    })?;
    Ok(normalize_path(&absolute))
}

/// Produces the precompiled contents of a theme file.
///
/// `load_paths` are the directories the stylesheet itself is compiled
/// with, so the theme's own imports see the same search path.
#[async_trait]
pub trait ThemeCompiler: Debug + Send + Sync {
    async fn compile_theme(&self, theme_path: &Path, load_paths: &[PathBuf]) -> Result<String, ThemeError>;
}

/// Evaluates a theme's top-level variables with grass.
///
/// The theme's own directory is searched before the load paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScssThemeCompiler;

impl ScssThemeCompiler {
    pub fn new() -> Self {
        Self
    }

    fn compile_source(
        &self,
        theme_path: &Path,
        source: &str,
        load_paths: &[PathBuf],
    ) -> Result<String, ThemeError> {
        let names = top_level_variables(source);
        if names.is_empty() {
            tracing::warn!(theme = %theme_path.display(), "Theme file declares no top-level variables");
            return Ok(String::new());
        }

        let mut search = Vec::with_capacity(load_paths.len() + 1);
        if let Some(dir) = theme_path.parent() {
            search.push(dir.to_path_buf());
        }
        search.extend(load_paths.iter().cloned());

        // Compiled as if read from the theme path so its relative imports
        // resolve next to it.
        let importers = ImporterChain::default();
        let fs = ImporterFs::new(&importers);
        fs.insert(theme_path, probe_stylesheet(source, &names));
        let options = Options::default()
            .fs(&fs)
            .load_paths(&search)
            .style(OutputStyle::Expanded);
        let css = grass::from_path(theme_path, &options).map_err(|e| ThemeError::Compile {
            path: theme_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let values = probe_values(&css, names.len());
        let mut contents = String::new();
        for (name, value) in names.iter().zip(values) {
            match value {
                Some(value) => {
                    contents.push_str(&format!("${name}: {value};\n"));
                }
                None => {
                    tracing::debug!(variable = %name, "Theme variable produced no value, skipping");
                }
            }
        }

        tracing::debug!(theme = %theme_path.display(), variables = names.len(), "Compiled theme variables");
        Ok(contents)
    }
}

#[async_trait]
impl ThemeCompiler for ScssThemeCompiler {
    async fn compile_theme(&self, theme_path: &Path, load_paths: &[PathBuf]) -> Result<String, ThemeError> {
        let source = std::fs::read_to_string(theme_path).map_err(|source| ThemeError::Read {
            path: theme_path.to_path_buf(),
            source,
        })?;
        self.compile_source(theme_path, &source, load_paths)
    }
}

/// Names of the variables declared outside any block, in first-seen order.
pub fn top_level_variables(source: &str) -> Vec<String> {
    let stripped = COMMENT.replace_all(source, "");
    let mut names: Vec<String> = Vec::new();
    let mut depth = 0usize;

    for line in stripped.lines() {
        if depth == 0 {
            if let Some(captures) = VARIABLE_DECLARATION.captures(line) {
                let name = &captures[1];
                if !names.iter().any(|existing| existing == name) {
                    names.push(name.to_string());
                }
            }
        }
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    names
}

/// The theme source followed by a rule that prints each variable.
fn probe_stylesheet(source: &str, names: &[String]) -> String {
    let mut probe = String::with_capacity(source.len() + names.len() * 48);
    probe.push_str(source);
    probe.push_str("\n\n");
    probe.push_str(PROBE_SELECTOR);
    probe.push_str(" {\n");
    for (index, name) in names.iter().enumerate() {
        probe.push_str(&format!("  {PROBE_PROPERTY}{index}: inspect(${name});\n"));
    }
    probe.push_str("}\n");
    probe
}

/// Read the probe properties back out of compiled CSS, indexed by variable.
fn probe_values(css: &str, count: usize) -> Vec<Option<String>> {
    let mut values = vec![None; count];
    let Some(start) = css.find(PROBE_SELECTOR) else {
        return values;
    };

    for line in css[start..].lines().skip(1) {
        let line = line.trim();
        if line.starts_with('}') {
            break;
        }
        let Some(rest) = line.strip_prefix(PROBE_PROPERTY) else {
            continue;
        };
        let Some((index, value)) = rest.split_once(':') else {
            continue;
        };
        let Ok(index) = index.trim().parse::<usize>() else {
            continue;
        };
        if let Some(slot) = values.get_mut(index) {
            *slot = Some(value.trim().trim_end_matches(';').trim_end().to_string());
        }
    }

    values
}
