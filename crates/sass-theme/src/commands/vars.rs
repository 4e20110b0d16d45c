//! Vars command implementation.
//!
//! Prints the precompiled variables exactly as the theme importer serves them.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sass_theme_loader::{LoaderOptions, ScssThemeCompiler, ThemeCompiler, theme_path};

/// Execute the vars command
pub async fn execute(theme: PathBuf, load_paths: Vec<PathBuf>) -> Result<()> {
    let options = LoaderOptions {
        scss_theme_path: Some(theme),
        ..Default::default()
    };
    let path = theme_path(&options)?;

    let contents = ScssThemeCompiler::new()
        .compile_theme(&path, &load_paths)
        .await
        .with_context(|| format!("Failed to compile theme {}", path.display()))?;

    print!("{contents}");
    Ok(())
}
