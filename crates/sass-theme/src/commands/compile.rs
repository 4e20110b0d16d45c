/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile command implementation
 */

//! Compile command implementation.
//!
//! Acts as a minimal loader host: builds the loader options from the
//! configuration file and flags, runs the theme loader on one stylesheet,
//! and writes the CSS.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use sass_theme_loader::{
    LoaderConfig, LoaderContext, LoaderInput, LoaderServices, OutputStyle, theme_sass_loader,
};

/// Arguments for the compile command
#[derive(Debug)]
pub struct CompileArgs {
    /// Stylesheet to compile
    pub input: PathBuf,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Theme file overriding the configuration
    pub theme: Option<PathBuf>,
    /// NAME=PATH alias entries
    pub aliases: Vec<String>,
    /// Extra load paths
    pub load_paths: Vec<PathBuf>,
    /// Output style override
    pub compressed: Option<bool>,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
}

/// Execute the compile command
pub async fn execute(args: CompileArgs) -> Result<()> {
    let input = std::path::absolute(&args.input)
        .with_context(|| format!("Failed to resolve input path {}", args.input.display()))?;
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let config = load_config(&args, &input)?;
    let LoaderConfig {
        loader: options,
        resolve,
    } = apply_overrides(config, &args)?;
    debug!(?options, ?resolve, "Loader configuration");

    let services = LoaderServices::default();
    let (mut context, completion) = LoaderContext::new(&input, options, resolve);
    theme_sass_loader(&mut context, LoaderInput::new(content), &services).await;
    let output = completion.wait().await?;

    for dependency in context.dependencies().to_vec() {
        info!(dependency = %dependency.display(), "Watching");
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, &output.css)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "Wrote CSS");
        }
        None => print!("{}", output.css),
    }

    Ok(())
}

fn load_config(args: &CompileArgs, input: &Path) -> Result<LoaderConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => input.parent().and_then(LoaderConfig::discover),
    };

    match path {
        Some(path) => {
            debug!(config = %path.display(), "Loading configuration");
            Ok(LoaderConfig::load(&path)?)
        }
        None => Ok(LoaderConfig::default()),
    }
}

fn apply_overrides(mut config: LoaderConfig, args: &CompileArgs) -> Result<LoaderConfig> {
    if let Some(theme) = &args.theme {
        config.loader.scss_theme_path = Some(
            std::path::absolute(theme)
                .with_context(|| format!("Failed to resolve theme path {}", theme.display()))?,
        );
    }

    for entry in &args.aliases {
        let (name, target) = parse_alias(entry)?;
        config.resolve.alias.insert(name, target);
    }

    for load_path in &args.load_paths {
        config.loader.load_paths.push(
            std::path::absolute(load_path)
                .with_context(|| format!("Failed to resolve load path {}", load_path.display()))?,
        );
    }

    if let Some(compressed) = args.compressed {
        config.loader.style = if compressed {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };
    }

    Ok(config)
}

/// Parse a `NAME=PATH` alias argument.
fn parse_alias(entry: &str) -> Result<(String, PathBuf)> {
    let (name, target) = entry
        .split_once('=')
        .filter(|(name, target)| !name.is_empty() && !target.is_empty())
        .with_context(|| format!("Invalid alias '{entry}', expected NAME=PATH"))?;
    let target = std::path::absolute(target)
        .with_context(|| format!("Failed to resolve alias target {target}"))?;
    Ok((name.to_string(), target))
}
