//! Error types for the theme loader.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or precompiling the theme file.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// No theme path was given in the loader options
    #[error("path to an SCSS theme file must be specified (scss-theme-path)")]
    MissingThemePath,

    /// The theme path could not be made absolute
    #[error("could not resolve theme path {}: {source}", .path.display())]
    InvalidThemePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The theme file could not be read
    #[error("failed to read SCSS theme file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Evaluating the theme variables failed
    #[error("failed to compile theme variables from {}: {message}", .path.display())]
    Compile { path: PathBuf, message: String },
}

/// Errors raised by the underlying style compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    /// SASS compilation failed
    #[error("SASS compilation failed for {}: {message}", .resource.display())]
    Sass { resource: PathBuf, message: String },

    /// Loader input was not valid UTF-8 or otherwise unusable
    #[error("invalid stylesheet input: {0}")]
    Input(String),
}

/// Errors reported through the loader's completion handle.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Preparing the compiler options failed. Only the message survives;
    /// the underlying error chain is dropped before reporting.
    #[error("{message}")]
    Overload { message: String },

    /// The underlying compiler failed; forwarded as-is
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The configuration file could not be loaded
    #[error("invalid loader configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// The loader task went away without signalling completion
    #[error("loader finished without reporting a result")]
    Cancelled,
}

impl LoaderError {
    /// Flatten any error into an [`LoaderError::Overload`], discarding its
    /// source chain so only the top-level message is presented.
    pub fn without_trace(error: impl std::error::Error) -> Self {
        LoaderError::Overload {
            message: error.to_string(),
        }
    }
}
