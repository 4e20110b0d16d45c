//! sass-theme CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sass-theme")]
#[command(version)]
#[command(about = "Compile SCSS with shared theme variables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    Expanded,
    Compressed,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a stylesheet with the theme importer installed
    Compile {
        /// Stylesheet to compile
        input: PathBuf,

        /// Configuration file (defaults to the nearest sass-theme.toml)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// SCSS theme file whose variables are shared
        #[arg(short = 't', long)]
        theme: Option<PathBuf>,

        /// Resolve alias (NAME=PATH)
        #[arg(short = 'a', long)]
        alias: Vec<String>,

        /// Additional directory searched for imports
        #[arg(short = 'I', long)]
        load_path: Vec<PathBuf>,

        /// CSS output style
        #[arg(long, value_enum)]
        style: Option<Style>,

        /// Write CSS to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Print the precompiled variables of a theme file
    Vars {
        /// SCSS theme file
        theme: PathBuf,

        /// Additional directory searched for imports
        #[arg(short = 'I', long)]
        load_path: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sass_theme=info,sass_theme_loader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            config,
            theme,
            alias,
            load_path,
            style,
            output,
        } => {
            commands::compile::execute(commands::compile::CompileArgs {
                input,
                config,
                theme,
                aliases: alias,
                load_paths: load_path,
                compressed: style.map(|style| matches!(style, Style::Compressed)),
                output,
            })
            .await
        }
        Commands::Vars { theme, load_path } => commands::vars::execute(theme, load_path).await,
    }
}
