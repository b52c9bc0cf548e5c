//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::watcher::BackendId;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Development-mode hot-reload coordinator
#[derive(Parser)]
#[command(
    name = "devreload",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch sources, track reload generations and map generated positions",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up .devreload directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Watch directories and print changes until Ctrl+C
    #[command(
        after_help = "Examples:\n  devreload watch\n  devreload watch app conf --backend polling --interval 250"
    )]
    Watch {
        /// Directories to watch (defaults to watcher.targets)
        #[arg(value_name = "DIR")]
        dirs: Vec<PathBuf>,

        /// Watcher backend: polling, native or notifier (overrides config)
        #[arg(short, long)]
        backend: Option<BackendId>,

        /// Polling interval in milliseconds (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Map a position in a generated file back to its original source
    #[command(
        after_help = "Examples:\n  devreload map target/scala-2.13/twirl/main/views/html/index.template.scala --line 42\n  devreload map target/routes/main/router/Routes.scala --line 120"
    )]
    Map {
        /// Generated file
        generated: PathBuf,

        /// 1-based line in the generated file
        #[arg(short, long)]
        line: usize,

        /// Byte offset in the generated file (templates only)
        #[arg(short, long)]
        offset: Option<usize>,
    },
}
