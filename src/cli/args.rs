//! Command line argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-platform bundler for webshell desktop applications
#[derive(Parser, Debug)]
#[command(
    name = "webshell-bundler",
    version,
    about = "Cross-platform bundler for webshell desktop applications",
    long_about = "Packages a Go-backed webshell application into OS-native bundles.

Reads bundler.json from the working directory (or the path given with -c),
provisions the webshell framework and electron runtime into the project's
vendor directory, embeds resources and vendor payloads into the source tree,
cross-compiles the backend and assembles one bundle per selected environment."
)]
pub struct Args {
    /// Configuration path, defaults to ./bundler.json
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub configuration_path: Option<PathBuf>,

    /// Local webshell framework checkout to bundle instead of the released
    /// archive (debug only)
    #[arg(short = 'a', long = "framework", value_name = "PATH")]
    pub framework_path: Option<PathBuf>,

    /// Add darwin/amd64 to the environments
    #[arg(short = 'd', long)]
    pub darwin: bool,

    /// Add linux/amd64 to the environments
    #[arg(short = 'l', long)]
    pub linux: bool,

    /// Add windows/amd64 to the environments
    #[arg(short = 'w', long)]
    pub windows: bool,

    /// Only build environments whose name matches this pattern
    #[arg(short = 'e', long = "filter", value_name = "PATTERN")]
    pub environment_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the vendor directory and generate the embedded data source
    /// for the host OS/arch, without building bundles
    Bind,
    /// Delete the vendor cache
    ClearCache,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
