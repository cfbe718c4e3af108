//! Command line interface.
//!
//! Resolves the configuration (file plus flag overrides) before the bundler
//! is constructed, wires up signal handling, then dispatches to one of the
//! orchestrator entry points.

mod args;

pub use args::{Args, Command};

use crate::bundler::{cancel, Bundler};
use crate::config::{host_arch, Configuration, Environment, TargetOs};
use crate::error::{Result, ResultExt};

/// Main CLI entry point.
pub async fn run() -> Result<()> {
    let args = Args::parse_args();
    let config = load_configuration(&args)?;

    let bundler = Bundler::new(&config).context("building bundler")?;
    cancel::spawn_signal_handler(bundler.cancel_token());

    match args.command {
        Some(Command::Bind) => bundler
            .bind_data(TargetOs::host()?, host_arch())
            .await
            .context("binding data"),
        Some(Command::ClearCache) => bundler.clear_cache().await.context("clearing cache"),
        None => bundler.bundle().await.context("bundling"),
    }
}

/// Loads `bundler.json` and applies the flag overrides. When no environment
/// is selected at all, the host OS/arch is bundled.
fn load_configuration(args: &Args) -> Result<Configuration> {
    let path = match &args.configuration_path {
        Some(p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|source| crate::error::Error::Fs {
                operation: "getting working directory",
                path: std::path::PathBuf::from("."),
                source,
            })?
            .join("bundler.json"),
    };
    let mut config = Configuration::from_file(&path)?;

    if let Some(framework) = &args.framework_path {
        config.framework_path = Some(framework.to_string_lossy().into_owned());
    }
    if args.darwin {
        config.environments.push(Environment::new("darwin", "amd64"));
    }
    if args.linux {
        config.environments.push(Environment::new("linux", "amd64"));
    }
    if args.windows {
        config
            .environments
            .push(Environment::new("windows", "amd64"));
    }
    if config.environments.is_empty() {
        config
            .environments
            .push(Environment::new(&TargetOs::host()?.to_string(), host_arch()));
    }
    if let Some(filter) = &args.environment_filter {
        config.environment_filter = Some(filter.clone());
    }
    Ok(config)
}
