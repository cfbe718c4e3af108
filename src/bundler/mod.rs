//! The bundling pipeline.
//!
//! One [`Bundler`] instance owns the resolved paths, the download client and
//! the cancellation token, and processes environments strictly sequentially:
//! all environments share a single vendor directory that is destroyed and
//! rebuilt per iteration, so parallel builds would corrupt each other. The
//! first environment to fail aborts the whole run; earlier fully-finished
//! environments are left intact.

pub mod cancel;
pub mod compile;
pub mod embed;
pub mod finish;
pub mod paths;
pub mod utils;
pub mod vendor;

use regex::Regex;

use crate::config::{Configuration, Environment, TargetOs};
use crate::error::{Result, ResultExt};

use cancel::CancelToken;
use compile::CompileDriver;
use embed::EmbedInvoker;
use finish::PlatformFinisher;
use paths::BundlerPaths;
use vendor::VendorProvisioner;

/// Bundles a webshell app for a list of target environments.
pub struct Bundler {
    app_name: String,
    environments: Vec<Environment>,
    environment_filter: Option<Regex>,
    go_binary: String,
    bind_package: String,
    bind_tags: String,
    paths: BundlerPaths,
    client: reqwest::Client,
    cancel: CancelToken,
}

impl Bundler {
    /// Builds a new bundler from a configuration, validating every
    /// environment's OS against the supported set before any I/O.
    pub fn new(config: &Configuration) -> Result<Self> {
        for env in &config.environments {
            env.target_os()?;
        }

        let environment_filter = config
            .environment_filter
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        let go_binary = config
            .go_binary_path
            .clone()
            .unwrap_or_else(|| "go".to_string());
        let bind_package = config
            .bind_package
            .clone()
            .unwrap_or_else(|| "main".to_string());

        Ok(Self {
            app_name: config.app_name.clone(),
            environments: config.environments.clone(),
            environment_filter,
            go_binary,
            bind_package,
            bind_tags: config.bind_tags.clone().unwrap_or_default(),
            paths: BundlerPaths::from_config(config)?,
            client: reqwest::Client::new(),
            cancel: CancelToken::new(),
        })
    }

    /// A clone of the cancellation token, for the signal watcher.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Trips the cancellation token. In-flight system calls are not
    /// interrupted; the pipeline stops at its next checkpoint.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn paths(&self) -> &BundlerPaths {
        &self.paths
    }

    /// Deletes the whole vendor cache. Subsequent provisioning performs
    /// fresh fetches for every key.
    pub async fn clear_cache(&self) -> Result<()> {
        log::debug!("Removing {}", self.paths.cache.display());
        utils::fs::remove_dir_all(&self.paths.cache).await
    }

    /// Produces full bundles for all selected environments, in configured
    /// order, stopping at the first failure.
    pub async fn bundle(&self) -> Result<()> {
        log::debug!("Resetting");
        self.reset().await.context("resetting bundler")?;

        for env in &self.environments {
            if let Some(filter) = &self.environment_filter {
                if !filter.is_match(&env.dir_name()) {
                    continue;
                }
            }

            log::debug!("Bundling for environment {}/{}", env.os, env.arch);
            self.bundle_environment(env)
                .await
                .map_err(|e| e.for_environment(&env.os, &env.arch))?;
        }
        Ok(())
    }

    /// Provisions the vendor directory and generates the embedded data
    /// source for one OS/arch. Exposed separately so local development can
    /// iterate on the host's native environment without a full cross-build.
    pub async fn bind_data(&self, os: TargetOs, arch: &str) -> Result<()> {
        let provisioner = VendorProvisioner::new(&self.paths, &self.client, &self.cancel);
        provisioner
            .provision(os, arch)
            .await
            .context("provisioning the vendor")?;

        let invoker = EmbedInvoker::new(&self.paths, &self.bind_package, &self.bind_tags);
        invoker.embed(os).await
    }

    /// Ensures the cache and output roots exist. They are created, never
    /// cleared, on every run.
    async fn reset(&self) -> Result<()> {
        for path in [&self.paths.cache, &self.paths.output] {
            log::debug!("Creating {}", path.display());
            utils::fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    /// Runs the full pipeline for one environment: output directory reset,
    /// data binding, compilation, finishing.
    async fn bundle_environment(&self, env: &Environment) -> Result<()> {
        let os = env.target_os()?;
        let environment_path = self.paths.output.join(env.dir_name());

        log::debug!("Removing {}", environment_path.display());
        utils::fs::remove_dir_all(&environment_path).await?;
        self.cancel.check()?;

        log::debug!("Creating {}", environment_path.display());
        utils::fs::create_dir_all(&environment_path).await?;
        self.cancel.check()?;

        log::debug!("Binding data");
        self.bind_data(os, &env.arch)
            .await
            .context("binding data")?;

        let driver = CompileDriver::new(&self.paths, &self.go_binary, &self.bind_package);
        let binary_path = driver.compile(env, os, &environment_path).await?;
        self.cancel.check()?;

        let finisher = PlatformFinisher::new(
            &self.app_name,
            self.paths.icon_darwin.as_deref(),
            &self.cancel,
        );
        finisher.finish(os, &environment_path, &binary_path).await
    }
}
