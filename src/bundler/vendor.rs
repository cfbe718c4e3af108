//! Vendor payload provisioning.
//!
//! Guarantees that, immediately before a build, the vendor directory contains
//! exactly two items: the webshell framework archive and the current
//! environment's electron archive. The directory is destroyed and rebuilt per
//! environment rather than reconciled incrementally, so nothing stale from a
//! prior environment can leak into the embedded data.
//!
//! Downloaded archives are cached on disk keyed by artifact, version and,
//! for electron, OS and architecture. A correctly named cache file is trusted
//! unconditionally; staleness is only fixed by clearing the cache.

use std::path::Path;

use crate::bundler::cancel::CancelToken;
use crate::bundler::paths::{BundlerPaths, VENDOR_FRAMEWORK_ZIP, VENDOR_WEBVIEW_ZIP};
use crate::bundler::utils::{archive, fs, http};
use crate::config::TargetOs;
use crate::error::{Result, ResultExt};

/// Version of the bundled webshell framework.
pub const FRAMEWORK_VERSION: &str = "0.30.1";
/// Version of the bundled electron runtime.
pub const WEBVIEW_VERSION: &str = "11.10.2";

/// Canonical download source of the framework archive. Platform-independent.
pub fn framework_download_url() -> String {
    format!("https://github.com/webshell/webshell/archive/v{FRAMEWORK_VERSION}.zip")
}

/// Canonical download source of the electron archive for one OS/arch, using
/// electron's own platform naming.
pub fn webview_download_url(os: TargetOs, arch: &str) -> String {
    let os = match os {
        TargetOs::Darwin => "darwin",
        TargetOs::Linux => "linux",
        TargetOs::Windows => "win32",
    };
    let arch = match arch {
        "386" => "ia32",
        "amd64" => "x64",
        "arm" => "armv7l",
        other => other,
    };
    format!(
        "https://github.com/electron/electron/releases/download/v{WEBVIEW_VERSION}/electron-v{WEBVIEW_VERSION}-{os}-{arch}.zip"
    )
}

/// Cache file name of the framework archive.
pub fn framework_cache_name() -> String {
    format!("webshell-{FRAMEWORK_VERSION}.zip")
}

/// Cache file name of the electron archive for one OS/arch.
pub fn webview_cache_name(os: TargetOs, arch: &str) -> String {
    format!("electron-{os}-{arch}-{WEBVIEW_VERSION}.zip")
}

/// Materializes vendor payloads into the vendor directory, downloading into
/// the cache on first need.
pub struct VendorProvisioner<'a> {
    paths: &'a BundlerPaths,
    client: &'a reqwest::Client,
    cancel: &'a CancelToken,
}

impl<'a> VendorProvisioner<'a> {
    pub fn new(
        paths: &'a BundlerPaths,
        client: &'a reqwest::Client,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            paths,
            client,
            cancel,
        }
    }

    /// Rebuilds the vendor directory for one environment.
    pub async fn provision(&self, os: TargetOs, arch: &str) -> Result<()> {
        self.cancel.check()?;

        log::debug!("Removing {}", self.paths.vendor.display());
        fs::remove_dir_all(&self.paths.vendor).await?;
        self.cancel.check()?;

        log::debug!("Creating {}", self.paths.vendor.display());
        fs::create_dir_all(&self.paths.vendor).await?;
        self.cancel.check()?;

        self.provision_framework()
            .await
            .context("provisioning webshell vendor")?;

        self.provision_webview(os, arch)
            .await
            .context(format!(
                "provisioning electron vendor for OS {os} and arch {arch}"
            ))
    }

    /// Provisions the platform-independent framework archive. A configured
    /// local checkout is zipped into the cache entry first; the entry then
    /// shadows the canonical download.
    async fn provision_framework(&self) -> Result<()> {
        let cache_path = self.paths.cache.join(framework_cache_name());
        if let Some(checkout) = &self.paths.framework_override {
            log::debug!(
                "Zipping {} into {}",
                checkout.display(),
                cache_path.display()
            );
            let root = format!("webshell-{FRAMEWORK_VERSION}");
            archive::zip_dir(checkout, &cache_path, &root).await?;
            self.cancel.check()?;
        }
        self.provision_zip(
            &framework_download_url(),
            &cache_path,
            &self.paths.vendor.join(VENDOR_FRAMEWORK_ZIP),
        )
        .await
    }

    /// Provisions the platform-specific electron archive.
    async fn provision_webview(&self, os: TargetOs, arch: &str) -> Result<()> {
        self.provision_zip(
            &webview_download_url(os, arch),
            &self.paths.cache.join(webview_cache_name(os, arch)),
            &self.paths.vendor.join(VENDOR_WEBVIEW_ZIP),
        )
        .await
    }

    /// Resolve-or-fetch: downloads into the cache only when the entry is
    /// missing, then copies (never moves) the entry into the vendor
    /// directory so it survives for later environments and runs.
    async fn provision_zip(&self, url: &str, cache: &Path, vendor: &Path) -> Result<()> {
        if !cache.exists() {
            http::download(self.client, url, cache).await?;
        } else {
            log::debug!(
                "{} already exists, skipping download of {url}",
                cache.display()
            );
        }
        self.cancel.check()?;

        log::debug!("Copying {} to {}", cache.display(), vendor.display());
        fs::copy_file(cache, vendor).await?;
        self.cancel.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn paths_for(dir: &Path) -> BundlerPaths {
        let config = Configuration {
            input_path: Some(dir.join("project").to_string_lossy().into_owned()),
            output_path: Some(dir.join("out").to_string_lossy().into_owned()),
            cache_path: Some(dir.join("cache").to_string_lossy().into_owned()),
            ..Default::default()
        };
        BundlerPaths::from_config(&config).unwrap()
    }

    fn seed_cache(paths: &BundlerPaths, name: &str, contents: &[u8]) {
        std::fs::create_dir_all(&paths.cache).unwrap();
        std::fs::write(paths.cache.join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn provisioning_reuses_cache_entries_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_for(dir.path());
        // Seeded cache entries mean any network access would be a bug: the
        // download URLs are unreachable from the test.
        seed_cache(&paths, &framework_cache_name(), b"framework-bytes");
        seed_cache(
            &paths,
            &webview_cache_name(TargetOs::Linux, "amd64"),
            b"electron-linux-bytes",
        );

        let client = reqwest::Client::new();
        let cancel = CancelToken::new();
        let provisioner = VendorProvisioner::new(&paths, &client, &cancel);

        provisioner.provision(TargetOs::Linux, "amd64").await.unwrap();
        let first: Vec<u8> =
            std::fs::read(paths.vendor.join(VENDOR_WEBVIEW_ZIP)).unwrap();

        // Idempotent: a second provisioning still performs zero fetches and
        // produces a byte-identical vendor directory.
        provisioner.provision(TargetOs::Linux, "amd64").await.unwrap();
        assert_eq!(
            std::fs::read(paths.vendor.join(VENDOR_FRAMEWORK_ZIP)).unwrap(),
            b"framework-bytes"
        );
        assert_eq!(
            std::fs::read(paths.vendor.join(VENDOR_WEBVIEW_ZIP)).unwrap(),
            first
        );
    }

    #[tokio::test]
    async fn vendor_directory_is_fully_replaced_per_environment() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_for(dir.path());
        seed_cache(&paths, &framework_cache_name(), b"framework-bytes");
        seed_cache(
            &paths,
            &webview_cache_name(TargetOs::Linux, "amd64"),
            b"electron-linux",
        );
        seed_cache(
            &paths,
            &webview_cache_name(TargetOs::Windows, "amd64"),
            b"electron-windows",
        );

        let client = reqwest::Client::new();
        let cancel = CancelToken::new();
        let provisioner = VendorProvisioner::new(&paths, &client, &cancel);

        provisioner.provision(TargetOs::Linux, "amd64").await.unwrap();
        // A marker simulating stale state from the previous environment.
        std::fs::write(paths.vendor.join("stale"), b"x").unwrap();

        provisioner
            .provision(TargetOs::Windows, "amd64")
            .await
            .unwrap();

        assert!(!paths.vendor.join("stale").exists());
        assert_eq!(
            std::fs::read(paths.vendor.join(VENDOR_WEBVIEW_ZIP)).unwrap(),
            b"electron-windows"
        );
        let entries: Vec<_> = std::fs::read_dir(&paths.vendor)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn provisioning_a_local_framework_checkout_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = paths_for(dir.path());
        let checkout = dir.path().join("checkout");
        std::fs::create_dir_all(&checkout).unwrap();
        std::fs::write(checkout.join("index.js"), b"shell").unwrap();
        paths.framework_override = Some(checkout);

        seed_cache(
            &paths,
            &webview_cache_name(TargetOs::Darwin, "arm64"),
            b"electron-darwin",
        );

        let client = reqwest::Client::new();
        let cancel = CancelToken::new();
        let provisioner = VendorProvisioner::new(&paths, &client, &cancel);
        provisioner.provision(TargetOs::Darwin, "arm64").await.unwrap();

        assert!(paths.cache.join(framework_cache_name()).exists());
        assert!(paths.vendor.join(VENDOR_FRAMEWORK_ZIP).exists());
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_cancelled_not_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_for(dir.path());

        let client = reqwest::Client::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let provisioner = VendorProvisioner::new(&paths, &client, &cancel);
        let err = provisioner
            .provision(TargetOs::Linux, "amd64")
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn webview_url_uses_electron_platform_naming() {
        let url = webview_download_url(TargetOs::Windows, "amd64");
        assert!(url.contains("win32-x64"));
        let url = webview_download_url(TargetOs::Linux, "386");
        assert!(url.contains("linux-ia32"));
    }
}
