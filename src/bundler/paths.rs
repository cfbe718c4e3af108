//! Path resolution for the bundler.
//!
//! Every working path is derived once at construction from the configuration
//! record and process defaults, then shared by all environments of the run.
//! Only OS/arch/tags vary the build itself.

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::config::Configuration;
use crate::error::{Error, FsResultExt, Result};

/// The directory name of the platform-independent framework archive inside
/// the vendor directory.
pub const VENDOR_FRAMEWORK_ZIP: &str = "webshell.zip";
/// The directory name of the platform-specific webview archive inside the
/// vendor directory.
pub const VENDOR_WEBVIEW_ZIP: &str = "electron.zip";

/// Resolves a configured path: a set value is made absolute, otherwise the
/// default producer supplies the value, otherwise the path stays unset.
///
/// Callers must tolerate unset optional paths (icons); unset required paths
/// surface later as filesystem errors when first used.
pub fn resolve<F>(raw: Option<&str>, default_fn: Option<F>) -> Result<Option<PathBuf>>
where
    F: FnOnce() -> Result<PathBuf>,
{
    if let Some(raw) = raw.filter(|r| !r.is_empty()) {
        let abs = Path::new(raw)
            .absolutize()
            .fs_context("absolutizing", Path::new(raw))?;
        return Ok(Some(abs.into_owned()));
    }
    match default_fn {
        Some(f) => f().map(Some),
        None => Ok(None),
    }
}

/// The current working directory, as a default producer.
pub fn working_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| Error::Fs {
        operation: "getting working directory",
        path: PathBuf::from("."),
        source,
    })
}

/// The default vendor cache root: the user cache directory, or the system
/// temp directory when none is available.
pub fn default_cache_dir() -> Result<PathBuf> {
    let root = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    Ok(root.join("webshell-bundler"))
}

/// All resolved absolute working paths, computed once per run.
#[derive(Clone, Debug)]
pub struct BundlerPaths {
    /// Vendor archive cache root
    pub cache: PathBuf,
    /// Project directory
    pub input: PathBuf,
    /// Output root for finished bundles
    pub output: PathBuf,
    /// Where the generated bind source files are written
    pub bind_output: PathBuf,
    /// Go package path handed to the compiler, the input path stripped of the
    /// `$GOPATH/src` prefix
    pub build: PathBuf,
    /// `<input>/resources`, embedded into the binary
    pub resources: PathBuf,
    /// `<input>/vendor`, rebuilt per environment
    pub vendor: PathBuf,
    /// Optional icons, per OS
    pub icon_darwin: Option<PathBuf>,
    pub icon_linux: Option<PathBuf>,
    pub icon_windows: Option<PathBuf>,
    /// DEBUG ONLY: local framework checkout override
    pub framework_override: Option<PathBuf>,
}

impl BundlerPaths {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let cache = resolve(config.cache_path.as_deref(), Some(default_cache_dir))?
            .unwrap_or_default();
        let input =
            resolve(config.input_path.as_deref(), Some(working_dir))?.unwrap_or_default();
        let output =
            resolve(config.output_path.as_deref(), Some(working_dir))?.unwrap_or_default();

        let bind_output = match config.bind_output.as_deref() {
            Some(rel) if !rel.is_empty() => input.join(rel),
            _ => input.clone(),
        };

        let none = None::<fn() -> Result<PathBuf>>;
        let icon_darwin = resolve(config.icon_path_darwin.as_deref(), none)?;
        let icon_linux = resolve(config.icon_path_linux.as_deref(), none)?;
        let icon_windows = resolve(config.icon_path_windows.as_deref(), none)?;
        let framework_override = resolve(config.framework_path.as_deref(), none)?;

        Ok(Self {
            build: build_path(&input),
            resources: input.join("resources"),
            vendor: input.join("vendor"),
            cache,
            input,
            output,
            bind_output,
            icon_darwin,
            icon_linux,
            icon_windows,
            framework_override,
        })
    }
}

/// Strips the `$GOPATH/src` prefix from the input path, yielding the package
/// path the go toolchain expects.
fn build_path(input: &Path) -> PathBuf {
    if let Ok(gopath) = std::env::var("GOPATH") {
        let src_root = Path::new(&gopath).join("src");
        if let Ok(stripped) = input.strip_prefix(&src_root) {
            return stripped.to_path_buf();
        }
    }
    input.to_path_buf()
}
