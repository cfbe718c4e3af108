//! Cross-compilation of the backend binary.
//!
//! One invocation of the go toolchain per environment, with a replaced (not
//! inherited) process environment so host variables cannot leak into the
//! cross-build. The compiler runs to completion with no timeout; a non-zero
//! exit surfaces the captured combined output verbatim.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bundler::paths::BundlerPaths;
use crate::config::{Environment, TargetOs};
use crate::error::{Error, Result};

const ICON_TOOL: &str = "rsrc";

/// Ordered list of link flags. Duplicate flag names are legitimate (multiple
/// `-X` entries) and their order is observable in the final invocation.
#[derive(Debug, Default)]
pub struct LinkFlags(Vec<(&'static str, String)>);

impl LinkFlags {
    pub fn push(&mut self, flag: &'static str, value: impl Into<String>) {
        self.0.push((flag, value.into()));
    }
}

impl fmt::Display for LinkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "-{flag} {value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Drives one go build per environment.
pub struct CompileDriver<'a> {
    paths: &'a BundlerPaths,
    go_binary: &'a str,
    bind_package: &'a str,
}

impl<'a> CompileDriver<'a> {
    pub fn new(paths: &'a BundlerPaths, go_binary: &'a str, bind_package: &'a str) -> Self {
        Self {
            paths,
            go_binary,
            bind_package,
        }
    }

    /// The link flags for one target OS: the build timestamp, and the GUI
    /// subsystem selector on windows.
    fn link_flags(&self, os: TargetOs) -> LinkFlags {
        let mut flags = LinkFlags::default();
        flags.push(
            "X",
            format!(
                "\"{}.BuiltAt={}\"",
                self.bind_package,
                chrono::Local::now()
            ),
        );
        if os == TargetOs::Windows {
            flags.push("H", "windowsgui");
        }
        flags
    }

    /// The replaced process environment for the cross-build: target arch and
    /// OS, the toolchain root, the system PATH, and nothing else.
    fn build_env(&self, env: &Environment) -> Vec<(&'static str, String)> {
        vec![
            ("GOARCH", env.arch.clone()),
            ("GOOS", env.os.clone()),
            ("GOPATH", std::env::var("GOPATH").unwrap_or_default()),
            ("PATH", std::env::var("PATH").unwrap_or_default()),
        ]
    }

    fn build_args(&self, env: &Environment, os: TargetOs, binary_path: &Path) -> Vec<OsString> {
        vec![
            OsString::from("build"),
            OsString::from("-ldflags"),
            OsString::from(self.link_flags(os).to_string()),
            OsString::from("-o"),
            binary_path.as_os_str().to_os_string(),
            OsString::from("-tags"),
            OsString::from(&env.tags),
            self.paths.build.clone().into_os_string(),
        ]
    }

    /// Compiles the backend binary into `<environment-dir>/binary`.
    ///
    /// For windows targets with a configured icon, the icon resource object
    /// is generated into the build source tree first; that failure is fatal
    /// before the compiler is ever invoked.
    pub async fn compile(
        &self,
        env: &Environment,
        os: TargetOs,
        environment_path: &Path,
    ) -> Result<PathBuf> {
        if os == TargetOs::Windows {
            self.add_windows_icon_object(&env.arch).await?;
        }

        let binary_path = environment_path.join("binary");
        log::debug!(
            "Building for os {} and arch {} with tags {}",
            env.os,
            env.arch,
            env.tags
        );

        let args = self.build_args(env, os, &binary_path);
        log::debug!(
            "Executing {} {}",
            self.go_binary,
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = tokio::process::Command::new(self.go_binary)
            .args(&args)
            .env_clear()
            .envs(self.build_env(env))
            .output()
            .await
            .map_err(|source| Error::Fs {
                operation: "running compiler",
                path: PathBuf::from(self.go_binary),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Tool {
                tool: "building",
                output: combined,
            });
        }
        Ok(binary_path)
    }

    /// Generates the windows icon resource object into the build source tree
    /// via the external icon embedder. Skipped when no icon is configured.
    async fn add_windows_icon_object(&self, arch: &str) -> Result<()> {
        let Some(icon) = &self.paths.icon_windows else {
            return Ok(());
        };
        let object_path = self.paths.input.join("windows.syso");
        log::debug!(
            "Running {ICON_TOOL} for icon {} into {}",
            icon.display(),
            object_path.display()
        );

        let output = tokio::process::Command::new(ICON_TOOL)
            .arg("-ico")
            .arg(icon)
            .arg("-arch")
            .arg(arch)
            .arg("-o")
            .arg(&object_path)
            .output()
            .await
            .map_err(|source| Error::Fs {
                operation: "running icon embedder",
                path: PathBuf::from(ICON_TOOL),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Tool {
                tool: "icon embedder",
                output: combined,
            });
        }
        Ok(())
    }
}
