//! Bundler configuration record.
//!
//! The configuration is decoded from a `bundler.json` file and then adjusted
//! by CLI overrides before the [`Bundler`](crate::bundler::Bundler) is
//! constructed. Every optional field is a tagged optional rather than an
//! empty-string sentinel; defaulting happens in one place, at path
//! resolution. The environments list defaults to the host OS/arch when left
//! empty.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// The closed set of operating systems a bundle can target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TargetOs {
    Darwin,
    Linux,
    Windows,
}

impl TargetOs {
    /// The OS of the host this bundler is running on, in Go toolchain naming.
    pub fn host() -> Result<Self> {
        match std::env::consts::OS {
            "macos" => Ok(TargetOs::Darwin),
            "linux" => Ok(TargetOs::Linux),
            "windows" => Ok(TargetOs::Windows),
            other => Err(Error::UnsupportedOs(other.to_string())),
        }
    }
}

impl FromStr for TargetOs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "darwin" => Ok(TargetOs::Darwin),
            "linux" => Ok(TargetOs::Linux),
            "windows" => Ok(TargetOs::Windows),
            other => Err(Error::UnsupportedOs(other.to_string())),
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetOs::Darwin => "darwin",
            TargetOs::Linux => "linux",
            TargetOs::Windows => "windows",
        };
        f.write_str(s)
    }
}

/// The architecture of the host, in Go toolchain naming.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    }
}

/// One target environment: an OS, an architecture and optional build tags.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Environment {
    pub os: String,
    pub arch: String,
    /// Free-form space-separated build tags
    #[serde(default)]
    pub tags: String,
}

impl Environment {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            tags: String::new(),
        }
    }

    /// Parses and validates the OS field against the supported set.
    pub fn target_os(&self) -> Result<TargetOs> {
        self.os.parse()
    }

    /// Derives the unique output directory name `os[-tags-with-hyphens]-arch`.
    pub fn dir_name(&self) -> String {
        let mut name = self.os.clone();
        if !self.tags.is_empty() {
            name.push('-');
            name.push_str(&self.tags.replace(' ', "-"));
        }
        name.push('-');
        name.push_str(&self.arch);
        name
    }
}

/// The bundle configuration, decoded from `bundler.json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Configuration {
    /// The app name as it should be displayed everywhere.
    /// It is also baked into the binary through an ldflag.
    #[serde(default)]
    pub app_name: String,

    /// Where vendor archives are cached. Best left unset.
    pub cache_path: Option<String>,

    /// Environments the bundling should be done for.
    #[serde(default)]
    pub environments: Vec<Environment>,

    /// Icon paths, per OS. Darwin expects .icns, windows expects .ico.
    pub icon_path_darwin: Option<String>,
    pub icon_path_linux: Option<String>,
    pub icon_path_windows: Option<String>,

    /// The project path. Best left unset and run from the project folder.
    pub input_path: Option<String>,

    /// Path of the go binary. Defaults to "go".
    pub go_binary_path: Option<String>,

    /// Where the finished bundles are written.
    pub output_path: Option<String>,

    /// Override the output dir of the generated bind source file.
    pub bind_output: Option<String>,

    /// Override the package of the generated bind source file.
    pub bind_package: Option<String>,

    /// Extra build tags for the generated bind source file.
    pub bind_tags: Option<String>,

    /// DEBUG ONLY: a local webshell framework checkout to use instead of the
    /// released archive.
    pub framework_path: Option<String>,

    /// Only environments whose derived name matches this pattern are built.
    pub environment_filter: Option<String>,
}

impl Configuration {
    /// Decodes a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| Error::Fs {
            operation: "opening file",
            path: path.to_path_buf(),
            source,
        })?;
        let config: Configuration = serde_json::from_slice(&data)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_parsing_accepts_the_supported_set() {
        assert_eq!("darwin".parse::<TargetOs>().unwrap(), TargetOs::Darwin);
        assert_eq!("linux".parse::<TargetOs>().unwrap(), TargetOs::Linux);
        assert_eq!("windows".parse::<TargetOs>().unwrap(), TargetOs::Windows);
        assert!("plan9".parse::<TargetOs>().is_err());
    }

    #[test]
    fn dir_name_includes_sanitized_tags() {
        let mut env = Environment::new("linux", "amd64");
        assert_eq!(env.dir_name(), "linux-amd64");

        env.tags = "gtk webkit2".to_string();
        assert_eq!(env.dir_name(), "linux-gtk-webkit2-amd64");
    }

    #[test]
    fn configuration_decodes_from_json() {
        let json = r#"{
            "app_name": "Demo",
            "environments": [
                {"os": "linux", "arch": "amd64"},
                {"os": "windows", "arch": "amd64", "tags": "prod"}
            ]
        }"#;
        let config: Configuration = serde_json::from_str(json).unwrap();
        assert_eq!(config.app_name, "Demo");
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.environments[1].tags, "prod");
        assert!(config.cache_path.is_none());
        assert!(config.environment_filter.is_none());
    }
}
