//! Invocation of the external data-embedding generator.
//!
//! The generator serializes the resources and vendor directories into one
//! compilable source file per target OS. The OS is baked into the output file
//! name and into the primary build tag, so each generated file only ever
//! participates in builds for its own OS. Correctness depends on the vendor
//! directory having been provisioned immediately before the call: the
//! generator embeds whatever is currently on disk.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::bundler::paths::BundlerPaths;
use crate::config::TargetOs;
use crate::error::{Error, Result};

const EMBED_TOOL: &str = "go-bindata";

/// Thin adapter around the embedding generator CLI.
pub struct EmbedInvoker<'a> {
    paths: &'a BundlerPaths,
    package: &'a str,
    extra_tags: &'a str,
}

impl<'a> EmbedInvoker<'a> {
    pub fn new(paths: &'a BundlerPaths, package: &'a str, extra_tags: &'a str) -> Self {
        Self {
            paths,
            package,
            extra_tags,
        }
    }

    /// The generated source file for one target OS, `bind_<os>.go` under the
    /// bind output directory.
    pub fn output_file(&self, os: TargetOs) -> PathBuf {
        self.paths.bind_output.join(format!("bind_{os}.go"))
    }

    /// The build tags of the generated file: the target OS, plus any
    /// configured extra tags.
    fn tags(&self, os: TargetOs) -> String {
        if self.extra_tags.is_empty() {
            os.to_string()
        } else {
            format!("{os},{}", self.extra_tags)
        }
    }

    fn args(&self, os: TargetOs) -> Vec<OsString> {
        let recursive = |p: &PathBuf| {
            let mut s = p.clone().into_os_string();
            s.push("/...");
            s
        };
        vec![
            OsString::from("-pkg"),
            OsString::from(self.package),
            OsString::from("-o"),
            self.output_file(os).into_os_string(),
            OsString::from("-prefix"),
            self.paths.input.clone().into_os_string(),
            OsString::from("-tags"),
            OsString::from(self.tags(os)),
            recursive(&self.paths.resources),
            recursive(&self.paths.vendor),
        ]
    }

    /// Runs the generator synchronously. Any failure is fatal to the current
    /// environment's build; combined output is surfaced in the error.
    pub async fn embed(&self, os: TargetOs) -> Result<()> {
        let output_file = self.output_file(os);
        log::debug!("Generating {}", output_file.display());

        let output = tokio::process::Command::new(EMBED_TOOL)
            .args(self.args(os))
            .output()
            .await
            .map_err(|source| Error::Fs {
                operation: "running embedding generator",
                path: PathBuf::from(EMBED_TOOL),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Tool {
                tool: "embedding generator",
                output: combined,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn invoker_paths() -> BundlerPaths {
        let config = Configuration {
            input_path: Some("/work/project".into()),
            output_path: Some("/work/out".into()),
            cache_path: Some("/work/cache".into()),
            bind_output: Some("gen".into()),
            ..Default::default()
        };
        BundlerPaths::from_config(&config).unwrap()
    }

    #[test]
    fn output_file_bakes_the_os_into_the_name() {
        let paths = invoker_paths();
        let invoker = EmbedInvoker::new(&paths, "main", "");
        assert_eq!(
            invoker.output_file(TargetOs::Windows),
            PathBuf::from("/work/project/gen/bind_windows.go")
        );
        assert_eq!(
            invoker.output_file(TargetOs::Darwin),
            PathBuf::from("/work/project/gen/bind_darwin.go")
        );
    }

    #[test]
    fn generator_receives_package_tags_and_recursive_inputs() {
        let paths = invoker_paths();
        let invoker = EmbedInvoker::new(&paths, "assets", "prod");
        let args = invoker.args(TargetOs::Linux);

        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"assets".to_string()));
        assert!(args.contains(&"linux,prod".to_string()));
        assert!(args.contains(&"/work/project/resources/...".to_string()));
        assert!(args.contains(&"/work/project/vendor/...".to_string()));
    }
}
