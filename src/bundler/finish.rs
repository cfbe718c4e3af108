//! Per-OS bundle finishing.
//!
//! Dispatch is a pure function of the environment's OS over the closed set
//! {darwin, linux, windows}. Each finisher receives the already-created
//! environment directory and the compiled binary, and owns no other state.

use std::path::Path;

use crate::bundler::cancel::CancelToken;
use crate::bundler::utils::fs;
use crate::config::TargetOs;
use crate::error::{Error, FsResultExt, Result};

/// Assembles the final OS-native bundle layout from the compiled binary.
pub struct PlatformFinisher<'a> {
    app_name: &'a str,
    icon_darwin: Option<&'a Path>,
    cancel: &'a CancelToken,
}

impl<'a> PlatformFinisher<'a> {
    pub fn new(app_name: &'a str, icon_darwin: Option<&'a Path>, cancel: &'a CancelToken) -> Self {
        Self {
            app_name,
            icon_darwin,
            cancel,
        }
    }

    pub async fn finish(
        &self,
        os: TargetOs,
        environment_path: &Path,
        binary_path: &Path,
    ) -> Result<()> {
        match os {
            TargetOs::Darwin => self.finish_darwin(environment_path, binary_path).await,
            TargetOs::Linux => self.finish_linux(environment_path, binary_path).await,
            TargetOs::Windows => self.finish_windows(environment_path, binary_path).await,
        }
    }

    /// Builds `<App>.app/Contents` with the executable under `MacOS`, the
    /// optional icon under `Resources`, and a generated `Info.plist`.
    async fn finish_darwin(&self, environment_path: &Path, binary_path: &Path) -> Result<()> {
        let contents_path = environment_path
            .join(format!("{}.app", self.app_name))
            .join("Contents");
        let macos_path = contents_path.join("MacOS");
        log::debug!("Creating {}", macos_path.display());
        fs::create_dir_all(&macos_path).await?;
        self.cancel.check()?;

        let macos_binary_path = macos_path.join(self.app_name);
        log::debug!(
            "Moving {} to {}",
            binary_path.display(),
            macos_binary_path.display()
        );
        fs::move_file(binary_path, &macos_binary_path).await?;
        self.cancel.check()?;

        log::debug!("Chmoding {}", macos_binary_path.display());
        fs::make_executable(&macos_binary_path).await?;
        self.cancel.check()?;

        let icon_file = if let Some(icon) = self.icon_darwin {
            let resources_path = contents_path.join("Resources");
            log::debug!("Creating {}", resources_path.display());
            fs::create_dir_all(&resources_path).await?;
            self.cancel.check()?;

            let icon_name = format!("{}{}", self.app_name, icon_extension(icon));
            let icon_dst = resources_path.join(&icon_name);
            log::debug!("Copying {} to {}", icon.display(), icon_dst.display());
            fs::copy_file(icon, &icon_dst).await?;
            self.cancel.check()?;
            Some(icon_name)
        } else {
            None
        };

        let plist_path = contents_path.join("Info.plist");
        log::debug!("Adding Info.plist to {}", plist_path.display());
        tokio::fs::write(&plist_path, info_plist(self.app_name, icon_file.as_deref()))
            .await
            .fs_context("writing", &plist_path)?;
        self.cancel.check()?;
        Ok(())
    }

    /// Moves the binary to `<env>/<App>`, flat, no extension.
    async fn finish_linux(&self, environment_path: &Path, binary_path: &Path) -> Result<()> {
        let linux_binary_path = environment_path.join(self.app_name);
        log::debug!(
            "Moving {} to {}",
            binary_path.display(),
            linux_binary_path.display()
        );
        fs::move_file(binary_path, &linux_binary_path).await?;
        self.cancel.check()
    }

    /// Moves the binary to `<env>/<App>.exe`, flat.
    async fn finish_windows(&self, environment_path: &Path, binary_path: &Path) -> Result<()> {
        let windows_binary_path = environment_path.join(format!("{}.exe", self.app_name));
        log::debug!(
            "Moving {} to {}",
            binary_path.display(),
            windows_binary_path.display()
        );
        fs::move_file(binary_path, &windows_binary_path).await?;
        self.cancel.check()
    }
}

/// The icon's extension including the leading dot, empty when there is none.
fn icon_extension(icon: &Path) -> String {
    icon.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Renders the darwin bundle manifest. The bundle identifier is synthesized
/// as `com.<AppName>`.
fn info_plist(app_name: &str, icon_file: Option<&str>) -> String {
    let icon_entry = icon_file
        .map(|name| {
            format!(
                "\t\t<key>CFBundleIconFile</key>\n\t\t<string>{name}</string>\n"
            )
        })
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
	<dict>
{icon_entry}		<key>CFBundleDisplayName</key>
		<string>{app_name}</string>
		<key>CFBundleExecutable</key>
		<string>{app_name}</string>
		<key>CFBundleName</key>
		<string>{app_name}</string>
		<key>CFBundleIdentifier</key>
		<string>com.{app_name}</string>
	</dict>
</plist>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compiled_binary(dir: &Path) -> PathBuf {
        let path = dir.join("binary");
        std::fs::write(&path, b"compiled").unwrap();
        path
    }

    #[tokio::test]
    async fn darwin_finishing_builds_an_app_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let binary = compiled_binary(dir.path());
        let icon = dir.path().join("icon.icns");
        std::fs::write(&icon, b"icns").unwrap();

        let cancel = CancelToken::new();
        let finisher = PlatformFinisher::new("Demo", Some(&icon), &cancel);
        finisher
            .finish(TargetOs::Darwin, dir.path(), &binary)
            .await
            .unwrap();

        let contents = dir.path().join("Demo.app/Contents");
        let executable = contents.join("MacOS/Demo");
        assert!(executable.exists());
        assert!(!binary.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&executable).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }
        assert!(contents.join("Resources/Demo.icns").exists());

        let plist = std::fs::read_to_string(contents.join("Info.plist")).unwrap();
        assert!(plist.contains("<string>com.Demo</string>"));
        assert!(plist.contains("<string>Demo.icns</string>"));
        assert!(plist.contains("<key>CFBundleExecutable</key>"));
    }

    #[tokio::test]
    async fn darwin_finishing_without_icon_omits_the_icon_entry() {
        let dir = tempfile::tempdir().unwrap();
        let binary = compiled_binary(dir.path());

        let cancel = CancelToken::new();
        let finisher = PlatformFinisher::new("Demo", None, &cancel);
        finisher
            .finish(TargetOs::Darwin, dir.path(), &binary)
            .await
            .unwrap();

        let contents = dir.path().join("Demo.app/Contents");
        assert!(!contents.join("Resources").exists());
        let plist = std::fs::read_to_string(contents.join("Info.plist")).unwrap();
        assert!(!plist.contains("CFBundleIconFile"));
    }

    #[tokio::test]
    async fn linux_finishing_produces_a_flat_named_binary() {
        let dir = tempfile::tempdir().unwrap();
        let binary = compiled_binary(dir.path());

        let cancel = CancelToken::new();
        let finisher = PlatformFinisher::new("Demo", None, &cancel);
        finisher
            .finish(TargetOs::Linux, dir.path(), &binary)
            .await
            .unwrap();

        assert!(dir.path().join("Demo").is_file());
        assert!(!binary.exists());
    }

    #[tokio::test]
    async fn windows_finishing_appends_the_exe_extension() {
        let dir = tempfile::tempdir().unwrap();
        let binary = compiled_binary(dir.path());

        let cancel = CancelToken::new();
        let finisher = PlatformFinisher::new("Demo", None, &cancel);
        finisher
            .finish(TargetOs::Windows, dir.path(), &binary)
            .await
            .unwrap();

        assert!(dir.path().join("Demo.exe").is_file());
        assert!(!binary.exists());
    }
}
