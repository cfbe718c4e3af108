//! File system helpers for the bundling pipeline.
//!
//! All operations create missing parent directories and are idempotent where
//! the pipeline relies on it (directory removal before recreation). Each
//! helper is atomic with respect to the cancellation token: callers check the
//! token after the call returns.

use std::io;
use std::path::Path;

use tokio::fs;

use crate::error::{Error, FsResultExt, Result};

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            operation: "removing",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating", path)
}

/// Copies a regular file, creating any parent directories of the destination.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating", parent)?;
    }
    fs::copy(from, to).await.fs_context("copying", from)?;
    Ok(())
}

/// Recursively copies a directory, creating any parent directories of the
/// destination. Preserves symlinks.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let from_err = from.clone();

    tokio::task::spawn_blocking(move || -> io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry.map_err(io::Error::other)?;
            let rel_path = entry
                .path()
                .strip_prefix(&from)
                .map_err(io::Error::other)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())?;
                symlink(&target, &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path)?;
            }
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::Fs {
        operation: "copying",
        path: from_err.clone(),
        source: io::Error::other(e),
    })?
    .fs_context("copying", &from_err)
}

/// Moves a file, falling back to copy-then-remove across filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating", parent)?;
    }
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to).await.fs_context("copying", from)?;
            fs::remove_file(from).await.fs_context("removing", from)
        }
        Err(e) => Err(Error::Fs {
            operation: "moving",
            path: from.to_path_buf(),
            source: e,
        }),
    }
}

/// Marks a file as executable by everyone. No-op on windows hosts.
pub async fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
            .await
            .fs_context("chmoding", path)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_reproduces_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.txt"), b"a").unwrap();
        std::fs::write(src.join("nested/b.txt"), b"b").unwrap();

        let dst = dir.path().join("dst");
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"a");
        assert_eq!(std::fs::read(dst.join("nested/b.txt")).unwrap(), b"b");
        // source left untouched
        assert!(src.join("a.txt").exists());
    }

    #[tokio::test]
    async fn move_file_creates_destination_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("binary");
        std::fs::write(&src, b"bin").unwrap();

        let dst = dir.path().join("App.app/Contents/MacOS/App");
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"bin");
    }

    #[tokio::test]
    async fn remove_dir_all_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        remove_dir_all(&missing).await.unwrap();
        remove_dir_all(&missing).await.unwrap();
    }
}
