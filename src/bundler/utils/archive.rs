//! Zip archiving for the framework override directory.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, FsResultExt, Result};

/// Zips a directory into `dst`, nesting its contents under `root` inside the
/// archive so the produced file matches the layout of a released archive.
pub async fn zip_dir(src: &Path, dst: &Path, root: &str) -> Result<()> {
    let src = src.to_path_buf();
    let dst_owned = dst.to_path_buf();
    let root = root.to_string();

    tokio::task::spawn_blocking(move || write_zip(&src, &dst_owned, &root))
        .await
        .map_err(|e| Error::Fs {
            operation: "zipping",
            path: dst.to_path_buf(),
            source: io::Error::other(e),
        })?
}

fn write_zip(src: &Path, dst: &Path, root: &str) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).fs_context("creating", parent)?;
    }
    let file = File::create(dst).fs_context("creating", dst)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    let zip_err = |source: zip::result::ZipError| Error::Zip {
        path: src.to_path_buf(),
        source,
    };

    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Fs {
            operation: "walking",
            path: src.to_path_buf(),
            source: io::Error::other(e),
        })?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Fs {
                operation: "walking",
                path: entry.path().to_path_buf(),
                source: io::Error::other(e),
            })?;
        let name = Path::new(root).join(rel_path);
        let name = name.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            writer.add_directory(name, options).map_err(zip_err)?;
        } else {
            writer.start_file(name, options).map_err(zip_err)?;
            let mut f = File::open(entry.path()).fs_context("opening file", entry.path())?;
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)
                .fs_context("reading", entry.path())?;
            writer.write_all(&buf).fs_context("writing", dst)?;
        }
    }

    writer.finish().map_err(zip_err)?;
    Ok(())
}
