// ABOUTME: Unpacks an uploaded tar archive into a private scratch directory.
// ABOUTME: The directory is removed when the returned Upload is dropped.

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name of the unpacked tree when the client sends no project name.
pub const DEFAULT_UPLOAD_NAME: &str = "project";

/// An extracted upload. Keeps its scratch directory alive.
#[derive(Debug)]
pub struct Upload {
    _dir: TempDir,
    root: PathBuf,
}

impl Upload {
    /// Project root: the scratch directory joined with the upload name.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Unpack `archive` under a fresh temporary directory, in a subdirectory
/// named `name` so the directory name can serve as the project name.
pub async fn unpack(archive: Bytes, name: &str) -> io::Result<Upload> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || unpack_blocking(&archive, &name))
        .await
        .map_err(io::Error::other)?
}

fn unpack_blocking(archive: &[u8], name: &str) -> io::Result<Upload> {
    if archive.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "upload is empty",
        ));
    }

    let dir = tempfile::Builder::new().prefix("exoframe-").tempdir()?;
    let root = dir.path().join(name);
    std::fs::create_dir_all(&root)?;

    // `unpack` refuses entries that would land outside `root`.
    let mut tar = tar::Archive::new(archive);
    tar.set_preserve_permissions(true);
    tar.unpack(&root)?;

    tracing::debug!(root = %root.display(), bytes = archive.len(), "unpacked upload");
    Ok(Upload { _dir: dir, root })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(files: &[(&str, &str)]) -> Bytes {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        Bytes::from(builder.into_inner().unwrap())
    }

    #[tokio::test]
    async fn unpacks_into_named_root() {
        let upload = unpack(archive(&[("index.html", "<p>hi</p>"), ("css/site.css", "")]), "site")
            .await
            .unwrap();
        assert!(upload.root().ends_with("site"));
        assert!(upload.root().join("index.html").is_file());
        assert!(upload.root().join("css/site.css").is_file());
    }

    #[tokio::test]
    async fn scratch_dir_is_removed_on_drop() {
        let upload = unpack(archive(&[("Dockerfile", "FROM busybox\n")]), "app")
            .await
            .unwrap();
        let root = upload.root().to_path_buf();
        drop(upload);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn empty_and_garbage_uploads_fail() {
        assert!(unpack(Bytes::new(), "app").await.is_err());
        assert!(unpack(Bytes::from_static(&[1u8; 700]), "app").await.is_err());
    }
}
