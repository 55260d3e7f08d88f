use crate::upload::types::FileHandle;
use ignore::Walk;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

impl FileHandle {
    /// Builds a handle from file metadata. The media type is guessed from the
    /// extension; the content is never read.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid filename"))?
            .to_string_lossy()
            .to_string();

        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_MEDIA_TYPE);

        Ok(Self {
            name,
            size_bytes: metadata.len(),
            media_type: media_type.to_string(),
            path: Some(path.to_path_buf()),
        })
    }
}

/// Turns paths chosen in the file picker, dropped on the window or found
/// under a folder into `FileHandle`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl FileSource {
    pub fn new() -> Self {
        Self
    }

    /// Directories are walked; unreadable paths are logged and skipped.
    pub fn collect_paths<I>(&self, paths: I) -> Vec<FileHandle>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut handles = Vec::new();
        for path in paths {
            if path.is_dir() {
                handles.extend(self.walk_folder(&path));
                continue;
            }
            match FileHandle::from_path(&path) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }
        handles
    }

    /// Walks `root` honouring `.gitignore` and hidden-file rules.
    pub fn walk_folder(&self, root: &Path) -> Vec<FileHandle> {
        let mut handles = Vec::new();
        for entry in Walk::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Folder walk error");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match FileHandle::from_path(path) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }

        tracing::debug!(root = %root.display(), found = handles.len(), "Folder walk finished");
        handles
    }
}
