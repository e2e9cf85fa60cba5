use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// An in-memory text buffer backed by one file.
///
/// Loaded fully once, mutated in place by rule applications, and persisted by
/// a single full overwrite at the end. The invoking caller owns the file
/// exclusively for the lifetime of the document; no other actor may touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Document {
    /// Read the file at `path` fully into memory.
    ///
    /// A missing file or non-UTF-8 content is a `ReadFailure`-class error and
    /// aborts all rule applications for this document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|source| DocumentError::Read {
            path: path.clone(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|source| DocumentError::Encoding {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, text })
    }

    /// Build a document from text already in memory, for previewing edits
    /// without touching the filesystem.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// xxh3 of the current content. Reported before and after a run so the
    /// caller can verify exactly what was written.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.text.as_bytes())
    }

    /// Splice `replacement` over the byte span `[start, end)`.
    ///
    /// Span boundaries come from the matcher and always lie on valid UTF-8
    /// boundaries within the current text.
    pub(crate) fn splice(&mut self, start: usize, end: usize, replacement: &str) {
        self.text.replace_range(start..end, replacement);
    }

    /// Persist the buffer back to its path by full overwrite.
    ///
    /// Uses tempfile-in-same-directory + fsync + rename, which strictly
    /// strengthens the contract: either the whole new content lands or the
    /// original file is untouched.
    pub fn save(&self) -> Result<(), DocumentError> {
        atomic_write(&self.path, self.text.as_bytes()).map_err(|source| DocumentError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Atomic full-file overwrite: tempfile + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
