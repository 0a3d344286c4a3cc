//! # PersistenceProvider — byte-stream factory with atomic publish
//!
//! A `PersistenceProvider` hands out a writer for a named filter and, on
//! [`SnapshotWriter::finish`], atomically repoints a stable name at the
//! bytes just written. Readers only ever see the stable name, so a reader
//! never observes a partially written snapshot.
//!
//! [`FsPersistenceProvider`] is the local-filesystem reference
//! implementation: each snapshot lands at `base_path/name.<unix_ts>`, and
//! `base_path/name` is a symlink to the most recent such file. Unlike a bare
//! `symlink(2)` call — which fails outright if the link name is already
//! taken, so every write after the first to the same filter would error —
//! publish goes through a throwaway symlink name and an atomic `rename(2)`
//! over the stable name, so republishing a name never fails because the
//! name is already in use.
//!
//! Unix-only: the reference implementation relies on POSIX symlinks.
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("filter name must not be empty")]
    EmptyName,
}

/// A byte sink for one snapshot. Dropping it without calling
/// [`finish`](Self::finish) discards the write: nothing is published.
pub trait SnapshotWriter: Write + Send {
    /// Flushes and syncs the underlying file, then atomically publishes it
    /// under the filter's stable name.
    fn finish(self: Box<Self>) -> Result<(), PersistError>;
}

/// A byte-stream factory keyed by filter name.
pub trait PersistenceProvider: Send + Sync {
    /// Names for which a valid published snapshot currently exists.
    fn list_filter_names(&self) -> Result<Vec<String>, PersistError>;

    /// Opens a writer for a new snapshot of `name`. The snapshot is not
    /// visible to readers until the returned writer is finished.
    fn new_writer(&self, name: &str) -> Result<Box<dyn SnapshotWriter>, PersistError>;

    /// Opens a reader over the most recently published snapshot of `name`.
    fn new_reader(&self, name: &str) -> Result<Box<dyn Read + Send>, PersistError>;
}

/// Filesystem-backed [`PersistenceProvider`].
pub struct FsPersistenceProvider {
    base_path: PathBuf,
}

impl FsPersistenceProvider {
    /// Opens (creating if needed) a persistence root at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> io::Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }
}

impl PersistenceProvider for FsPersistenceProvider {
    fn list_filter_names(&self) -> Result<Vec<String>, PersistError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            let meta = fs::symlink_metadata(&path)?;
            if !meta.file_type().is_symlink() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn new_writer(&self, name: &str) -> Result<Box<dyn SnapshotWriter>, PersistError> {
        if name.is_empty() {
            return Err(PersistError::EmptyName);
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let versioned_name = format!("{name}.{ts}");
        let final_path = self.base_path.join(&versioned_name);

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&final_path)?;

        Ok(Box::new(FsSnapshotWriter {
            file,
            base_path: self.base_path.clone(),
            link_path: self.base_path.join(name),
            versioned_name,
        }))
    }

    fn new_reader(&self, name: &str) -> Result<Box<dyn Read + Send>, PersistError> {
        let link_path = self.base_path.join(name);
        let file = fs::File::open(&link_path)?;
        Ok(Box::new(file))
    }
}

struct FsSnapshotWriter {
    file: fs::File,
    base_path: PathBuf,
    link_path: PathBuf,
    versioned_name: String,
}

impl Write for FsSnapshotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl SnapshotWriter for FsSnapshotWriter {
    fn finish(mut self: Box<Self>) -> Result<(), PersistError> {
        self.file.flush()?;
        self.file.sync_all()?;

        // Atomic publish: symlink the versioned file under a throwaway name,
        // then rename that symlink over the stable name. `rename(2)` over an
        // existing symlink is atomic, unlike re-creating the stable symlink
        // directly, which errors if it already exists.
        let tmp_link = self
            .base_path
            .join(format!(".{}.tmp-link", self.versioned_name));
        let _ = fs::remove_file(&tmp_link);
        symlink(&self.versioned_name, &tmp_link)?;
        fs::rename(&tmp_link, &self.link_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
