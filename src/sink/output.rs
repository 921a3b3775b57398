//! Write destinations for sinks.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// A byte destination that a sink can declare complete.
pub trait Destination: Write {
    /// Called once after the last record has been written and flushed.
    fn commit(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Destination for Vec<u8> {}

impl Destination for io::Stdout {}

impl Destination for io::Sink {}

/// A file that only appears at its final path once committed.
///
/// Bytes go to `<path>.partial`; [`Destination::commit`] renames it onto `<path>`. If the value
/// is dropped without being committed (a run failed mid-stream), the partial file is removed, so
/// a failed run never leaves output at `<path>` that looks complete.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    partial: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl OutputFile {
    /// Create the partial file next to `path`.
    ///
    /// Fails with [`PipelineError::Resource`] if `path` is an existing directory or the partial
    /// file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if path.is_dir() {
            return Err(PipelineError::Resource {
                source: io::Error::new(io::ErrorKind::IsADirectory, "output path is a directory"),
                path,
            });
        }
        let file_name = path
            .file_name()
            .ok_or_else(|| PipelineError::config(format!("output path '{}' has no file name", path.display())))?;
        let mut partial_name = file_name.to_os_string();
        partial_name.push(".partial");
        let partial = path.with_file_name(partial_name);

        let file = File::create(&partial).map_err(|source| PipelineError::Resource {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            partial,
            file: Some(file),
            committed: false,
        })
    }

    /// Final output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path bytes are written to until commit.
    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    fn discard(&mut self) {
        self.file.take();
        let _ = fs::remove_file(&self.partial);
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(f) => f.write(buf),
            None => Err(io::Error::other("output file already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Destination for OutputFile {
    fn commit(&mut self) -> io::Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush()?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.partial, &self.path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if !self.committed {
            self.discard();
        }
    }
}
