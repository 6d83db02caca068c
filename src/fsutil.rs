use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Direction a file was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
}

impl fmt::Display for FileAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAccess::Read => f.write_str("reading"),
            FileAccess::Write => f.write_str("writing"),
        }
    }
}

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}` for {access}: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    pub access: FileAccess,
    #[source]
    pub source: io::Error,
}

impl FileOpenError {
    fn new(path: &Path, access: FileAccess, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            access,
            source,
        }
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use stream_probe::fsutil;
/// let reader = fsutil::open_file_reader("trace.json")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError::new(path, FileAccess::Read, source))?;
    Ok(BufReader::new(file))
}

/// Creates (or truncates) the file at the given path for writing.
///
/// The file is returned unbuffered; callers choose their own buffering.
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be created.
pub fn create_file_writer(path: impl AsRef<Path>) -> Result<File, FileOpenError> {
    let path = path.as_ref();
    File::create(path).map_err(|source| FileOpenError::new(path, FileAccess::Write, source))
}
