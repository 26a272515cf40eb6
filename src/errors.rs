use std::io;

use thiserror::Error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents all possible errors in the fspath crate.
///
/// Filesystem failures keep the originating [`io::Error`] as their source so
/// callers can still branch on the OS error kind.
#[derive(Error, Debug)]
pub enum Error {
    /// Error indicating a failure to read data or metadata.
    #[error("Failed to read {what}: {how}")]
    Read {
        /// The item that failed to be read.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to create a file or directory.
    #[error("Failed to create {what}: {how}")]
    Create {
        /// The item that failed to be created.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to write data to a file.
    #[error("Failed to write {what}: {how}")]
    Write {
        /// The item that failed to be written.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to delete a file.
    #[error("Failed to delete {what}: {how}")]
    Delete {
        /// The item that failed to be deleted.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to change attributes (times, permissions).
    #[error("Failed to update {what}: {how}")]
    Update {
        /// The item whose attributes could not be changed.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to flush file contents to stable storage.
    #[error("Sync failed {what}: {how}")]
    Sync {
        /// The item that failed to sync.
        what: String,
        /// The reason for the failure.
        #[source]
        how: io::Error,
    },

    /// Error indicating a failure to parse data.
    #[error("Failed to parse {what}: {how}")]
    Parse {
        /// The item that failed to be parsed.
        what: String,
        /// The reason for the failure.
        how: String,
    },

    /// Error indicating a path that cannot be processed lexically.
    #[error("Invalid path: {what}")]
    InvalidPath {
        /// The invalid path description.
        what: String,
    },
}

impl Error {
    /// Returns the underlying OS error, if this error came from the filesystem.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Read { how, .. }
            | Error::Create { how, .. }
            | Error::Write { how, .. }
            | Error::Delete { how, .. }
            | Error::Update { how, .. }
            | Error::Sync { how, .. } => Some(how),
            Error::Parse { .. } | Error::InvalidPath { .. } => None,
        }
    }

    /// True when the filesystem reported that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    }
}
