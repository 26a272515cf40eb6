use std::fs::Metadata;
use std::fs::Permissions;
use std::path::Path as StdPath;
use std::time::SystemTime;

#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Error;
use crate::utils::format_system_time;
use crate::utils::parse_system_time;

/// Snapshot of a file's attributes at the time it was queried.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub struct FileStat {
    /// The size of the file in bytes. For directories, this is
    /// implementation-defined.
    pub size: u64,
    /// Permission bits. On platforms without unix modes this is `0o444` for
    /// read-only entries and `0o666` otherwise.
    pub mode: u32,
    /// The last modification time of the file or directory in RFC 3339 - Z
    /// format. For example "2018-01-26T18:30:09.453Z". Anything finer than a
    /// millisecond is truncated.
    pub mtime: String,
    /// Whether this entry is a directory.
    pub is_directory: bool,
}

impl FileStat {
    /// Queries the filesystem for `path`, following symlinks.
    pub fn from_path<P: AsRef<StdPath>>(path: P) -> std::io::Result<Self> {
        std::fs::metadata(path).map(|m| Self::from_metadata(&m))
    }

    /// Create a `FileStat` from a `Metadata` value.
    ///
    /// A missing modification time (unsupported by the platform) is reported
    /// as the unix epoch.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        FileStat {
            size: metadata.len(),
            mode: mode_bits(metadata),
            mtime: format_system_time(modified),
            is_directory: metadata.is_dir(),
        }
    }

    /// Modification time as a `SystemTime`.
    ///
    /// The snapshot keeps milliseconds only, so this can be earlier than the
    /// value `std::fs::Metadata::modified` reports for the same entry.
    /// Compare at millisecond granularity.
    pub fn modified(&self) -> Result<SystemTime, Error> {
        parse_system_time(&self.mtime)
    }

    /// Permissions carrying this snapshot's mode, suitable for
    /// `std::fs::set_permissions`.
    pub(crate) fn permissions(&self, template: Permissions) -> Permissions {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = template;
            Permissions::from_mode(self.mode)
        }
        #[cfg(not(unix))]
        {
            let mut perms = template;
            perms.set_readonly(self.mode & 0o222 == 0);
            perms
        }
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
