use std::time::Duration;

#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// How long a metadata snapshot may be served without asking the filesystem.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_millis(50);
/// Mode used when creating directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;
/// Mode used when creating files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Tunables shared by every [`Path`](crate::Path) bound to the same
/// [`FsEnv`](crate::FsEnv).
///
/// Missing fields deserialize to their defaults, so a partial document such as
/// `{"file_mode": 384}` is accepted.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Freshness window of the per-path metadata cache.
    pub freshness: Duration,
    /// Mode for directories created by `mkdir`/`mkdir_all`.
    pub dir_mode: u32,
    /// Mode for files created by `write_file`.
    pub file_mode: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            freshness: DEFAULT_FRESHNESS,
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
        }
    }
}
