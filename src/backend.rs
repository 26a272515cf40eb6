use std::ffi::OsString;
use std::io;
use std::path::Path as StdPath;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use log::trace;

use crate::FileStat;
use crate::settings::Settings;

/// Source of time and metadata for [`Path`](crate::Path) values.
///
/// Everything the metadata cache depends on goes through this trait so the
/// freshness window can be exercised without real sleeps or real disks.
pub trait Backend: Send + Sync {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Metadata for `path`, following symlinks.
    fn stat(&self, path: &StdPath) -> io::Result<FileStat>;

    /// Immediate children of `path` sorted by name. Each child's metadata
    /// describes the entry itself; symlinks are not followed.
    ///
    /// A child removed between listing the directory and reading its
    /// metadata is left out. Any other failure on a child fails the whole
    /// call.
    fn read_dir(&self, path: &StdPath) -> io::Result<Vec<(OsString, FileStat)>>;
}

impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn stat(&self, path: &StdPath) -> io::Result<FileStat> {
        (**self).stat(path)
    }

    fn read_dir(&self, path: &StdPath) -> io::Result<Vec<(OsString, FileStat)>> {
        (**self).read_dir(path)
    }
}

/// [`Backend`] backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn stat(&self, path: &StdPath) -> io::Result<FileStat> {
        FileStat::from_path(path)
    }

    fn read_dir(&self, path: &StdPath) -> io::Result<Vec<(OsString, FileStat)>> {
        let entries = std::fs::read_dir(path)?.map(|entry| {
            entry.map(|entry| {
                let stat = entry.metadata().map(|m| FileStat::from_metadata(&m));
                (entry.file_name(), stat)
            })
        });
        collect_listing(entries)
    }
}

// Sorted listing from raw directory entries. Children that vanished before
// their metadata was read are skipped.
fn collect_listing<I>(entries: I) -> io::Result<Vec<(OsString, FileStat)>>
where
    I: IntoIterator<Item = io::Result<(OsString, io::Result<FileStat>)>>,
{
    let mut listing = Vec::new();
    for entry in entries {
        let (name, stat) = entry?;
        match stat {
            Ok(stat) => listing.push((name, stat)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("{} vanished while listing", name.to_string_lossy());
            }
            Err(e) => return Err(e),
        }
    }
    listing.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listing)
}

/// A backend paired with the settings every path bound to it uses.
pub struct FsEnv {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) settings: Settings,
}

impl FsEnv {
    /// Creates an environment from a backend and settings.
    pub fn new(backend: Box<dyn Backend>, settings: Settings) -> Self {
        Self { backend, settings }
    }

    /// Shared environment using [`NativeBackend`] and default settings.
    pub fn native() -> Arc<FsEnv> {
        static NATIVE: OnceLock<Arc<FsEnv>> = OnceLock::new();
        NATIVE
            .get_or_init(|| Arc::new(FsEnv::new(Box::new(NativeBackend), Settings::default())))
            .clone()
    }

    /// Settings in effect for this environment.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl std::fmt::Debug for FsEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsEnv")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn native_read_dir_is_sorted_by_name() {
        let dir = TempDir::new("backend").unwrap();
        for name in ["zeta", "alpha", "mid"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        let names: Vec<_> = NativeBackend
            .read_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn native_read_dir_reports_entry_metadata() {
        let dir = TempDir::new("backend").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("file"), b"1234").unwrap();

        let entries = NativeBackend.read_dir(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].1.is_directory);
        assert_eq!(entries[0].1.size, 4);
        assert!(entries[1].1.is_directory);
    }

    fn stat_of(size: u64) -> FileStat {
        FileStat {
            size,
            mode: 0o644,
            mtime: "2018-01-26T21:10:09.453Z".into(),
            is_directory: false,
        }
    }

    #[test]
    fn listing_skips_children_removed_mid_scan() {
        let entries = vec![
            Ok((OsString::from("b"), Ok(stat_of(2)))),
            Ok((
                OsString::from("gone"),
                Err(io::Error::from(io::ErrorKind::NotFound)),
            )),
            Ok((OsString::from("a"), Ok(stat_of(1)))),
        ];
        let listing = collect_listing(entries).unwrap();
        assert_eq!(
            listing,
            [
                (OsString::from("a"), stat_of(1)),
                (OsString::from("b"), stat_of(2)),
            ]
        );
    }

    #[test]
    fn listing_propagates_other_child_errors() {
        let entries = vec![
            Ok((OsString::from("a"), Ok(stat_of(1)))),
            Ok((
                OsString::from("locked"),
                Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            )),
        ];
        let err = collect_listing(entries).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let broken = vec![Err(io::Error::other("bad entry"))];
        assert!(collect_listing(broken).is_err());
    }

    #[test]
    fn native_env_is_shared() {
        let a = FsEnv::native();
        let b = FsEnv::native();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a.settings(), Settings::default());
    }
}
