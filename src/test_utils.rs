use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::fs::create_dir_all;
use std::io;
use std::path::Path as StdPath;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use tempdir::TempDir;

use crate::Backend;
use crate::Error;
use crate::FileStat;
use crate::FsEnv;
use crate::NativeBackend;
use crate::Path;
use crate::Settings;

// File paths and optional contents to create in the temporary test
pub(crate) static TEMP_FILES: &[(&str, &str, bool)] = &[
    ("file1.txt", "", false),
    ("file2.txt", "", false),
    ("dir1", "", true),
    ("dir1/file3.txt", "", false),
    ("dir1/dir2", "", true),
    ("dir1/dir2/file4.txt", "", false),
    ("dir1/dir2/dir_empty1", "", true),
    ("dir3", "", true),
    ("dir3/file6.txt", "", false),
];

/// Utility structure for managing a temporary test directory and its files.
#[derive(Debug)]
pub struct TestRoot {
    /// Root of the temporary test directory.
    pub root: TempDir,
    /// Metadata of every file and directory created through this root.
    pub files: BTreeMap<PathBuf, FileStat>,

    save_path: Option<PathBuf>,
}

impl TestRoot {
    /// Creates a new `TestRoot` seeded with a small tree of files. When
    /// `save_path` is given the tree is copied under `/tmp/` on drop.
    pub fn new(save_path: Option<&str>) -> Result<Self, Error> {
        let root = TempDir::new("fspath").map_err(|e| Error::Create {
            what: "temporary directory".into(),
            how: e,
        })?;
        let mut ret = Self {
            root,
            files: BTreeMap::new(),
            save_path: save_path.map(|p| StdPath::new("/tmp/").join(p)),
        };
        for (relative_path, contents, is_dir) in TEMP_FILES {
            if *is_dir {
                let dir = ret.root.path().join(relative_path);
                create_dir_all(&dir).map_err(|e| Error::Create {
                    what: format!("directory {}", dir.display()),
                    how: e,
                })?;
                ret.record(relative_path)?;
            } else {
                ret.create_file(relative_path, Some(*contents))?;
            }
        }
        Ok(ret)
    }

    fn record(&mut self, relative_path: &str) -> Result<(), Error> {
        let full_path = self.root.path().join(relative_path);
        let stat = FileStat::from_path(&full_path).map_err(|e| Error::Read {
            what: full_path.display().to_string(),
            how: e,
        })?;
        self.files.insert(relative_path.into(), stat);
        Ok(())
    }

    /// Creates a new file with the specified relative path and content in the
    /// temporary test directory. Missing parents are created.
    pub fn create_file(&mut self, relative_path: &str, content: Option<&str>) -> Result<(), Error> {
        let full_path = self.root.path().join(relative_path);
        let io_err = |e: io::Error| Error::Create {
            what: full_path.display().to_string(),
            how: e,
        };
        if let Some(parent) = full_path.parent() {
            create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&full_path, content.unwrap_or("")).map_err(io_err)?;
        self.record(relative_path)
    }

    /// A natively backed `Path` for `relative_path` inside the root.
    pub fn path(&self, relative_path: &str) -> Path {
        self.path_in(&FsEnv::native(), relative_path)
    }

    /// A `Path` for `relative_path` inside the root, bound to `env`.
    pub fn path_in(&self, env: &Arc<FsEnv>, relative_path: &str) -> Path {
        let full = self.root.path().join(relative_path);
        match Path::with_env(full, env.clone()) {
            Some(p) => p,
            None => unreachable!("temporary directory paths are never empty"),
        }
    }

    fn copy_dir_all(src: impl AsRef<StdPath>, dst: impl AsRef<StdPath>) -> io::Result<()> {
        create_dir_all(&dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                Self::copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
            } else {
                fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
            }
        }
        Ok(())
    }
}

impl Drop for TestRoot {
    fn drop(&mut self) {
        if let Some(save_path) = &self.save_path {
            let _ = Self::copy_dir_all(self.root.path(), save_path);
            println!("TestRoot preserved at {}", save_path.to_string_lossy());
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }
}

impl ManualClock {
    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    /// Current reading.
    pub fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// [`NativeBackend`] driven by a [`ManualClock`] that counts filesystem
/// queries.
#[derive(Debug, Default)]
pub struct CountingBackend {
    clock: ManualClock,
    stat_calls: AtomicUsize,
    read_dir_calls: AtomicUsize,
}

impl CountingBackend {
    /// An environment with default settings backed by a new counting backend,
    /// along with a handle to that backend.
    pub fn env() -> (Arc<FsEnv>, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        let env = Arc::new(FsEnv::new(Box::new(backend.clone()), Settings::default()));
        (env, backend)
    }

    /// Clock used for cache freshness.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of `stat` calls so far, failed ones included.
    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    /// Number of `read_dir` calls so far.
    pub fn read_dir_calls(&self) -> usize {
        self.read_dir_calls.load(Ordering::SeqCst)
    }
}

impl Backend for CountingBackend {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn stat(&self, path: &StdPath) -> io::Result<FileStat> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        NativeBackend.stat(path)
    }

    fn read_dir(&self, path: &StdPath) -> io::Result<Vec<(OsString, FileStat)>> {
        self.read_dir_calls.fetch_add(1, Ordering::SeqCst);
        NativeBackend.read_dir(path)
    }
}
