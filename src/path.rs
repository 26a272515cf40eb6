use std::cell::RefCell;
use std::ffi::OsStr;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::Path as StdPath;
use std::path::PathBuf;
use std::sync::Arc;

use derivative::Derivative;
use log::debug;
use log::trace;

use crate::CacheStats;
use crate::FileStat;
use crate::FsEnv;
use crate::PathList;
use crate::cache::StatCache;
use crate::errors::Error;
use crate::errors::Result;
use crate::lexical;
use crate::lexical::from_bytes;
use crate::lexical::to_bytes;
use crate::symlink::eval_symlinks;

/// A filesystem location that may or may not exist.
///
/// Besides the path itself a `Path` remembers the last metadata snapshot it
/// read. Predicates such as [`Path::exist`] and [`Path::is_dir`] reuse that
/// snapshot while it is younger than the freshness window (50ms by default),
/// so back-to-back checks cost a single `stat`. Changes made to the file
/// within the window are not observed; call [`Path::stat`] to force a
/// refresh.
///
/// The snapshot lives in a `RefCell`, so a `Path` can be sent to another
/// thread but not shared between threads.
#[derive(Derivative)]
#[derivative(Debug, PartialEq, Eq, Hash)]
pub struct Path {
    path: PathBuf,
    #[derivative(Debug = "ignore", PartialEq = "ignore", Hash = "ignore")]
    cache: RefCell<StatCache>,
    #[derivative(Debug = "ignore", PartialEq = "ignore", Hash = "ignore")]
    env: Arc<FsEnv>,
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Clones the path only; the clone starts without cached metadata.
impl Clone for Path {
    fn clone(&self) -> Self {
        self.derive(self.path.clone())
    }
}

impl AsRef<StdPath> for Path {
    fn as_ref(&self) -> &StdPath {
        &self.path
    }
}

impl From<Path> for PathBuf {
    fn from(path: Path) -> Self {
        path.path
    }
}

impl Path {
    /// Creates a `Path` bound to the native filesystem. Returns `None` for an
    /// empty path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Option<Path> {
        Self::with_env(path, FsEnv::native())
    }

    /// Creates a `Path` bound to `env`. Returns `None` for an empty path.
    pub fn with_env<P: Into<PathBuf>>(path: P, env: Arc<FsEnv>) -> Option<Path> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return None;
        }
        Some(Path {
            path,
            cache: RefCell::default(),
            env,
        })
    }

    // Lexical results are never empty, so they skip the `Option`.
    fn derive(&self, path: PathBuf) -> Path {
        Path {
            path,
            cache: RefCell::default(),
            env: self.env.clone(),
        }
    }

    fn bytes(&self) -> std::borrow::Cow<'_, [u8]> {
        to_bytes(self.path.as_os_str())
    }

    fn what(&self) -> String {
        self.path.display().to_string()
    }

    /// The wrapped platform path.
    pub fn as_path(&self) -> &StdPath {
        &self.path
    }

    /// Environment this path queries metadata through.
    pub fn env(&self) -> &Arc<FsEnv> {
        &self.env
    }

    /// Joins `elem` onto this path and cleans the result.
    pub fn join<S: AsRef<OsStr>>(&self, elem: S) -> Path {
        self.join_all([elem])
    }

    /// Joins every element of `elems` onto this path and cleans the result.
    /// Empty elements are ignored and absolute elements are appended like any
    /// other.
    pub fn join_all<I, S>(&self, elems: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let elems: Vec<S> = elems.into_iter().collect();
        let base = self.bytes();
        let rest: Vec<_> = elems.iter().map(|e| to_bytes(e.as_ref())).collect();
        let joined = lexical::join(std::iter::once(&*base).chain(rest.iter().map(|b| &**b)));
        self.derive(from_bytes(joined))
    }

    /// Joins the given paths onto this path one after the other.
    pub fn join_path<'a, I>(&self, paths: I) -> Path
    where
        I: IntoIterator<Item = &'a Path>,
    {
        paths
            .into_iter()
            .fold(self.clone(), |acc, p| acc.join(p.path.as_os_str()))
    }

    /// Last element of the path, ignoring trailing separators.
    pub fn base(&self) -> OsString {
        from_bytes(lexical::base(&self.bytes())).into_os_string()
    }

    /// Extension of the last element including the dot, or an empty string.
    pub fn ext(&self) -> OsString {
        from_bytes(lexical::ext(&self.bytes()).to_vec()).into_os_string()
    }

    /// Shortest path lexically equivalent to this one.
    pub fn clean(&self) -> Path {
        self.derive(from_bytes(lexical::clean(&self.bytes())))
    }

    /// All but the last element of the path.
    pub fn parent(&self) -> Path {
        self.derive(from_bytes(lexical::dir(&self.bytes())))
    }

    /// Relative path that, joined to `self`, is lexically equivalent to
    /// `target`.
    pub fn rel_to(&self, target: &Path) -> Result<Path> {
        let rel = lexical::rel(&self.bytes(), &target.bytes())?;
        Ok(self.derive(from_bytes(rel)))
    }

    /// Absolute form of this path, resolved against the current directory.
    pub fn abs(&self) -> Result<Path> {
        if self.is_abs() {
            return Ok(self.clean());
        }
        let cwd = std::env::current_dir().map_err(|e| Error::Read {
            what: "current directory".into(),
            how: e,
        })?;
        let cwd = to_bytes(cwd.as_os_str());
        let own = self.bytes();
        let joined = lexical::join([&*cwd, &*own]);
        Ok(self.derive(from_bytes(joined)))
    }

    /// Whether the path is absolute.
    pub fn is_abs(&self) -> bool {
        self.path.is_absolute()
    }

    /// Rewrites this path into its absolute form. The cached snapshot is
    /// kept since the path still names the same entry.
    pub fn to_abs(&mut self) -> Result<()> {
        let abs = self.abs()?;
        self.path = abs.path;
        Ok(())
    }

    /// Whether `prefix` is a leading run of whole elements of this path, after
    /// cleaning both.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        self.clean().path.starts_with(&prefix.clean().path)
    }

    /// Queries the filesystem and refreshes the cached snapshot.
    ///
    /// A failed query leaves the cache untouched.
    pub fn stat(&self) -> Result<FileStat> {
        let stat = self.env.backend.stat(&self.path).map_err(|e| Error::Read {
            what: format!("metadata of {}", self.what()),
            how: e,
        })?;
        debug!("refreshed metadata of {}", self.path.display());
        self.cache
            .borrow_mut()
            .put(stat.clone(), self.env.backend.now());
        Ok(stat)
    }

    /// Snapshot if it is still fresh, otherwise a refresh.
    fn cached_stat(&self) -> Result<FileStat> {
        let now = self.env.backend.now();
        let hit = self
            .cache
            .borrow_mut()
            .get(now, self.env.settings.freshness)
            .cloned();
        match hit {
            Some(stat) => {
                trace!("metadata cache hit for {}", self.path.display());
                Ok(stat)
            }
            None => self.stat(),
        }
    }

    pub(crate) fn seed_cache(&self, stat: FileStat, now: std::time::Instant) {
        self.cache.borrow_mut().put(stat, now);
    }

    /// Hit and miss counters of this path's snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    /// Whether a snapshot is currently held, fresh or not.
    pub fn is_cached(&self) -> bool {
        !self.cache.borrow().is_empty()
    }

    /// True if the path exists. A missing path is `Ok(false)`; any other
    /// failure is returned.
    pub fn exist(&self) -> Result<bool> {
        match self.cached_stat() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// True if the path does not exist.
    pub fn not_exist(&self) -> Result<bool> {
        self.exist().map(|exists| !exists)
    }

    /// True if the path exists and is a directory. A missing path is
    /// `Ok(false)`.
    pub fn is_dir(&self) -> Result<bool> {
        match self.cached_stat() {
            Ok(stat) => Ok(stat.is_directory),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// True if the path is missing or is not a directory.
    pub fn is_not_dir(&self) -> Result<bool> {
        self.is_dir().map(|is_dir| !is_dir)
    }

    /// Replaces this path with the one obtained by resolving every symlink in
    /// it. Paths without symlinks are only cleaned.
    ///
    /// The cached snapshot is dropped since it described the link, not its
    /// target.
    pub fn follow_symlink(&mut self) -> Result<()> {
        let resolved = eval_symlinks(&self.path).map_err(|e| Error::Read {
            what: format!("symlinks of {}", self.what()),
            how: e,
        })?;
        debug!(
            "{} resolved to {}, dropping cached metadata",
            self.path.display(),
            resolved.display()
        );
        self.path = resolved;
        self.cache.borrow_mut().clear();
        Ok(())
    }

    /// Lists the immediate children of this directory, sorted by name.
    ///
    /// Each child comes with its cache seeded from the listing.
    pub fn read_dir(&self) -> Result<PathList> {
        let entries = self
            .env
            .backend
            .read_dir(&self.path)
            .map_err(|e| Error::Read {
                what: format!("directory {}", self.what()),
                how: e,
            })?;
        let now = self.env.backend.now();
        debug!("listed {} entries in {}", entries.len(), self.path.display());
        let mut paths = PathList::new();
        for (name, stat) in entries {
            let child = self.join(&name);
            child.seed_cache(stat, now);
            paths.add(child);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::Path;
    use crate::test_utils::CountingBackend;
    use crate::test_utils::TestRoot;

    #[test]
    fn display_round_trips() {
        for s in ["a", "a/b/../c", "/tmp//x/", ".", "héllo wörld"] {
            assert_eq!(Path::new(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn empty_path_is_none() {
        assert!(Path::new("").is_none());
    }

    #[test]
    fn equality_ignores_cache() {
        let root = TestRoot::new(None).unwrap();
        let a = root.path("file1.txt");
        let b = a.clone();
        a.stat().unwrap();
        assert!(a.is_cached());
        assert!(!b.is_cached());
        assert_eq!(a, b);
    }

    #[test]
    fn join_variants() {
        let p = Path::new("/a/b").unwrap();
        assert_eq!(p.join("c").to_string(), "/a/b/c");
        assert_eq!(p.join_all(["c", "", "../d"]).to_string(), "/a/b/d");
        let q = Path::new("x/y").unwrap();
        assert_eq!(p.join_path([&q, &q]).to_string(), "/a/b/x/y/x/y");
        assert_eq!(p.join_path([]).to_string(), "/a/b");
    }

    #[test]
    fn lexical_accessors() {
        let p = Path::new("dir/./sub/file.tar.gz").unwrap();
        assert_eq!(p.base(), "file.tar.gz");
        assert_eq!(p.ext(), ".gz");
        assert_eq!(p.clean().to_string(), "dir/sub/file.tar.gz");
        assert_eq!(p.parent().to_string(), "dir/sub");
        assert_eq!(Path::new("file").unwrap().parent().to_string(), ".");
    }

    #[test]
    fn rel_to() {
        let base = Path::new("/a/b").unwrap();
        let target = Path::new("/a/c/d").unwrap();
        assert_eq!(base.rel_to(&target).unwrap().to_string(), "../c/d");
        assert!(base.rel_to(&Path::new("c").unwrap()).is_err());
    }

    #[test]
    fn abs_and_to_abs() {
        let cwd = std::env::current_dir().unwrap();
        let rel = Path::new("some/../thing").unwrap();
        assert!(!rel.is_abs());
        let abs = rel.abs().unwrap();
        assert!(abs.is_abs());
        assert_eq!(abs.as_path(), cwd.join("thing"));

        let mut p = rel.clone();
        p.to_abs().unwrap();
        assert_eq!(p, abs);
        assert_eq!(rel.to_string(), "some/../thing");
    }

    #[test]
    fn to_abs_keeps_the_snapshot() {
        // Tests run from the package root.
        let (env, backend) = CountingBackend::env();
        let mut p = Path::with_env("src/../Cargo.toml", env).unwrap();
        assert!(p.exist().unwrap());
        assert!(p.is_cached());

        p.to_abs().unwrap();
        assert!(p.is_abs());
        assert!(p.is_cached());
        assert!(!p.is_dir().unwrap());
        assert_eq!(backend.stat_calls(), 1);
        assert_eq!(p.cache_stats().hits, 1);
    }

    #[test]
    fn has_prefix() {
        let p = Path::new("/a/b/c").unwrap();
        assert!(p.has_prefix(&Path::new("/a/b").unwrap()));
        assert!(p.has_prefix(&Path::new("/a/./b/").unwrap()));
        assert!(!p.has_prefix(&Path::new("/a/bc").unwrap()));
    }

    #[test]
    fn two_queries_within_window_hit_the_filesystem_once() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let p = root.path_in(&env, "file1.txt");

        assert!(p.stat().is_ok());
        backend.clock().advance(Duration::from_millis(10));
        assert!(p.exist().unwrap());
        assert!(!p.is_dir().unwrap());
        assert_eq!(backend.stat_calls(), 1);
        assert_eq!(p.cache_stats().hits, 2);
    }

    #[test]
    fn query_after_window_refreshes_once() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let p = root.path_in(&env, "dir1");

        assert!(p.is_dir().unwrap());
        assert_eq!(backend.stat_calls(), 1);
        backend.clock().advance(Duration::from_millis(50));
        assert!(p.is_dir().unwrap());
        assert!(p.exist().unwrap());
        assert_eq!(backend.stat_calls(), 2);
    }

    #[test]
    fn stale_data_is_served_within_window() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let p = root.path_in(&env, "file2.txt");

        assert!(p.exist().unwrap());
        std::fs::remove_file(p.as_path()).unwrap();
        assert!(p.exist().unwrap());
        backend.clock().advance(Duration::from_millis(51));
        assert!(!p.exist().unwrap());
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let p = root.path_in(&env, "file1.txt");

        let before = p.stat().unwrap();
        std::fs::remove_file(p.as_path()).unwrap();
        assert!(p.stat().unwrap_err().is_not_found());
        assert!(p.is_cached());
        // Still inside the window of the last successful refresh.
        assert_eq!(p.cached_stat().unwrap(), before);
        assert_eq!(backend.stat_calls(), 2);
    }

    #[test]
    fn clone_starts_empty() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let p = root.path_in(&env, "file1.txt");
        p.stat().unwrap();

        let q = p.clone();
        assert!(!q.is_cached());
        assert!(q.exist().unwrap());
        assert_eq!(backend.stat_calls(), 2);
    }

    #[test]
    fn missing_path_does_not_exist() {
        let root = TestRoot::new(None).unwrap();
        let p = root.path("no/such/file");
        assert!(!p.exist().unwrap());
        assert!(p.not_exist().unwrap());
        assert!(!p.is_dir().unwrap());
        assert!(p.is_not_dir().unwrap());
        assert!(!p.is_cached());
    }

    #[test]
    fn unreachable_path_is_an_error() {
        let root = TestRoot::new(None).unwrap();
        // A regular file used as a directory component fails with ENOTDIR.
        let p = root.path("file1.txt/child");
        let err = p.exist().unwrap_err();
        assert!(!err.is_not_found());
        assert!(p.is_dir().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_parent_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let root = TestRoot::new(None).unwrap();
        let parent = root.root.path().join("dir3");
        std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users bypass permission bits; nothing to check then.
        let bypassed = std::fs::read_dir(&parent).is_ok();

        let p = root.path("dir3/file6.txt");
        let exist = p.exist();
        let is_dir = p.is_dir();
        std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o755)).unwrap();
        if bypassed {
            return;
        }
        let err = exist.unwrap_err();
        assert!(!err.is_not_found());
        assert!(is_dir.is_err());
        assert!(!p.is_cached());
    }

    #[test]
    fn read_dir_lists_children_with_seeded_cache() {
        let root = TestRoot::new(None).unwrap();
        let (env, backend) = CountingBackend::env();
        let dir = root.path_in(&env, "dir1");

        let children = dir.read_dir().unwrap();
        assert_eq!(backend.read_dir_calls(), 1);
        let names: Vec<_> = children.iter().map(|p| p.base()).collect();
        assert_eq!(names, ["dir2", "file3.txt"]);

        for child in &children {
            assert!(child.is_cached());
            assert_eq!(child.cached_stat().unwrap(), child.clone().stat().unwrap());
        }
        assert!(children.iter().all(|c| c.exist().unwrap()));
        // One uncached refresh per child from the comparison above only.
        assert_eq!(backend.stat_calls(), 2);
        assert_eq!(children[0].to_string(), dir.join("dir2").to_string());
    }

    #[test]
    fn read_dir_of_missing_directory_fails() {
        let root = TestRoot::new(None).unwrap();
        let err = root.path("nope").read_dir().unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn follow_symlink_rewrites_path_and_drops_cache() {
        let mut root = TestRoot::new(None).unwrap();
        root.create_file("target.txt", Some("0123456789")).unwrap();
        std::os::unix::fs::symlink("target.txt", root.root.path().join("link")).unwrap();

        let (env, backend) = CountingBackend::env();
        let original = root.path_in(&env, "link");
        original.stat().unwrap();

        let mut link = original.clone();
        link.stat().unwrap();
        link.follow_symlink().unwrap();
        assert!(!link.is_cached());
        assert_eq!(link.base(), "target.txt");
        assert_eq!(link.stat().unwrap().size, 10);

        assert_eq!(original.base(), "link");
        assert!(original.is_cached());
        assert_eq!(backend.stat_calls(), 3);
    }

    #[test]
    fn follow_symlink_without_links_only_cleans() {
        let root = TestRoot::new(None).unwrap();
        let mut p = root.path("dir1/./dir2/../file3.txt");
        p.follow_symlink().unwrap();
        let expected = std::fs::canonicalize(root.root.path().join("dir1/file3.txt")).unwrap();
        assert_eq!(p.as_path(), expected);
    }

    #[test]
    fn follow_symlink_of_missing_path_fails() {
        let root = TestRoot::new(None).unwrap();
        let mut p = root.path("missing");
        assert!(p.follow_symlink().unwrap_err().is_not_found());
        assert_eq!(p.base(), "missing");
    }
}
