use std::ffi::OsStr;
use std::ops::Deref;

use crate::Path;
use crate::lexical::to_bytes;

/// An ordered list of paths, as returned by [`Path::read_dir`].
///
/// Duplicates are allowed. The `filter_*` methods keep the matching entries in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList(Vec<Path>);

impl PathList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `path`.
    pub fn add(&mut self, path: Path) {
        self.0.push(path);
    }

    /// Appends every path of `other`.
    pub fn add_all(&mut self, other: PathList) {
        self.0.extend(other.0);
    }

    /// Appends `path` unless an equal path is already present.
    pub fn add_if_missing(&mut self, path: Path) {
        if !self.contains(&path) {
            self.add(path);
        }
    }

    /// Sorts the list by path.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.as_path().cmp(b.as_path()));
    }

    /// String form of every path.
    pub fn as_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.to_string()).collect()
    }

    /// Keeps only directories. Entries whose metadata cannot be read are
    /// dropped.
    pub fn filter_dirs(&mut self) {
        self.0.retain(|p| p.is_dir().unwrap_or(false));
    }

    /// Keeps only entries that are not directories.
    pub fn filter_out_dirs(&mut self) {
        self.0.retain(|p| p.is_not_dir().unwrap_or(false));
    }

    /// Drops entries whose name starts with a dot.
    pub fn filter_out_hidden_files(&mut self) {
        self.0.retain(|p| !to_bytes(&p.base()).starts_with(b"."));
    }

    /// Keeps entries whose name starts with one of `prefixes`.
    pub fn filter_prefix<S: AsRef<OsStr>>(&mut self, prefixes: &[S]) {
        self.0.retain(|p| {
            let base = p.base();
            let base = to_bytes(&base);
            prefixes
                .iter()
                .any(|prefix| base.starts_with(&to_bytes(prefix.as_ref())))
        });
    }

    /// Keeps entries whose name ends with one of `suffixes`.
    pub fn filter_suffix<S: AsRef<OsStr>>(&mut self, suffixes: &[S]) {
        self.0.retain(|p| {
            let base = p.base();
            let base = to_bytes(&base);
            suffixes
                .iter()
                .any(|suffix| base.ends_with(&to_bytes(suffix.as_ref())))
        });
    }
}

impl Deref for PathList {
    type Target = [Path];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for PathList {
    type Item = Path;
    type IntoIter = std::vec::IntoIter<Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PathList {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Path> for PathList {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Path>> for PathList {
    fn from(paths: Vec<Path>) -> Self {
        Self(paths)
    }
}
