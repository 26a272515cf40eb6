//! Filesystem path values with lexical helpers, pass-through I/O and a
//! short-lived metadata cache.
//!
//! A [`Path`] wraps a platform path and remembers the last metadata it read,
//! so existence and directory checks issued back to back cost a single
//! `stat`.
//!
//! ```rust
//! use fspath::Path;
//!
//! let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).unwrap().join("Cargo.toml");
//! assert!(manifest.exist().unwrap());
//! assert!(!manifest.is_dir().unwrap());
//! assert_eq!(manifest.base(), "Cargo.toml");
//!
//! let src = manifest.parent().join("src");
//! let rust_files = {
//!     let mut list = src.read_dir().unwrap();
//!     list.filter_suffix(&[".rs"]);
//!     list
//! };
//! assert!(rust_files.iter().any(|p| p.base() == "lib.rs"));
//! ```
//!
//! Lexical operations never touch the filesystem:
//!
//! ```rust
//! use fspath::Path;
//!
//! let p = Path::new("a/b/../c/").unwrap();
//! assert_eq!(p.clean().to_string(), "a/c");
//! assert_eq!(p.parent().to_string(), "a/c");
//! assert_eq!(p.join_all(["d", "e.txt"]).to_string(), "a/c/d/e.txt");
//! assert!(Path::new("").is_none());
//! ```

mod backend;
mod cache;
mod errors;
mod file;
mod lexical;
mod ops;
mod path;
mod path_list;
mod settings;
mod symlink;
pub mod utils;

pub use backend::Backend;
pub use backend::FsEnv;
pub use backend::NativeBackend;
pub use cache::CacheStats;
pub use errors::Error;
pub use errors::Result;
pub use file::FileStat;
pub use path::Path;
pub use path_list::PathList;
pub use settings::DEFAULT_DIR_MODE;
pub use settings::DEFAULT_FILE_MODE;
pub use settings::DEFAULT_FRESHNESS;
pub use settings::Settings;

#[cfg(feature = "test_utils")]
pub(crate) mod test_utils;
#[cfg(feature = "test_utils")]
pub use test_utils::CountingBackend;
#[cfg(feature = "test_utils")]
pub use test_utils::ManualClock;
#[cfg(feature = "test_utils")]
pub use test_utils::TestRoot;
