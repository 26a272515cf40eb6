use std::fs;
use std::fs::DirBuilder;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::time::SystemTime;

use filetime::FileTime;
use log::debug;

use crate::Path;
use crate::errors::Error;
use crate::errors::Result;

impl Path {
    fn dir_builder(&self, recursive: bool) -> DirBuilder {
        let mut builder = DirBuilder::new();
        builder.recursive(recursive);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.env().settings().dir_mode);
        }
        builder
    }

    /// Creates this directory and any missing parents.
    pub fn mkdir_all(&self) -> Result<()> {
        self.dir_builder(true)
            .create(self.as_path())
            .map_err(|e| Error::Create {
                what: format!("directory {self}"),
                how: e,
            })
    }

    /// Creates this directory. The parent must exist.
    pub fn mkdir(&self) -> Result<()> {
        self.dir_builder(false)
            .create(self.as_path())
            .map_err(|e| Error::Create {
                what: format!("directory {self}"),
                how: e,
            })
    }

    /// Removes this file or empty directory.
    pub fn remove(&self) -> Result<()> {
        let is_dir = fs::symlink_metadata(self.as_path()).map(|m| m.is_dir());
        let removed = match is_dir {
            Ok(true) => fs::remove_dir(self.as_path()),
            Ok(false) => fs::remove_file(self.as_path()),
            Err(e) => Err(e),
        };
        removed.map_err(|e| Error::Delete {
            what: self.to_string(),
            how: e,
        })
    }

    /// Removes this path and everything below it. A missing path is not an
    /// error.
    pub fn remove_all(&self) -> Result<()> {
        let removed = match fs::symlink_metadata(self.as_path()) {
            Ok(m) if m.is_dir() => fs::remove_dir_all(self.as_path()),
            Ok(_) => fs::remove_file(self.as_path()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        removed.map_err(|e| Error::Delete {
            what: self.to_string(),
            how: e,
        })
    }

    /// Sets the access and modification times, following symlinks.
    ///
    /// Works by path, so the entry is never opened: FIFOs do not block and
    /// write-only files need no read permission.
    pub fn chtimes(&self, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        filetime::set_file_times(
            self.as_path(),
            FileTime::from_system_time(atime),
            FileTime::from_system_time(mtime),
        )
        .map_err(|e| Error::Update {
            what: format!("times of {self}"),
            how: e,
        })
    }

    /// Reads the whole file.
    pub fn read_file(&self) -> Result<Vec<u8>> {
        fs::read(self.as_path()).map_err(|e| Error::Read {
            what: self.to_string(),
            how: e,
        })
    }

    /// Writes `data` to the file, creating it or truncating it first.
    pub fn write_file(&self, data: &[u8]) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.env().settings().file_mode);
        }
        options
            .open(self.as_path())
            .and_then(|mut f| f.write_all(data))
            .map_err(|e| Error::Write {
                what: self.to_string(),
                how: e,
            })
    }

    /// Copies this file's contents and permission mode to `dst`.
    ///
    /// `dst` is created or truncated, and its contents are synced to stable
    /// storage before the mode is applied. A failure part way through leaves
    /// whatever was already written in place.
    pub fn copy_to(&self, dst: &Path) -> Result<()> {
        let mut input = File::open(self.as_path()).map_err(|e| Error::Read {
            what: self.to_string(),
            how: e,
        })?;
        let mut output = File::create(dst.as_path()).map_err(|e| Error::Create {
            what: dst.to_string(),
            how: e,
        })?;
        let copied = io::copy(&mut input, &mut output).map_err(|e| Error::Write {
            what: dst.to_string(),
            how: e,
        })?;
        output.sync_all().map_err(|e| Error::Sync {
            what: dst.to_string(),
            how: e,
        })?;

        let stat = self.stat()?;
        let template = output
            .metadata()
            .map_err(|e| Error::Read {
                what: format!("metadata of {dst}"),
                how: e,
            })?
            .permissions();
        fs::set_permissions(dst.as_path(), stat.permissions(template)).map_err(|e| {
            Error::Update {
                what: format!("permissions of {dst}"),
                how: e,
            }
        })?;
        debug!("copied {copied} bytes from {self} to {dst}");
        Ok(())
    }
}
