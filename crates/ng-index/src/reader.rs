// SPDX-License-Identifier: MIT OR Apache-2.0
//! The narrow filesystem capability the loader depends on.

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// What a filesystem path currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at this path.
    Missing,
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// Exists but is neither a plain file nor a directory (e.g. a symlink
    /// loop, device node, or socket).
    Other,
}

/// Narrow capability surface the loader needs: existence checks, a byte
/// read, a size, and a last-write-time. Implemented by [`StdFileReader`] for
/// production and freely fakeable in tests.
pub trait FileReader {
    /// Classifies what currently exists at `path`.
    fn kind(&self, path: &Path) -> PathKind;
    /// Reads the full contents of the file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Returns the size in bytes of the file at `path`.
    fn len(&self, path: &Path) -> io::Result<u64>;
    /// Returns the last-write-time of the file at `path`.
    fn mtime(&self, path: &Path) -> io::Result<SystemTime>;
}

/// A [`FileReader`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileReader;

impl FileReader for StdFileReader {
    fn kind(&self, path: &Path) -> PathKind {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(_) => PathKind::Other,
            Err(_) => PathKind::Missing,
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn len(&self, path: &Path) -> io::Result<u64> {
        std::fs::metadata(path).map(|m| m.len())
    }

    fn mtime(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_reader_reports_missing_for_nonexistent_path() {
        let reader = StdFileReader;
        assert_eq!(reader.kind(Path::new("/no/such/path/at/all")), PathKind::Missing);
    }

    #[test]
    fn std_reader_round_trips_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello").unwrap();

        let reader = StdFileReader;
        assert_eq!(reader.kind(&path), PathKind::File);
        assert_eq!(reader.len(&path).unwrap(), 5);
        assert_eq!(reader.read(&path).unwrap(), b"hello");
        assert!(reader.mtime(&path).is_ok());
    }

    #[test]
    fn std_reader_reports_directory_kind() {
        let dir = tempfile::tempdir().unwrap();
        let reader = StdFileReader;
        assert_eq!(reader.kind(dir.path()), PathKind::Directory);
    }
}
