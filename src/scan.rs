//! Reconciles several input trees into one logical view.
//!
//! Each relative path found in any root lands in the view: directories in
//! [`TreeInfo::subdirs`], files in [`TreeInfo::files`] with the largest size
//! seen across roots. The result does not depend on the order roots are scanned.

use crate::error::{Result, XorshareError};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Union of directory trees: relative subdirectories and file target lengths
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TreeInfo {
    /// Relative paths that are a directory in at least one root.
    /// The empty path stands for the roots themselves.
    pub subdirs: BTreeSet<PathBuf>,
    /// Relative file path to the maximum size seen across roots
    pub files: BTreeMap<PathBuf, u64>,
}

/// Scan every root and merge the results.
pub fn scan<P: AsRef<Path>>(roots: &[P]) -> Result<TreeInfo> {
    let mut info = TreeInfo::new();
    for root in roots {
        info.scan_root(root.as_ref())?;
    }
    Ok(info)
}

impl TreeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk one root depth-first, following symlinks, and merge what it holds.
    ///
    /// Anything that is neither a regular file nor a directory fails the scan.
    /// A root that is itself a file is recorded under the empty relative path.
    pub fn scan_root(&mut self, root: &Path) -> Result<()> {
        debug!("Scanning {}", root.display());
        let (dirs_before, files_before) = (self.subdirs.len(), self.files.len());

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .map_err(|_| XorshareError::UnsupportedEntry(path.to_path_buf()))?
                .to_path_buf();

            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.add_dir(rel)?;
            } else if file_type.is_file() {
                let size = entry
                    .metadata()
                    .map_err(XorshareError::Walk)?
                    .len();
                self.add_file(rel, size)?;
            } else {
                return Err(XorshareError::UnsupportedEntry(path.to_path_buf()));
            }
        }

        debug!(
            "Scanned {}: {} new directories, {} new files",
            root.display(),
            self.subdirs.len() - dirs_before,
            self.files.len() - files_before
        );
        Ok(())
    }

    fn add_dir(&mut self, rel: PathBuf) -> Result<()> {
        if self.files.contains_key(&rel) {
            return Err(XorshareError::EntryConflict(rel));
        }
        self.subdirs.insert(rel);
        Ok(())
    }

    fn add_file(&mut self, rel: PathBuf, size: u64) -> Result<()> {
        if self.subdirs.contains(&rel) {
            return Err(XorshareError::EntryConflict(rel));
        }
        let target = self.files.entry(rel).or_insert(0);
        *target = (*target).max(size);
        Ok(())
    }

    /// Target length for a relative file path
    pub fn target_length(&self, rel: &Path) -> Option<u64> {
        self.files.get(rel).copied()
    }

    /// Sum of all target lengths, i.e. bytes written to each output root
    pub fn total_bytes(&self) -> u64 {
        self.files.values().sum()
    }
}

/// Resolve a relative path under a root; the empty path is the root itself.
pub fn resolve(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_takes_max_size() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("f"), vec![1u8; 10]).unwrap();
        fs::write(b.path().join("f"), vec![2u8; 15]).unwrap();

        let info = scan(&[a.path(), b.path()]).unwrap();
        assert_eq!(info.target_length(Path::new("f")), Some(15));
        assert_eq!(info.total_bytes(), 15);
    }

    #[test]
    fn test_scan_unions_directories() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir_all(a.path().join("d/nested")).unwrap();
        fs::write(b.path().join("only_b.txt"), b"b").unwrap();

        let info = scan(&[a.path(), b.path()]).unwrap();
        assert!(info.subdirs.contains(Path::new("")));
        assert!(info.subdirs.contains(Path::new("d")));
        assert!(info.subdirs.contains(Path::new("d/nested")));
        assert_eq!(info.target_length(Path::new("only_b.txt")), Some(1));
    }

    #[test]
    fn test_scan_is_order_independent() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir(a.path().join("x")).unwrap();
        fs::write(a.path().join("x/one"), vec![0u8; 3]).unwrap();
        fs::write(a.path().join("two"), vec![0u8; 40]).unwrap();
        fs::create_dir(b.path().join("y")).unwrap();
        fs::write(b.path().join("y/three"), vec![0u8; 7]).unwrap();
        fs::write(b.path().join("two"), vec![0u8; 4]).unwrap();

        let forward = scan(&[a.path(), b.path()]).unwrap();
        let backward = scan(&[b.path(), a.path()]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.target_length(Path::new("two")), Some(40));
    }

    #[test]
    fn test_empty_file_is_listed() {
        let a = tempdir().unwrap();
        fs::write(a.path().join("empty"), b"").unwrap();
        let info = scan(&[a.path()]).unwrap();
        assert_eq!(info.target_length(Path::new("empty")), Some(0));
    }

    #[test]
    fn test_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("secret");
        fs::write(&file, b"hi").unwrap();

        let info = scan(&[&file]).unwrap();
        assert!(info.subdirs.is_empty());
        assert_eq!(info.target_length(Path::new("")), Some(2));
        assert_eq!(resolve(&file, Path::new("")), file);
    }

    #[test]
    fn test_kind_conflict_in_either_order() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir(a.path().join("p")).unwrap();
        fs::write(b.path().join("p"), b"file").unwrap();

        for roots in [[a.path(), b.path()], [b.path(), a.path()]] {
            match scan(&roots).unwrap_err() {
                XorshareError::EntryConflict(p) => assert_eq!(p, PathBuf::from("p")),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(scan(&[missing]), Err(XorshareError::Walk(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_is_rejected() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("sock");
        let _listener = std::os::unix::net::UnixListener::bind(&sock).unwrap();

        match scan(&[dir.path()]).unwrap_err() {
            XorshareError::UnsupportedEntry(p) => assert_eq!(p, sock),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_followed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("target"), vec![9u8; 6]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("link")).unwrap();

        let info = scan(&[dir.path()]).unwrap();
        assert_eq!(info.target_length(Path::new("link")), Some(6));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_fails() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("link")).unwrap();
        assert!(scan(&[dir.path()]).is_err());
    }

    #[test]
    fn test_resolve_joins_relative_path() {
        assert_eq!(
            resolve(Path::new("/out"), Path::new("a/b")),
            PathBuf::from("/out/a/b")
        );
    }
}
