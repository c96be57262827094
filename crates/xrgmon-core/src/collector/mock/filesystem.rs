//! In-memory mock filesystem for testing collectors without real `/proc` or `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on any host, including ones without a GPU,
//! battery or hwmon chips.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files, directories and symbolic links in memory. Links are not
/// followed; they only answer `read_link` and show up in `read_dir`.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from link path to link target.
    links: HashMap<PathBuf, PathBuf>,
    /// Paths that exist but fail to read.
    unreadable: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symbolic link at `path` pointing to `target`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.links.insert(path, target.as_ref().to_path_buf());
    }

    /// Adds a file that exists but whose read fails with `PermissionDenied`.
    pub fn add_unreadable(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.unreadable.insert(path);
    }

    /// Removes a file, keeping its parent directories.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Loads a directory tree from disk and mounts it at `mount_point`.
    ///
    /// This is useful for regression tests with real `/sys` captures.
    /// Symlinks are recorded as links; unreadable files are skipped.
    pub fn from_snapshot(dir: &Path, mount_point: &Path) -> io::Result<Self> {
        let mut fs = Self::new();
        load_directory_recursive(&mut fs, dir, mount_point)?;
        Ok(fs)
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

fn load_directory_recursive(
    fs: &mut MockFs,
    real_path: &Path,
    virtual_path: &Path,
) -> io::Result<()> {
    fs.add_dir(virtual_path);

    for entry in std::fs::read_dir(real_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let real_child = entry.path();
        let virtual_child = virtual_path.join(entry.file_name());

        if file_type.is_symlink() {
            fs.add_symlink(&virtual_child, std::fs::read_link(&real_child)?);
        } else if file_type.is_dir() {
            load_directory_recursive(fs, &real_child, &virtual_child)?;
        } else if file_type.is_file()
            && let Ok(content) = std::fs::read_to_string(&real_child)
        {
            fs.add_file(&virtual_child, content);
        }
    }
    Ok(())
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.links.contains_key(path)
            || self.unreadable.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let is_child = |p: &PathBuf| p.parent().is_some_and(|parent| parent == path);

        let mut entries = HashSet::new();
        entries.extend(self.files.keys().filter(|p| is_child(p)).cloned());
        entries.extend(self.links.keys().filter(|p| is_child(p)).cloned());
        entries.extend(self.unreadable.iter().filter(|p| is_child(p)).cloned());
        entries.extend(
            self.directories
                .iter()
                .filter(|p| is_child(p) && p.as_path() != path)
                .cloned(),
        );

        Ok(entries.into_iter().collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.links.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "k10temp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "42000\n");
        fs.add_file("/sys/class/hwmon/hwmon1/name", "nvme\n");
        fs.add_symlink("/sys/class/hwmon/hwmon1/device", "../../nvme0");

        let chips = fs.read_dir(Path::new("/sys/class/hwmon")).unwrap();
        assert_eq!(chips.len(), 2);

        let hwmon1 = fs.read_dir(Path::new("/sys/class/hwmon/hwmon1")).unwrap();
        assert_eq!(hwmon1.len(), 2); // name and device link
    }

    #[test]
    fn test_mock_fs_read_link() {
        let mut fs = MockFs::new();
        fs.add_symlink(
            "/sys/class/drm/card0/device/driver",
            "../../../bus/pci/drivers/nouveau",
        );

        let target = fs
            .read_link(Path::new("/sys/class/drm/card0/device/driver"))
            .unwrap();
        assert_eq!(target.file_name().unwrap(), "nouveau");
        assert!(fs.exists(Path::new("/sys/class/drm/card0/device")));
        assert!(fs.read_link(Path::new("/sys/class/drm/card0")).is_err());
    }

    #[test]
    fn test_mock_fs_unreadable() {
        let mut fs = MockFs::new();
        fs.add_unreadable("/sys/class/drm/card0/device/gpu_busy_percent");

        let path = Path::new("/sys/class/drm/card0/device/gpu_busy_percent");
        assert!(fs.exists(path));
        assert_eq!(
            fs.read_to_string(path).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("hwmon0")).unwrap();
        std::fs::write(dir.path().join("hwmon0/name"), "coretemp\n").unwrap();
        std::fs::write(dir.path().join("hwmon0/temp1_input"), "51000\n").unwrap();

        let fs = MockFs::from_snapshot(dir.path(), Path::new("/sys/class/hwmon")).unwrap();

        let name = fs
            .read_to_string(Path::new("/sys/class/hwmon/hwmon0/name"))
            .unwrap();
        assert_eq!(name, "coretemp\n");
        assert_eq!(
            fs.read_dir(Path::new("/sys/class/hwmon/hwmon0")).unwrap().len(),
            2
        );
    }
}
