//! Path resolution and manipulation utilities.
//! All string handling here is pure; only [`lookup`] touches the disk.

use crate::config::*;
use crate::directory::{dir_lookup, DirEntry};
use crate::error::{FsError, Result};
use crate::{BlockDevice, FcbLocation, fcb::get_fcb};

/// Non-empty segments of a path.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalizes `relative` against the absolute directory `cwd`.
/// A `relative` starting with `/` is absolute already. `.` segments are
/// dropped and `..` goes up one level, stopping at the root.
pub fn resolve_absolute_path(cwd: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        split_segments(cwd)
    };
    for segment in split_segments(relative) {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    if segments.is_empty() {
        return ROOT_PATH.to_string();
    }
    segments.iter().fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(segment);
        path
    })
}

/// Splits an absolute path into its parent directory and final name.
/// The root has no parent.
pub fn split_parent(path: &str) -> Result<(String, String)> {
    let mut segments = split_segments(path);
    let name = segments.pop().ok_or(FsError::InvalidPath)?;
    let parent = if segments.is_empty() {
        ROOT_PATH.to_string()
    } else {
        format!("/{}", segments.join("/"))
    };
    Ok((parent, name.to_string()))
}

/// Resolves an absolute, normalized path to its directory entry.
/// The root resolves to its own "." entry.
pub fn lookup(device: &impl BlockDevice, root_block: u16, path: &str) -> Result<DirEntry> {
    let root_location = FcbLocation { block: root_block, slot: 0 };
    let mut current = DirEntry {
        location: root_location,
        fcb: get_fcb(device, root_location)?,
    };
    for segment in split_segments(path) {
        if !current.fcb.is_dir() {
            return Err(FsError::NotFound);
        }
        current = dir_lookup(device, current.fcb.first, segment)?;
    }
    Ok(current)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_absolute_path("/a/b", ".."), "/a");
        assert_eq!(resolve_absolute_path("/a/b", "."), "/a/b");
        assert_eq!(resolve_absolute_path("/a/b", "../c"), "/a/c");
        assert_eq!(resolve_absolute_path("/a/b", "c/./d"), "/a/b/c/d");
    }

    #[test]
    fn test_resolve_at_root() {
        assert_eq!(resolve_absolute_path("/", ".."), "/");
        assert_eq!(resolve_absolute_path("/", "../../x"), "/x");
        assert_eq!(resolve_absolute_path("/a", "/b//c/"), "/b/c");
        assert_eq!(resolve_absolute_path("/a", "/"), "/");
    }

    #[test]
    fn test_split_parent() {
        assert_eq!(split_parent("/a/b.txt").unwrap(), ("/a".to_string(), "b.txt".to_string()));
        assert_eq!(split_parent("/x").unwrap(), ("/".to_string(), "x".to_string()));
        assert!(split_parent("/").is_err());
    }
}
