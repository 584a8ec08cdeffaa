//! The open-file table: a bounded set of handles, each holding a working copy
//! of an entry's FCB. Changes to the copy reach the disk only on close.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::Fcb;

/// Index of a slot in the open-file table.
pub type Handle = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub fcb: Fcb,
    /// Absolute path the entry was opened by.
    pub path: String,
    pub cursor: usize,
    /// The on-disk FCB must be refreshed from `fcb` on close.
    pub dirty: bool,
}

impl OpenFile {
    pub fn new(fcb: Fcb, path: String) -> Self {
        Self {
            fcb,
            path,
            cursor: 0,
            dirty: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
    cwd: Handle,
}

impl OpenFileTable {
    /// A table whose slot 0 holds `root`.
    pub fn new(root: OpenFile) -> Self {
        let mut slots = vec![None; MAX_OPEN_FILES];
        slots[CWD_SLOT] = Some(root);
        Self { slots, cwd: CWD_SLOT }
    }

    /// Puts `file` into the first free slot.
    pub fn insert(&mut self, file: OpenFile) -> Result<Handle> {
        let handle = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::OpenTableFull)?;
        self.slots[handle] = Some(file);
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Result<&OpenFile> {
        self.slots
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(FsError::InvalidHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidHandle(handle))
    }

    /// Frees a slot and hands back what it held.
    pub fn remove(&mut self, handle: Handle) -> Result<OpenFile> {
        if handle == CWD_SLOT || handle == self.cwd {
            return Err(FsError::NotPermitted);
        }
        self.slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(FsError::InvalidHandle(handle))
    }

    pub fn find_by_path(&self, path: &str) -> Option<Handle> {
        self.iter()
            .find(|(_, file)| file.path == path)
            .map(|(handle, _)| handle)
    }

    /// Occupied slots in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &OpenFile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(handle, slot)| slot.as_ref().map(|file| (handle, file)))
    }

    /// True if `path` or anything below it is open.
    pub fn is_busy(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.iter()
            .any(|(_, file)| file.path == path || file.path.starts_with(&prefix))
    }

    pub fn cwd(&self) -> Handle {
        self.cwd
    }

    /// Points the current directory at an open directory handle.
    pub fn change_directory(&mut self, handle: Handle) -> Result<()> {
        if !self.get(handle)?.fcb.is_dir() {
            return Err(FsError::NotDirectory);
        }
        self.cwd = handle;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}
