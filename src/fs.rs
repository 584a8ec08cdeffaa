use std::path::Path;

use log::{debug, info};

use crate::check::{self, Usage};
use crate::config::*;
use crate::date::TimeProvider;
use crate::directory::{self, DirEntry};
use crate::error::{FsError, Result};
use crate::fat;
use crate::fcb::{write_fcb, zero_block};
use crate::file::{fread, fwrite, WriteMode};
use crate::open_file::{Handle, OpenFile, OpenFileTable};
use crate::path::{self, resolve_absolute_path, split_parent, split_segments};
use crate::superblock::{read_superblock, write_superblock};
use crate::{Attribute, BlockDevice, DiskImage, Fcb, SuperBlock};

/// Lays out a fresh file system: superblock, both FATs with the reserved
/// region allocated, and a root directory holding "." and "..".
fn format_disk(device: &mut impl BlockDevice, clock: &dyn TimeProvider) -> Result<()> {
    write_superblock(device, &SuperBlock::new())?;
    fat::format_table(device)?;
    for block in 0..RESERVED_BLOCKS as u16 {
        fat::allocate_chain(device, block, 1)?;
    }

    let root = fat::find_free_run(device, ROOT_BLOCKS)?.ok_or(FsError::OutOfSpace)?;
    if root != ROOT_BLOCK {
        return Err(FsError::Corrupted(format!("root directory landed at block {root}")));
    }
    fat::allocate_chain(device, root, ROOT_BLOCKS)?;
    for block in root..root + ROOT_BLOCKS as u16 {
        zero_block(device, block)?;
    }
    let root_fcb = Fcb::new(
        DOT_NAME,
        Attribute::Directory,
        root,
        (ROOT_BLOCKS * BLOCK_SIZE) as u32,
        clock.current_date(),
        clock.current_time(),
    )?;
    directory::init_dir(device, clock, &root_fcb, &root_fcb)?;

    info!("formatted disk: {} blocks of {} bytes", NUM_BLOCKS, BLOCK_SIZE);
    Ok(())
}

/// "." and ".." entries are part of their directory and never removed on their own.
fn names_dot_entry(path: &str) -> bool {
    matches!(split_segments(path).last().copied(), Some(DOT_NAME | DOTDOT_NAME))
}

/// One session over one disk: the device, the open-file table and the
/// current directory. Every operation runs to completion before the next.
pub struct FileSystem<D: BlockDevice> {
    device: D,
    superblock: SuperBlock,
    open_files: OpenFileTable,
    clock: Box<dyn TimeProvider>,
    /// Directory handle `cd` opened by itself, released when `cd` moves on.
    cd_opened: Option<Handle>,
}

impl FileSystem<DiskImage> {
    /// Loads the image at `path`. A missing file is formatted and saved right away.
    pub fn start(path: impl AsRef<Path>, clock: Box<dyn TimeProvider>) -> Result<Self> {
        let (mut image, fresh) = DiskImage::load(path)?;
        if fresh {
            format_disk(&mut image, clock.as_ref())?;
            image.persist()?;
        }
        Self::mount(image, clock)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn format(mut device: D, clock: Box<dyn TimeProvider>) -> Result<Self> {
        format_disk(&mut device, clock.as_ref())?;
        Self::mount(device, clock)
    }

    pub fn mount(device: D, clock: Box<dyn TimeProvider>) -> Result<Self> {
        let superblock = read_superblock(&device)?;
        let root = path::lookup(&device, superblock.root, ROOT_PATH)?;
        info!("mounted: {}", superblock.information);
        Ok(Self {
            device,
            open_files: OpenFileTable::new(OpenFile::new(root.fcb, ROOT_PATH.to_string())),
            superblock,
            clock,
            cd_opened: None,
        })
    }

    /// Formats the mounted disk again. Open handles are dropped without being
    /// written back and the current directory returns to the root.
    /// A full format zeroes every block first and persists the result.
    pub fn reformat(&mut self, full: bool) -> Result<()> {
        if full {
            let zero = vec![0u8; BLOCK_SIZE];
            for block in 0..self.device.num_blocks() {
                self.device.write_block(block, &zero)?;
            }
        }
        format_disk(&mut self.device, self.clock.as_ref())?;
        self.superblock = read_superblock(&self.device)?;
        let root = path::lookup(&self.device, self.superblock.root, ROOT_PATH)?;
        self.open_files = OpenFileTable::new(OpenFile::new(root.fcb, ROOT_PATH.to_string()));
        self.cd_opened = None;
        if full {
            self.device.flush()?;
        }
        Ok(())
    }

    /// Absolute path of the current directory.
    pub fn pwd(&self) -> &str {
        self.open_files
            .get(self.open_files.cwd())
            .map_or(ROOT_PATH, |dir| dir.path.as_str())
    }

    /// Turns a path given by the user into a normalized absolute one.
    pub fn absolute(&self, path: &str) -> String {
        resolve_absolute_path(self.pwd(), path)
    }

    pub fn lookup(&self, path: &str) -> Result<DirEntry> {
        path::lookup(&self.device, self.superblock.root, &self.absolute(path))
    }

    fn create_at(&mut self, path: &str, attribute: Attribute) -> Result<DirEntry> {
        let abs = self.absolute(path);
        let (parent_path, name) = split_parent(&abs).map_err(|_| FsError::AlreadyExists)?;
        let parent = path::lookup(&self.device, self.superblock.root, &parent_path)?;
        if !parent.fcb.is_dir() {
            return Err(FsError::NotDirectory);
        }
        directory::create_entry(
            &mut self.device,
            self.clock.as_ref(),
            &parent.fcb,
            &name,
            attribute,
        )
    }

    pub fn mkdir(&mut self, path: &str) -> Result<DirEntry> {
        self.create_at(path, Attribute::Directory)
    }

    pub fn create(&mut self, path: &str) -> Result<DirEntry> {
        self.create_at(path, Attribute::Regular)
    }

    /// Removes an empty directory that nobody has open.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let abs = self.absolute(path);
        if abs == ROOT_PATH || names_dot_entry(path) {
            return Err(FsError::NotPermitted);
        }
        let entry = path::lookup(&self.device, self.superblock.root, &abs)?;
        if !entry.fcb.is_dir() {
            return Err(FsError::NotDirectory);
        }
        if self.open_files.is_busy(&abs) {
            return Err(FsError::Busy);
        }
        if !directory::dir_is_empty(&self.device, entry.fcb.first)? {
            return Err(FsError::NotEmpty);
        }
        directory::remove_entry(&mut self.device, &entry)
    }

    /// Removes a regular file that is not open.
    pub fn rm(&mut self, path: &str) -> Result<()> {
        if names_dot_entry(path) {
            return Err(FsError::NotPermitted);
        }
        let abs = self.absolute(path);
        let entry = path::lookup(&self.device, self.superblock.root, &abs)?;
        if entry.fcb.is_dir() {
            return Err(FsError::NotFile);
        }
        if self.open_files.is_busy(&abs) {
            return Err(FsError::Busy);
        }
        directory::remove_entry(&mut self.device, &entry)
    }

    /// Entries of a directory, or the entry itself for a file. Entries that
    /// are open show their working copy.
    pub fn ls(&self, path: Option<&str>) -> Result<Vec<DirEntry>> {
        let abs = self.absolute(path.unwrap_or(DOT_NAME));
        let target = path::lookup(&self.device, self.superblock.root, &abs)?;
        if !target.fcb.is_dir() {
            return Ok(vec![self.with_snapshot(&abs, target)]);
        }
        let entries = directory::read_dir(&self.device, target.fcb.first)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                if entry.fcb.is_dot() {
                    return entry;
                }
                let child = resolve_absolute_path(&abs, &entry.fcb.full_name());
                self.with_snapshot(&child, entry)
            })
            .collect())
    }

    fn with_snapshot(&self, abs: &str, entry: DirEntry) -> DirEntry {
        let file = self
            .open_files
            .find_by_path(abs)
            .and_then(|handle| self.open_files.get(handle).ok());
        match file {
            Some(file) => DirEntry {
                location: entry.location,
                fcb: file.fcb,
            },
            None => entry,
        }
    }

    /// Opens a file or directory. A path can be open only once.
    pub fn open(&mut self, path: &str) -> Result<Handle> {
        let abs = self.absolute(path);
        if self.open_files.find_by_path(&abs).is_some() {
            return Err(FsError::AlreadyOpen);
        }
        let entry = path::lookup(&self.device, self.superblock.root, &abs)?;
        let handle = self.open_files.insert(OpenFile::new(entry.fcb, abs))?;
        debug!("opened {} as handle {}", self.open_files.get(handle)?.path, handle);
        Ok(handle)
    }

    /// Handle of an open path.
    pub fn handle_of(&self, path: &str) -> Result<Handle> {
        self.open_files
            .find_by_path(&self.absolute(path))
            .ok_or(FsError::NotOpen)
    }

    fn write_back(&mut self, file: &OpenFile) -> Result<()> {
        let entry = path::lookup(&self.device, self.superblock.root, &file.path)?;
        write_fcb(&mut self.device, entry.location, &file.fcb)?;
        debug!("wrote back entry of {} (length {})", file.path, file.fcb.length);
        Ok(())
    }

    /// Releases a handle, writing its entry back if it changed.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let file = self.open_files.remove(handle)?;
        if file.dirty {
            self.write_back(&file)?;
        }
        debug!("closed handle {} ({})", handle, file.path);
        Ok(())
    }

    /// Closes every handle except the root slot and the current directory.
    pub fn close_all(&mut self) -> Result<()> {
        let cwd = self.open_files.cwd();
        let handles: Vec<Handle> = self
            .open_files
            .iter()
            .map(|(handle, _)| handle)
            .filter(|&handle| handle != CWD_SLOT && handle != cwd)
            .collect();
        for handle in handles {
            self.close(handle)?;
        }
        Ok(())
    }

    /// Makes an open directory handle the current directory.
    /// The caller owns that handle; `cd` no longer closes anything it opened.
    pub fn change_directory(&mut self, handle: Handle) -> Result<()> {
        self.open_files.change_directory(handle)?;
        self.cd_opened = None;
        Ok(())
    }

    /// Changes the current directory, opening the target if needed.
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let abs = self.absolute(path);
        let entry = path::lookup(&self.device, self.superblock.root, &abs)?;
        if !entry.fcb.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let (handle, opened) = match self.open_files.find_by_path(&abs) {
            Some(handle) => (handle, false),
            None => (self.open(&abs)?, true),
        };
        self.open_files.change_directory(handle)?;
        if let Some(previous) = self.cd_opened {
            if previous != handle {
                self.cd_opened = None;
                self.close(previous)?;
            }
        }
        if opened {
            self.cd_opened = Some(handle);
        }
        Ok(())
    }

    pub fn read(&mut self, handle: Handle, len: usize) -> Result<Vec<u8>> {
        let file = self.open_files.get_mut(handle)?;
        fread(&self.device, file, len)
    }

    /// Reads the whole file from the start.
    pub fn read_all(&mut self, handle: Handle) -> Result<Vec<u8>> {
        let file = self.open_files.get_mut(handle)?;
        file.cursor = 0;
        let len = file.fcb.length as usize;
        fread(&self.device, file, len)
    }

    /// Moves the cursor, clamped to the file length.
    pub fn seek(&mut self, handle: Handle, pos: usize) -> Result<usize> {
        let file = self.open_files.get_mut(handle)?;
        file.cursor = pos.min(file.fcb.length as usize);
        Ok(file.cursor)
    }

    pub fn write(&mut self, handle: Handle, content: &[u8], mode: WriteMode) -> Result<usize> {
        let file = self.open_files.get_mut(handle)?;
        fwrite(&mut self.device, file, content, mode)
    }

    pub fn open_file(&self, handle: Handle) -> Result<&OpenFile> {
        self.open_files.get(handle)
    }

    pub fn open_files(&self) -> impl Iterator<Item = (Handle, &OpenFile)> {
        self.open_files.iter()
    }

    pub fn cwd_handle(&self) -> Handle {
        self.open_files.cwd()
    }

    /// Verifies the on-disk invariants; open working copies are not considered.
    pub fn check(&self) -> Result<Usage> {
        check::check(&self.device, self.superblock.root)
    }

    pub fn usage(&self) -> Result<Usage> {
        let free = fat::count_free(&self.device)?;
        Ok(Usage {
            total: NUM_BLOCKS,
            used: NUM_BLOCKS - free,
            free,
        })
    }

    /// Writes back every changed entry, releases all handles but the root
    /// slot and flushes the device.
    pub fn shutdown(&mut self) -> Result<()> {
        let dirty: Vec<OpenFile> = self
            .open_files
            .iter()
            .filter(|(_, file)| file.dirty)
            .map(|(_, file)| file.clone())
            .collect();
        for file in &dirty {
            self.write_back(file)?;
        }
        let root = self.open_files.get(CWD_SLOT)?.clone();
        self.open_files = OpenFileTable::new(root);
        self.cd_opened = None;
        self.device.flush()?;
        info!("file system shut down");
        Ok(())
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
