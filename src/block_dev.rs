use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::*;
use crate::error::{FsError, Result};

pub trait BlockDevice {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Reads a block of data from the block device.
    /// buf.len() must be equal to block_size().
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes a block of data to the block device.
    /// buf.len() must be equal to block_size().
    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()>;

    /// Persists the device contents, if the device has anywhere to persist them to.
    fn flush(&mut self) -> Result<()>;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}

/// The whole disk held in memory, optionally mirrored by one flat backing file.
///
/// The backing file is read once by [`DiskImage::load`] and overwritten as a
/// whole by [`DiskImage::persist`]. Nothing is written incrementally.
#[derive(Debug, Clone)]
pub struct DiskImage {
    data: Vec<u8>,
    path: Option<PathBuf>,
}

impl DiskImage {
    /// Creates a zero-filled image with no backing file.
    pub fn in_memory() -> Self {
        Self {
            data: vec![0; DISK_SIZE],
            path: None,
        }
    }

    /// Loads the image from `path`.
    /// Returns the image and whether it is fresh, i.e. the file did not exist
    /// and the image is zero-filled and still needs formatting.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, bool)> {
        let path = path.as_ref().to_path_buf();
        match fs::read(&path) {
            Ok(mut data) => {
                if data.len() != DISK_SIZE {
                    warn!(
                        "backing file {} holds {} bytes, expected {}; resizing",
                        path.display(),
                        data.len(),
                        DISK_SIZE
                    );
                    data.resize(DISK_SIZE, 0);
                }
                info!("loaded disk image from {}", path.display());
                Ok((Self { data, path: Some(path) }, false))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no disk image at {}, starting from a blank disk", path.display());
                // Make sure the file can be created before any work is done on it.
                fs::write(&path, vec![0u8; DISK_SIZE])?;
                Ok((
                    Self {
                        data: vec![0; DISK_SIZE],
                        path: Some(path),
                    },
                    true,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the whole buffer back to the backing file.
    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.path {
            fs::write(path, &self.data)?;
            info!("persisted disk image to {}", path.display());
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, block_id: usize, len: usize) -> Result<core::ops::Range<usize>> {
        if block_id >= NUM_BLOCKS {
            return Err(FsError::InvalidBlockId(block_id));
        }
        if len != BLOCK_SIZE {
            return Err(FsError::BadBufferSize);
        }
        let start = block_id * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for DiskImage {
    fn num_blocks(&self) -> usize {
        NUM_BLOCKS
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(block_id, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()> {
        let range = self.range(block_id, buf.len())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.persist()
    }
}
