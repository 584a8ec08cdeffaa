//! Reading and writing file contents through an open handle.

use log::debug;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::fat;
use crate::open_file::OpenFile;
use crate::{BlockDevice, Fcb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole content.
    Overwrite,
    /// Overwrite from the cursor on, growing the file if needed.
    Cover,
    /// Write after the current end.
    Append,
}

/// Copies up to `len` bytes of the file starting at `offset`.
/// Nothing past the end of the file is returned.
fn read_range(device: &impl BlockDevice, fcb: &Fcb, offset: usize, len: usize) -> Result<Vec<u8>> {
    let available = len.min((fcb.length as usize).saturating_sub(offset));
    let mut data = Vec::with_capacity(available);
    if available == 0 {
        return Ok(data);
    }

    let blocks = fat::chain(device, fcb.first)?;
    let mut block_buf = vec![0u8; BLOCK_SIZE];
    let mut current_offset = offset;
    while data.len() < available {
        let block = *blocks.get(current_offset / BLOCK_SIZE).ok_or_else(|| {
            FsError::Corrupted(format!("chain from block {} shorter than its length", fcb.first))
        })?;
        device.read_block(block as usize, &mut block_buf)?;
        let start_offset = current_offset % BLOCK_SIZE;
        let bytes_to_read = (BLOCK_SIZE - start_offset).min(available - data.len());
        data.extend_from_slice(&block_buf[start_offset..start_offset + bytes_to_read]);
        current_offset += bytes_to_read;
    }

    Ok(data)
}

/// Reads up to `len` bytes from the cursor and advances it.
pub fn fread(device: &impl BlockDevice, file: &mut OpenFile, len: usize) -> Result<Vec<u8>> {
    if file.fcb.is_dir() {
        return Err(FsError::NotFile);
    }
    let data = read_range(device, &file.fcb, file.cursor, len)?;
    file.cursor += data.len();
    Ok(data)
}

/// Writes `content` according to `mode`.
///
/// The whole file is read into memory, changed there and streamed back over
/// its chain, which is then grown or cut to fit the new length. The cursor
/// ends up after the written bytes. Returns the number of bytes written.
pub fn fwrite(
    device: &mut impl BlockDevice,
    file: &mut OpenFile,
    content: &[u8],
    mode: WriteMode,
) -> Result<usize> {
    if file.fcb.is_dir() {
        return Err(FsError::NotFile);
    }

    let mut data = read_range(device, &file.fcb, 0, file.fcb.length as usize)?;
    let end = match mode {
        WriteMode::Overwrite => {
            data.clear();
            data.extend_from_slice(content);
            data.len()
        }
        WriteMode::Cover => {
            let start = file.cursor.min(data.len());
            let end = start + content.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(content);
            end
        }
        WriteMode::Append => {
            data.extend_from_slice(content);
            data.len()
        }
    };

    let mut blocks = fat::chain(device, file.fcb.first)?;
    let needed = data.len().div_ceil(BLOCK_SIZE).max(1);
    if needed > blocks.len() && fat::count_free(device)? < needed - blocks.len() {
        return Err(FsError::OutOfSpace);
    }
    while blocks.len() < needed {
        let last = blocks[blocks.len() - 1];
        blocks.push(fat::append_block(device, last)?);
    }

    let mut block_buf = vec![0u8; BLOCK_SIZE];
    for (i, &block) in blocks.iter().take(needed).enumerate() {
        block_buf.fill(0);
        let start = i * BLOCK_SIZE;
        let chunk = &data[start.min(data.len())..(start + BLOCK_SIZE).min(data.len())];
        block_buf[..chunk.len()].copy_from_slice(chunk);
        device.write_block(block as usize, &block_buf)?;
    }
    if blocks.len() > needed {
        fat::truncate_chain(device, file.fcb.first, needed)?;
    }

    debug!(
        "wrote {} bytes to {} ({:?}), length {} -> {}",
        content.len(),
        file.path,
        mode,
        file.fcb.length,
        data.len()
    );
    file.fcb.length = data.len() as u32;
    file.cursor = end;
    file.dirty = true;

    Ok(content.len())
}
