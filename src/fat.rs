//! Management of the file allocation table.
//! Two copies live on disk: copy A is the one consulted, copy B is a mirror
//! written in lockstep with A and never read back except by consistency checks.
//! Each entry is a little-endian u16: FREE, END or the next block of a chain.

use log::{debug, trace};

use crate::config::*;
use crate::error::{FsError, Result};
use crate::BlockDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    /// Used block, pointing to the next block in the chain.
    Next(u16),
    /// Last block of a chain.
    End,
}

impl FatEntry {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            FAT_FREE => FatEntry::Free,
            FAT_END => FatEntry::End,
            next => FatEntry::Next(next),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            FatEntry::Free => FAT_FREE,
            FatEntry::End => FAT_END,
            FatEntry::Next(next) => next,
        }
    }
}

fn check_block(block: u16) -> Result<()> {
    if block as usize >= NUM_BLOCKS {
        return Err(FsError::InvalidBlockId(block as usize));
    }
    Ok(())
}

/// Returns (device block, byte offset) of `block`'s entry in the table starting at `table_start`.
fn entry_position(table_start: u16, block: u16) -> (usize, usize) {
    let byte = block as usize * FAT_ENTRY_SIZE;
    (table_start as usize + byte / BLOCK_SIZE, byte % BLOCK_SIZE)
}

/// Reads `block`'s entry from copy A.
pub fn get_entry(device: &impl BlockDevice, block: u16) -> Result<FatEntry> {
    check_block(block)?;
    let (block_id, offset) = entry_position(FAT_START, block);
    let mut buf = vec![0u8; BLOCK_SIZE];
    device.read_block(block_id, &mut buf)?;
    Ok(FatEntry::from_raw(u16::from_le_bytes([buf[offset], buf[offset + 1]])))
}

/// Writes `block`'s entry into both copies.
pub fn set_entry(device: &mut impl BlockDevice, block: u16, entry: FatEntry) -> Result<()> {
    check_block(block)?;
    let mut buf = vec![0u8; BLOCK_SIZE];
    for table_start in [FAT_START, FAT_MIRROR_START] {
        let (block_id, offset) = entry_position(table_start, block);
        device.read_block(block_id, &mut buf)?;
        buf[offset..offset + FAT_ENTRY_SIZE].copy_from_slice(&entry.raw().to_le_bytes());
        device.write_block(block_id, &buf)?;
    }
    trace!("fat[{}] = {:?}", block, entry);
    Ok(())
}

/// Reads a whole table copy.
pub fn read_table(device: &impl BlockDevice, table_start: u16) -> Result<Vec<FatEntry>> {
    let mut raw = vec![0u8; FAT_BLOCKS * BLOCK_SIZE];
    for (i, chunk) in raw.chunks_mut(BLOCK_SIZE).enumerate() {
        device.read_block(table_start as usize + i, chunk)?;
    }
    Ok(raw
        .chunks(FAT_ENTRY_SIZE)
        .take(NUM_BLOCKS)
        .map(|pair| FatEntry::from_raw(u16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Lowest index starting `count` consecutive free entries.
fn first_fit(table: &[FatEntry], count: usize) -> Option<usize> {
    if count == 0 || count > table.len() {
        return None;
    }
    let mut run_start = 0;
    let mut run_len = 0;
    for (i, entry) in table.iter().enumerate() {
        if *entry != FatEntry::Free {
            run_len = 0;
            continue;
        }
        if run_len == 0 {
            run_start = i;
        }
        run_len += 1;
        if run_len == count {
            return Some(run_start);
        }
    }
    None
}

/// Finds the first run of `count` contiguous free blocks.
pub fn find_free_run(device: &impl BlockDevice, count: usize) -> Result<Option<u16>> {
    let table = read_table(device, FAT_START)?;
    Ok(first_fit(&table, count).map(|i| i as u16))
}

/// Links `count` consecutive entries starting at `first` into one chain.
/// The run must be free, as returned by [`find_free_run`].
pub fn allocate_chain(device: &mut impl BlockDevice, first: u16, count: usize) -> Result<()> {
    if count == 0 || first as usize + count > NUM_BLOCKS {
        return Err(FsError::InvalidBlockId(first as usize + count));
    }
    let last = first + count as u16 - 1;
    for block in first..last {
        set_entry(device, block, FatEntry::Next(block + 1))?;
    }
    set_entry(device, last, FatEntry::End)?;
    debug!("allocated chain {}..={}", first, last);
    Ok(())
}

/// Grows the chain ending at `last` by one block taken from anywhere on the disk.
/// Returns the new block.
pub fn append_block(device: &mut impl BlockDevice, last: u16) -> Result<u16> {
    let new = find_free_run(device, 1)?.ok_or(FsError::OutOfSpace)?;
    set_entry(device, new, FatEntry::End)?;
    set_entry(device, last, FatEntry::Next(new))?;
    debug!("appended block {} after {}", new, last);
    Ok(new)
}

fn walk(table: &[FatEntry], first: u16) -> Result<Vec<u16>> {
    let mut blocks = Vec::new();
    let mut current = first;
    loop {
        if blocks.len() >= table.len() {
            return Err(FsError::Corrupted(format!("chain from block {first} loops")));
        }
        let entry = *table
            .get(current as usize)
            .ok_or_else(|| FsError::Corrupted(format!("chain from block {first} leaves the disk")))?;
        blocks.push(current);
        match entry {
            FatEntry::Next(next) => current = next,
            FatEntry::End => return Ok(blocks),
            FatEntry::Free => {
                return Err(FsError::Corrupted(format!(
                    "chain from block {first} reaches free block {current}"
                )));
            }
        }
    }
}

/// Blocks of the chain starting at `first`, in order.
pub fn chain(device: &impl BlockDevice, first: u16) -> Result<Vec<u16>> {
    check_block(first)?;
    let table = read_table(device, FAT_START)?;
    walk(&table, first)
}

/// Marks every block of the chain starting at `first` free.
pub fn free_chain(device: &mut impl BlockDevice, first: u16) -> Result<()> {
    let blocks = chain(device, first)?;
    for &block in &blocks {
        set_entry(device, block, FatEntry::Free)?;
    }
    debug!("freed chain from {} ({} blocks)", first, blocks.len());
    Ok(())
}

/// Keeps the first `keep` blocks of the chain and frees the rest.
pub fn truncate_chain(device: &mut impl BlockDevice, first: u16, keep: usize) -> Result<()> {
    let blocks = chain(device, first)?;
    if keep == 0 || keep >= blocks.len() {
        return Ok(());
    }
    set_entry(device, blocks[keep - 1], FatEntry::End)?;
    for &block in &blocks[keep..] {
        set_entry(device, block, FatEntry::Free)?;
    }
    debug!("truncated chain from {} to {} blocks", first, keep);
    Ok(())
}

pub fn count_free(device: &impl BlockDevice) -> Result<usize> {
    let table = read_table(device, FAT_START)?;
    Ok(table.iter().filter(|e| **e == FatEntry::Free).count())
}

/// Marks every entry of both copies free.
pub fn format_table(device: &mut impl BlockDevice) -> Result<()> {
    let zero = vec![0u8; BLOCK_SIZE];
    for i in 0..FAT_BLOCKS {
        device.write_block(FAT_START as usize + i, &zero)?;
        device.write_block(FAT_MIRROR_START as usize + i, &zero)?;
    }
    Ok(())
}

pub fn mirrors_match(device: &impl BlockDevice) -> Result<bool> {
    Ok(read_table(device, FAT_START)? == read_table(device, FAT_MIRROR_START)?)
}
