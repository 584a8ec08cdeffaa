//! Directory regions and the entries inside them.
//! A directory is the chain of blocks its entry points to, each block holding
//! `NUM_ENTRY_PER_BLOCK` slots. The root spans `ROOT_BLOCKS` blocks, every
//! other directory exactly one.

use log::{debug, trace};

use crate::config::*;
use crate::date::TimeProvider;
use crate::error::{FsError, Result};
use crate::fat;
use crate::fcb::{write_fcb, zero_block};
use crate::{Attribute, BlockDevice, Fcb, FcbLocation};

/// An entry together with the slot it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub location: FcbLocation,
    pub fcb: Fcb,
}

/// Every slot of the directory starting at `dir_first`, occupied or not.
pub fn dir_slots(device: &impl BlockDevice, dir_first: u16) -> Result<Vec<DirEntry>> {
    let mut slots = Vec::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    for block in fat::chain(device, dir_first)? {
        device.read_block(block as usize, &mut buf)?;
        for slot in 0..NUM_ENTRY_PER_BLOCK {
            let offset = slot * FCB_SIZE;
            slots.push(DirEntry {
                location: FcbLocation { block, slot },
                fcb: Fcb::decode(&buf[offset..offset + FCB_SIZE]),
            });
        }
    }
    Ok(slots)
}

/// Occupied entries of a directory, "." and ".." included.
pub fn read_dir(device: &impl BlockDevice, dir_first: u16) -> Result<Vec<DirEntry>> {
    Ok(dir_slots(device, dir_first)?
        .into_iter()
        .filter(|entry| entry.fcb.occupied)
        .collect())
}

/// Finds the entry called `name` in a directory.
pub fn dir_lookup(device: &impl BlockDevice, dir_first: u16, name: &str) -> Result<DirEntry> {
    trace!("looking up {:?} in directory at block {}", name, dir_first);
    read_dir(device, dir_first)?
        .into_iter()
        .find(|entry| entry.fcb.name_eq(name))
        .ok_or(FsError::NotFound)
}

/// Writes "." and ".." into a freshly zeroed directory block.
/// All other slots stay unoccupied.
pub fn init_dir(
    device: &mut impl BlockDevice,
    clock: &dyn TimeProvider,
    dir: &Fcb,
    parent: &Fcb,
) -> Result<()> {
    let (date, time) = (clock.current_date(), clock.current_time());
    let dot = Fcb::new(DOT_NAME, Attribute::Directory, dir.first, dir.length, date, time)?;
    let dotdot = Fcb::new(DOTDOT_NAME, Attribute::Directory, parent.first, parent.length, date, time)?;
    write_fcb(device, FcbLocation { block: dir.first, slot: 0 }, &dot)?;
    write_fcb(device, FcbLocation { block: dir.first, slot: 1 }, &dotdot)?;
    Ok(())
}

/// Creates a file or directory called `name` in `parent`.
///
/// The free slot and the free block are both found before anything is
/// written, so a failing create leaves the disk untouched.
pub fn create_entry(
    device: &mut impl BlockDevice,
    clock: &dyn TimeProvider,
    parent: &Fcb,
    name: &str,
    attribute: Attribute,
) -> Result<DirEntry> {
    if !parent.is_dir() {
        return Err(FsError::NotDirectory);
    }
    crate::split_name(name, attribute)?;

    let slots = dir_slots(device, parent.first)?;
    if slots.iter().any(|entry| entry.fcb.name_eq(name)) {
        return Err(FsError::AlreadyExists);
    }
    let location = slots
        .iter()
        .find(|entry| !entry.fcb.occupied)
        .map(|entry| entry.location)
        .ok_or(FsError::DirectoryFull)?;
    let first = fat::find_free_run(device, 1)?.ok_or(FsError::OutOfSpace)?;

    fat::allocate_chain(device, first, 1)?;
    zero_block(device, first)?;

    let length = match attribute {
        Attribute::Directory => BLOCK_SIZE as u32,
        Attribute::Regular => 0,
    };
    let fcb = Fcb::new(
        name,
        attribute,
        first,
        length,
        clock.current_date(),
        clock.current_time(),
    )?;
    if attribute == Attribute::Directory {
        init_dir(device, clock, &fcb, parent)?;
    }
    write_fcb(device, location, &fcb)?;
    debug!(
        "created {:?} at block {} slot {}, data at block {}",
        name, location.block, location.slot, first
    );

    Ok(DirEntry { location, fcb })
}

/// Clears the entry's slot and frees its chain.
/// Callers check that the entry may go (not open, empty, not a dot entry).
pub fn remove_entry(device: &mut impl BlockDevice, entry: &DirEntry) -> Result<()> {
    write_fcb(device, entry.location, &Fcb::NULL)?;
    fat::free_chain(device, entry.fcb.first)?;
    debug!(
        "removed {:?} from block {} slot {}",
        entry.fcb.full_name(),
        entry.location.block,
        entry.location.slot
    );
    Ok(())
}

/// True when only "." and ".." are left.
pub fn dir_is_empty(device: &impl BlockDevice, dir_first: u16) -> Result<bool> {
    Ok(read_dir(device, dir_first)?
        .iter()
        .all(|entry| entry.fcb.is_dot()))
}
