//! Reading and writing single directory entries in place.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::{BlockDevice, Fcb, FcbLocation};

fn check_location(location: &FcbLocation) -> Result<()> {
    if location.slot >= NUM_ENTRY_PER_BLOCK {
        return Err(FsError::Corrupted(format!(
            "slot {} out of directory block",
            location.slot
        )));
    }
    Ok(())
}

pub fn get_fcb(device: &impl BlockDevice, location: FcbLocation) -> Result<Fcb> {
    check_location(&location)?;
    let mut buf = vec![0u8; BLOCK_SIZE];
    device.read_block(location.block as usize, &mut buf)?;
    let offset = location.offset();
    Ok(Fcb::decode(&buf[offset..offset + FCB_SIZE]))
}

pub fn write_fcb(device: &mut impl BlockDevice, location: FcbLocation, fcb: &Fcb) -> Result<()> {
    check_location(&location)?;
    let mut buf = vec![0u8; BLOCK_SIZE];
    device.read_block(location.block as usize, &mut buf)?;
    let offset = location.offset();
    fcb.encode(&mut buf[offset..offset + FCB_SIZE]);
    device.write_block(location.block as usize, &buf)
}

/// Fills a whole block with zeroes.
pub fn zero_block(device: &mut impl BlockDevice, block: u16) -> Result<()> {
    device.write_block(block as usize, &vec![0u8; BLOCK_SIZE])
}
