use crate::config::*;
use crate::error::{FsError, Result};
use crate::{BlockDevice, SuperBlock};

pub fn read_superblock(device: &impl BlockDevice) -> Result<SuperBlock> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    device.read_block(SUPERBLOCK_ID as usize, &mut buf)?;
    let superblock = SuperBlock::decode(&buf);

    if superblock.magic != MAGIC {
        return Err(FsError::InvalidSuperBlock);
    }
    if superblock.block_size != BLOCK_SIZE as u32 || superblock.num_blocks != NUM_BLOCKS as u32 {
        return Err(FsError::InvalidSuperBlock);
    }
    if superblock.root != ROOT_BLOCK || superblock.data_start != DATA_START {
        return Err(FsError::InvalidSuperBlock);
    }

    Ok(superblock)
}

pub fn write_superblock(device: &mut impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    superblock.encode(&mut buf);
    device.write_block(SUPERBLOCK_ID as usize, &buf)
}
