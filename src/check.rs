//! Offline consistency check of a whole image.

use log::{debug, warn};

use crate::config::*;
use crate::directory::{dir_slots, DirEntry};
use crate::error::{FsError, Result};
use crate::fat::{self, FatEntry};
use crate::BlockDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub total: usize,
    pub used: usize,
    pub free: usize,
}

fn corrupted(msg: String) -> FsError {
    warn!("check failed: {}", msg);
    FsError::Corrupted(msg)
}

struct Checker<'a, D: BlockDevice> {
    device: &'a D,
    owned: Vec<bool>,
}

impl<D: BlockDevice> Checker<'_, D> {
    /// Marks the chain from `first` as owned by `who`; returns its length.
    fn claim(&mut self, first: u16, who: &str) -> Result<usize> {
        let blocks = fat::chain(self.device, first)?;
        for &block in &blocks {
            let owned = &mut self.owned[block as usize];
            if *owned {
                return Err(corrupted(format!("block {block} of {who} is shared")));
            }
            *owned = true;
        }
        Ok(blocks.len())
    }

    fn check_dots(&self, slots: &[DirEntry], path: &str, first: u16, parent_first: u16) -> Result<()> {
        if slots.len() < 2 {
            return Err(corrupted(format!("{path}: missing dot entries")));
        }
        let expected = [(DOT_NAME, first), (DOTDOT_NAME, parent_first)];
        for (slot, (name, target)) in slots.iter().zip(expected) {
            let fcb = &slot.fcb;
            if !fcb.occupied || !fcb.is_dir() || fcb.base_name() != name || fcb.first != target {
                return Err(corrupted(format!("{path}: bad {name:?} entry")));
            }
        }
        Ok(())
    }

    fn check_dir(&mut self, path: &str, first: u16, parent_first: u16) -> Result<()> {
        let slots = dir_slots(self.device, first)?;
        self.check_dots(&slots, path, first, parent_first)?;

        let mut names = Vec::new();
        for entry in slots.iter().skip(2).filter(|entry| entry.fcb.occupied) {
            let fcb = &entry.fcb;
            let name = fcb.full_name();
            let child = if path == ROOT_PATH {
                format!("/{name}")
            } else {
                format!("{path}/{name}")
            };
            if fcb.is_dot() {
                return Err(corrupted(format!("{child}: stray dot entry")));
            }
            if names.contains(&name) {
                return Err(corrupted(format!("{child}: duplicate name")));
            }
            names.push(name);
            let blocks = self.claim(fcb.first, &child)?;
            let expected = (fcb.length as usize).div_ceil(BLOCK_SIZE).max(1);
            if blocks != expected {
                return Err(corrupted(format!(
                    "{child}: {blocks} blocks for a length of {}",
                    fcb.length
                )));
            }
            if fcb.is_dir() {
                self.check_dir(&child, fcb.first, first)?;
            }
        }
        Ok(())
    }
}

/// Verifies the allocation and directory invariants and reports block usage.
pub fn check(device: &impl BlockDevice, root_block: u16) -> Result<Usage> {
    if !fat::mirrors_match(device)? {
        return Err(corrupted("FAT copies differ".to_string()));
    }
    let table = fat::read_table(device, FAT_START)?;

    let mut checker = Checker {
        device,
        owned: vec![false; NUM_BLOCKS],
    };
    for block in 0..RESERVED_BLOCKS {
        if table[block] != FatEntry::End {
            return Err(corrupted(format!("reserved block {block} is not allocated")));
        }
        checker.owned[block] = true;
    }
    if checker.claim(root_block, ROOT_PATH)? != ROOT_BLOCKS {
        return Err(corrupted("root directory has the wrong span".to_string()));
    }
    checker.check_dir(ROOT_PATH, root_block, root_block)?;

    let used = table.iter().filter(|entry| **entry != FatEntry::Free).count();
    let owned = checker.owned.iter().filter(|owned| **owned).count();
    if used != owned {
        return Err(corrupted(format!(
            "{} blocks allocated but not reachable",
            used - owned
        )));
    }
    debug!("check passed: {} of {} blocks used", used, NUM_BLOCKS);

    Ok(Usage {
        total: NUM_BLOCKS,
        used,
        free: NUM_BLOCKS - used,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{DiskImage, FileSystem, FixedClock};

    fn formatted() -> DiskImage {
        FileSystem::format(DiskImage::in_memory(), Box::new(FixedClock::default()))
            .unwrap()
            .into_device()
    }

    #[test]
    fn test_clean_disk() {
        let usage = check(&formatted(), ROOT_BLOCK).unwrap();
        assert_eq!(usage.used, DATA_START as usize);
        assert_eq!(usage.used + usage.free, usage.total);
    }

    #[test]
    fn test_leaked_block() {
        let mut disk = formatted();
        fat::allocate_chain(&mut disk, 100, 2).unwrap();
        assert!(matches!(check(&disk, ROOT_BLOCK), Err(FsError::Corrupted(_))));
    }

    #[test]
    fn test_mirror_mismatch() {
        let mut disk = formatted();
        let mut buf = vec![0u8; BLOCK_SIZE];
        disk.read_block(FAT_MIRROR_START as usize, &mut buf).unwrap();
        buf[2 * 50] = 0xFF;
        disk.write_block(FAT_MIRROR_START as usize, &buf).unwrap();
        assert!(matches!(check(&disk, ROOT_BLOCK), Err(FsError::Corrupted(_))));
    }

    #[test]
    fn test_duplicate_name() {
        let mut disk = formatted();
        let first = fat::find_free_run(&disk, 1).unwrap().unwrap();
        fat::allocate_chain(&mut disk, first, 1).unwrap();
        let second = fat::find_free_run(&disk, 1).unwrap().unwrap();
        fat::allocate_chain(&mut disk, second, 1).unwrap();
        let date = crate::Date::new(2000, 1, 1);
        let time = crate::Time::new(0, 0, 0);
        for (slot, block) in [(2, first), (3, second)] {
            let fcb = crate::Fcb::new("abc", crate::Attribute::Regular, block, 0, date, time).unwrap();
            crate::write_fcb(&mut disk, crate::FcbLocation { block: ROOT_BLOCK, slot }, &fcb).unwrap();
        }
        assert!(matches!(check(&disk, ROOT_BLOCK), Err(FsError::Corrupted(_))));
    }
}
