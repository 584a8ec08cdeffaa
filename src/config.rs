pub const MAGIC: u32 = 0x474C554F; // "GLUO" in ASCII

pub const BLOCK_SIZE: usize = 1024;
pub const NUM_BLOCKS: usize = 1024;
pub const DISK_SIZE: usize = BLOCK_SIZE * NUM_BLOCKS; // 1 MiB

pub const SUPERBLOCK_ID: u16 = 0; // Block ID for the superblock
pub const FAT_START: u16 = 1; // First block of FAT copy A
pub const FAT_MIRROR_START: u16 = 3; // First block of FAT copy B
pub const FAT_BLOCKS: usize = 2; // Blocks per FAT copy
pub const FAT_ENTRY_SIZE: usize = 2;
pub const ROOT_BLOCK: u16 = 5; // First block of the root directory
pub const ROOT_BLOCKS: usize = 2; // Root directory spans two blocks
pub const DATA_START: u16 = ROOT_BLOCK + ROOT_BLOCKS as u16;
pub const RESERVED_BLOCKS: usize = ROOT_BLOCK as usize; // Superblock + both FATs

pub const FAT_FREE: u16 = 0x0000;
pub const FAT_END: u16 = 0xFFFF;

pub const SUPERBLOCK_INFO_LEN: usize = 200;
pub const FCB_SIZE: usize = 32;
pub const NUM_ENTRY_PER_BLOCK: usize = BLOCK_SIZE / FCB_SIZE;
pub const MAX_BASE_NAME_LEN: usize = 7;
pub const MAX_EXT_NAME_LEN: usize = 3;
pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";

pub const MAX_OPEN_FILES: usize = 10;
pub const CWD_SLOT: usize = 0; // Slot holding the root directory since startup
pub const ROOT_PATH: &str = "/";

pub const DEFAULT_IMAGE_PATH: &str = "./fsfile";
