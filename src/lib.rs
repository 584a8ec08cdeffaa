//! Gluon is a tiny FAT16-style file system living inside a single flat disk image.
//! For simplicity, no support for permissions, links, journaling or caching.
//!
//! Gluon File System's linear layout (1024 blocks of 1 KiB):
//! - Block 0: Superblock
//! - Blocks 1-2: File Allocation Table
//! - Blocks 3-4: Mirror of the File Allocation Table
//! - Blocks 5-6: Root Directory
//! - Blocks 7..: Data Blocks (files and directories, chained through the FAT)
//!
//! Gluon's layers (from bottom to top):
//! 1. Block Device: the disk image, loaded from and persisted to one backing file.
//! 2. FAT: free-block search and block chains, mirrored into both tables.
//! 3. FCB/Directory/Path: fixed-width entries, directory regions, path resolution.
//! 4. Open Files: bounded handle table with working copies of entries.
//! 5. File: read and write through handles.
//! 6. FileSystem: the session tying everything together.
//! 7. Shell: the command layer on top.

mod config;
mod block_dev;
mod structs;
mod date;
mod superblock;
mod fcb;
mod directory;
mod path;
mod open_file;
mod file;
mod check;
mod fs;
mod error;
pub mod fat;
pub mod logger;
pub mod shell;

pub use block_dev::{BlockDevice, DiskImage};
pub use config::*;
pub use structs::*;
pub use date::{Date, FixedClock, LocalClock, Time, TimeProvider};
pub use superblock::*;
pub use fcb::{get_fcb, write_fcb};
pub use directory::*;
pub use path::*;
pub use open_file::*;
pub use file::*;
pub use check::Usage;
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
