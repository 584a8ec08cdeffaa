use crate::config::*;
use crate::date::{Date, Time};
use crate::error::{FsError, Result};

fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Strips the zero padding of a fixed-width name field.
pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

/// Boot block record.
///
/// Layout: description `[u8; 200]`, root block `u16` at 200, first data block
/// `u16` at 202, magic `u32` at 204, block size `u32` at 208, block count
/// `u32` at 212.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub information: String,
    pub root: u16,       // First block of the root directory
    pub data_start: u16, // First block after the reserved region
    pub magic: u32,
    pub block_size: u32,
    pub num_blocks: u32,
}

impl SuperBlock {
    pub fn new() -> Self {
        Self {
            information: format!(
                "Disk Size = {}KB, Block Size = {}B, Block0 in 0, FAT0/1 in {}/{}, Root Directory in {}",
                DISK_SIZE / 1024,
                BLOCK_SIZE,
                FAT_START,
                FAT_MIRROR_START,
                ROOT_BLOCK
            ),
            root: ROOT_BLOCK,
            data_start: DATA_START,
            magic: MAGIC,
            block_size: BLOCK_SIZE as u32,
            num_blocks: NUM_BLOCKS as u32,
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf.fill(0);
        let info = self.information.as_bytes();
        // Keep a terminating zero in the description field.
        let len = info.len().min(SUPERBLOCK_INFO_LEN - 1);
        buf[..len].copy_from_slice(&info[..len]);
        put_u16(buf, 200, self.root);
        put_u16(buf, 202, self.data_start);
        put_u32(buf, 204, self.magic);
        put_u32(buf, 208, self.block_size);
        put_u32(buf, 212, self.num_blocks);
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            information: String::from_utf8_lossy(trim_zero(&buf[..SUPERBLOCK_INFO_LEN])).into_owned(),
            root: get_u16(buf, 200),
            data_start: get_u16(buf, 202),
            magic: get_u32(buf, 204),
            block_size: get_u32(buf, 208),
            num_blocks: get_u32(buf, 212),
        }
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Directory = 0,
    Regular = 1,
}

impl Attribute {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Attribute::Directory,
            _ => Attribute::Regular,
        }
    }
}

/// Position of a directory entry on disk: the directory block and the slot in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcbLocation {
    pub block: u16,
    pub slot: usize,
}

impl FcbLocation {
    pub fn offset(&self) -> usize {
        self.slot * FCB_SIZE
    }
}

/// File control block, the 32-byte directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fcb {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub attribute: Attribute,
    pub occupied: bool,
    pub time: u16,
    pub date: u16,
    pub first: u16,
    pub length: u32,
}

impl Fcb {
    pub const NULL: Self = Self {
        name: [0; 8],
        ext: [0; 3],
        attribute: Attribute::Directory,
        occupied: false,
        time: 0,
        date: 0,
        first: 0,
        length: 0,
    };

    /// Builds an occupied entry. `name` is either a dot entry or a name
    /// accepted by [`split_name`].
    pub fn new(
        name: &str,
        attribute: Attribute,
        first: u16,
        length: u32,
        date: Date,
        time: Time,
    ) -> Result<Self> {
        let (base, ext) = if name == DOT_NAME || name == DOTDOT_NAME {
            (name, "")
        } else {
            split_name(name, attribute)?
        };
        let mut fcb = Self {
            attribute,
            occupied: true,
            time: time.pack(),
            date: date.pack(),
            first,
            length,
            ..Self::NULL
        };
        fcb.name[..base.len()].copy_from_slice(base.as_bytes());
        fcb.ext[..ext.len()].copy_from_slice(ext.as_bytes());
        Ok(fcb)
    }

    pub fn is_dir(&self) -> bool {
        self.attribute == Attribute::Directory
    }

    pub fn base_name(&self) -> String {
        String::from_utf8_lossy(trim_zero(&self.name)).into_owned()
    }

    pub fn ext_name(&self) -> String {
        String::from_utf8_lossy(trim_zero(&self.ext)).into_owned()
    }

    /// `base.ext` for files with an extension, `base` otherwise.
    pub fn full_name(&self) -> String {
        let ext = trim_zero(&self.ext);
        if self.is_dir() || ext.is_empty() {
            self.base_name()
        } else {
            format!("{}.{}", self.base_name(), self.ext_name())
        }
    }

    pub fn name_eq(&self, name: &str) -> bool {
        self.occupied && self.full_name() == name
    }

    pub fn is_dot(&self) -> bool {
        let base = trim_zero(&self.name);
        base == DOT_NAME.as_bytes() || base == DOTDOT_NAME.as_bytes()
    }

    pub fn created_date(&self) -> Date {
        Date::unpack(self.date)
    }

    pub fn created_time(&self) -> Time {
        Time::unpack(self.time)
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..FCB_SIZE].fill(0);
        buf[0..8].copy_from_slice(&self.name);
        buf[8..11].copy_from_slice(&self.ext);
        buf[11] = self.attribute as u8;
        buf[12] = u8::from(self.occupied);
        put_u16(buf, 22, self.time);
        put_u16(buf, 24, self.date);
        put_u16(buf, 26, self.first);
        put_u32(buf, 28, self.length);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0; 8];
        let mut ext = [0; 3];
        name.copy_from_slice(&buf[0..8]);
        ext.copy_from_slice(&buf[8..11]);
        Self {
            name,
            ext,
            attribute: Attribute::from_raw(buf[11]),
            occupied: buf[12] != 0,
            time: get_u16(buf, 22),
            date: get_u16(buf, 24),
            first: get_u16(buf, 26),
            length: get_u32(buf, 28),
        }
    }
}

/// Splits a user-supplied name into base and extension.
/// Directories take no extension; files split at the last dot.
pub fn split_name(name: &str, attribute: Attribute) -> Result<(&str, &str)> {
    if name.is_empty() || name == DOT_NAME || name == DOTDOT_NAME || name.contains('/') {
        return Err(FsError::InvalidFileName);
    }
    if !name.is_ascii() || name.bytes().any(|c| c == 0 || c.is_ascii_whitespace()) {
        return Err(FsError::InvalidFileName);
    }
    let (base, ext) = match attribute {
        Attribute::Directory => (name, ""),
        Attribute::Regular => name.rsplit_once('.').unwrap_or((name, "")),
    };
    // The trailing dot would be lost on disk.
    if attribute == Attribute::Regular && name.ends_with('.') {
        return Err(FsError::InvalidFileName);
    }
    if base.is_empty() || base.contains('.') {
        return Err(FsError::InvalidFileName);
    }
    if base.len() > MAX_BASE_NAME_LEN || ext.len() > MAX_EXT_NAME_LEN {
        return Err(FsError::InvalidFileName);
    }
    Ok((base, ext))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a.txt", Attribute::Regular).unwrap(), ("a", "txt"));
        assert_eq!(split_name("notes", Attribute::Regular).unwrap(), ("notes", ""));
        assert_eq!(split_name("docs", Attribute::Directory).unwrap(), ("docs", ""));
        assert!(split_name("toolong1.c", Attribute::Regular).is_err());
        assert!(split_name("a.long", Attribute::Regular).is_err());
        assert!(split_name("a.b.c", Attribute::Regular).is_err());
        assert!(split_name("d.x", Attribute::Directory).is_err());
        assert!(split_name(".", Attribute::Regular).is_err());
        assert!(split_name(".hid", Attribute::Regular).is_err());
        assert!(split_name("abc.", Attribute::Regular).is_err());
        assert!(split_name("", Attribute::Directory).is_err());
    }

    #[test]
    fn test_fcb_layout() {
        let fcb = Fcb::new(
            "hello.rs",
            Attribute::Regular,
            42,
            1500,
            Date::new(2018, 12, 19),
            Time::new(10, 30, 0),
        )
        .unwrap();
        let mut buf = [0xFFu8; FCB_SIZE];
        fcb.encode(&mut buf);
        assert_eq!(&buf[0..5], b"hello");
        assert_eq!(&buf[8..10], b"rs");
        assert_eq!(buf[11], 1);
        assert_eq!(buf[12], 1);
        assert_eq!(u16::from_le_bytes([buf[26], buf[27]]), 42);
        assert_eq!(u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]), 1500);
        let decoded = Fcb::decode(&buf);
        assert_eq!(decoded, fcb);
        assert_eq!(decoded.full_name(), "hello.rs");
        assert_eq!(decoded.created_date().to_string(), "2018-12-19");
    }

    #[test]
    fn test_superblock_layout() {
        let sb = SuperBlock::new();
        let mut buf = [0u8; BLOCK_SIZE];
        sb.encode(&mut buf);
        assert_eq!(u16::from_le_bytes([buf[200], buf[201]]), ROOT_BLOCK);
        assert_eq!(u16::from_le_bytes([buf[202], buf[203]]), DATA_START);
        assert_eq!(SuperBlock::decode(&buf), sb);
    }
}
