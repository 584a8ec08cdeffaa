mod common;

use common::fresh_fs;
use gluon::fat::{self, FatEntry};
use gluon::{
    get_fcb, read_superblock, Attribute, BlockDevice, DiskImage, Error, FcbLocation, FileSystem,
    FixedClock, WriteMode, BLOCK_SIZE, DATA_START, FAT_START, MAX_OPEN_FILES, NUM_BLOCKS,
    NUM_ENTRY_PER_BLOCK, ROOT_BLOCK, ROOT_BLOCKS,
};

#[test]
fn test_format_layout() {
    let fs = fresh_fs();
    let device = fs.device();

    let sb = read_superblock(device).unwrap();
    assert_eq!(sb.root, ROOT_BLOCK);
    assert_eq!(sb.data_start, DATA_START);
    log!("superblock: {}", sb.information);

    for block in 0..ROOT_BLOCK {
        assert_eq!(fat::get_entry(device, block).unwrap(), FatEntry::End);
    }
    assert_eq!(fat::get_entry(device, ROOT_BLOCK).unwrap(), FatEntry::Next(ROOT_BLOCK + 1));
    assert_eq!(fat::get_entry(device, ROOT_BLOCK + 1).unwrap(), FatEntry::End);
    assert_eq!(fat::get_entry(device, DATA_START).unwrap(), FatEntry::Free);
    assert!(fat::mirrors_match(device).unwrap());

    let dot = get_fcb(device, FcbLocation { block: ROOT_BLOCK, slot: 0 }).unwrap();
    let dotdot = get_fcb(device, FcbLocation { block: ROOT_BLOCK, slot: 1 }).unwrap();
    for fcb in [dot, dotdot] {
        assert!(fcb.occupied);
        assert!(fcb.is_dir());
        assert_eq!(fcb.first, ROOT_BLOCK);
        assert_eq!(fcb.length as usize, ROOT_BLOCKS * BLOCK_SIZE);
    }
    assert_eq!(dot.full_name(), ".");
    assert_eq!(dotdot.full_name(), "..");

    let usage = fs.check().unwrap();
    assert_eq!(usage.used, DATA_START as usize);
    assert_eq!(usage.free, NUM_BLOCKS - DATA_START as usize);
}

#[test]
fn test_format_idempotent() {
    let first = fresh_fs().into_device();
    let second = fresh_fs().into_device();
    assert_eq!(first.as_bytes(), second.as_bytes());

    let mut fs = FileSystem::format(first, Box::new(FixedClock::default())).unwrap();
    fs.reformat(false).unwrap();
    assert_eq!(fs.device().as_bytes(), second.as_bytes());

    // A full format also wipes stale data blocks.
    fs.create("/junk.txt").unwrap();
    let handle = fs.open("/junk.txt").unwrap();
    fs.write(handle, b"leftovers", WriteMode::Overwrite).unwrap();
    fs.close(handle).unwrap();
    fs.reformat(true).unwrap();
    assert_eq!(fs.device().as_bytes(), second.as_bytes());
}

#[test]
fn test_create_and_lookup() {
    let mut fs = fresh_fs();
    let entry = fs.create("/a.txt").unwrap();
    assert_eq!(entry.location, FcbLocation { block: ROOT_BLOCK, slot: 2 });
    assert_eq!(entry.fcb.first, DATA_START);
    assert_eq!(entry.fcb.length, 0);
    assert_eq!(entry.fcb.attribute, Attribute::Regular);
    assert_eq!(entry.fcb.ext_name(), "txt");

    let found = fs.lookup("/a.txt").unwrap();
    assert_eq!(found, entry);
    assert!(matches!(fs.lookup("/b.txt"), Err(Error::NotFound)));
    assert!(matches!(fs.create("/a.txt"), Err(Error::AlreadyExists)));
    assert!(matches!(fs.create("/"), Err(Error::AlreadyExists)));
    // Going through a regular file never finds anything.
    assert!(matches!(fs.lookup("/a.txt/x"), Err(Error::NotFound)));
    assert!(matches!(fs.create("/a.txt/x"), Err(Error::NotDirectory)));

    fs.check().unwrap();
}

#[test]
fn test_bad_names() {
    let mut fs = fresh_fs();
    for name in ["/toolongname", "/a.long", "/.hidden", "/a.b.c"] {
        assert!(matches!(fs.create(name), Err(Error::InvalidFileName)), "{name}");
    }
    assert!(matches!(fs.mkdir("/dir.ext"), Err(Error::InvalidFileName)));
    fs.create("/exactly7.abc").unwrap_err();
    fs.create("/seven77.abc").unwrap();
    fs.mkdir("/seven77").unwrap();
    assert_eq!(fs.ls(None).unwrap().len(), 4);
}

#[test]
fn test_trailing_dot_name() {
    let mut fs = fresh_fs();
    for _ in 0..2 {
        assert!(matches!(fs.create("/abc."), Err(Error::InvalidFileName)));
    }
    fs.create("/abc").unwrap();
    assert!(matches!(fs.create("/abc"), Err(Error::AlreadyExists)));
    let names: Vec<String> = fs.ls(None).unwrap().iter().map(|e| e.fcb.full_name()).collect();
    assert_eq!(names, [".", "..", "abc"]);
    fs.check().unwrap();
}

#[test]
fn test_mkdir_cd_pwd() {
    let mut fs = fresh_fs();
    fs.mkdir("/a").unwrap();
    fs.mkdir("/a/b").unwrap();
    assert_eq!(fs.pwd(), "/");

    fs.cd("/a/b").unwrap();
    assert_eq!(fs.pwd(), "/a/b");
    assert_eq!(fs.open_files().count(), 2);

    fs.cd("..").unwrap();
    assert_eq!(fs.pwd(), "/a");
    // The handle `cd` opened for /a/b is gone.
    assert_eq!(fs.open_files().count(), 2);
    assert!(matches!(fs.handle_of("/a/b"), Err(Error::NotOpen)));

    fs.create("b/note.txt").unwrap();
    assert_eq!(fs.lookup("/a/b/note.txt").unwrap().fcb.full_name(), "note.txt");
    assert!(matches!(fs.cd("b/note.txt"), Err(Error::NotDirectory)));

    fs.cd("/").unwrap();
    assert_eq!(fs.pwd(), "/");
    assert_eq!(fs.open_files().count(), 1);

    let listing = fs.ls(Some("/a/b")).unwrap();
    let names: Vec<String> = listing.iter().map(|e| e.fcb.full_name()).collect();
    assert_eq!(names, [".", "..", "note.txt"]);
    let a = fs.lookup("/a").unwrap();
    let b = fs.lookup("/a/b").unwrap();
    assert_eq!(listing[0].fcb.first, b.fcb.first);
    assert_eq!(listing[1].fcb.first, a.fcb.first);

    fs.check().unwrap();
}

#[test]
fn test_change_directory_takes_over_cd_handle() {
    let mut fs = fresh_fs();
    fs.mkdir("/a").unwrap();
    fs.mkdir("/b").unwrap();
    fs.mkdir("/c").unwrap();

    fs.cd("/a").unwrap();
    let a = fs.handle_of("/a").unwrap();
    let b = fs.open("/b").unwrap();
    fs.change_directory(b).unwrap();
    fs.close(a).unwrap();

    // The freed slot goes to an unrelated path.
    let c = fs.open("/c").unwrap();
    assert_eq!(c, a);
    fs.cd("/").unwrap();
    assert_eq!(fs.handle_of("/c").unwrap(), c);
    assert_eq!(fs.pwd(), "/");
}

#[test]
fn test_rmdir() {
    let mut fs = fresh_fs();
    let free = fs.usage().unwrap().free;
    fs.mkdir("/d").unwrap();
    fs.create("/d/f").unwrap();

    assert!(matches!(fs.rmdir("/d"), Err(Error::NotEmpty)));
    assert!(matches!(fs.rmdir("/d/f"), Err(Error::NotDirectory)));
    assert!(matches!(fs.rmdir("/d/."), Err(Error::NotPermitted)));
    assert!(matches!(fs.rmdir("/d/.."), Err(Error::NotPermitted)));
    assert!(matches!(fs.rmdir("/"), Err(Error::NotPermitted)));
    assert!(matches!(fs.rm("/d"), Err(Error::NotFile)));

    fs.rm("/d/f").unwrap();
    fs.cd("/d").unwrap();
    assert!(matches!(fs.rmdir("/d"), Err(Error::Busy)));
    fs.cd("/").unwrap();
    fs.rmdir("/d").unwrap();

    assert!(matches!(fs.lookup("/d"), Err(Error::NotFound)));
    assert_eq!(fs.usage().unwrap().free, free);
    fs.check().unwrap();
}

#[test]
fn test_rm_open_file() {
    let mut fs = fresh_fs();
    fs.create("/f.txt").unwrap();
    let handle = fs.open("f.txt").unwrap();
    assert!(matches!(fs.rm("/f.txt"), Err(Error::Busy)));
    fs.close(handle).unwrap();
    fs.rm("/f.txt").unwrap();
    assert!(matches!(fs.rm("/f.txt"), Err(Error::NotFound)));
}

#[test]
fn test_slot_reuse() {
    let mut fs = fresh_fs();
    fs.create("/one").unwrap();
    let two = fs.create("/two").unwrap();
    fs.rm("/one").unwrap();
    let three = fs.create("/three").unwrap();
    assert_eq!(three.location, FcbLocation { block: ROOT_BLOCK, slot: 2 });
    assert_eq!(three.fcb.first, DATA_START);
    assert_eq!(two.location.slot, 3);
}

#[test]
fn test_directory_full() {
    let mut fs = fresh_fs();
    let capacity = ROOT_BLOCKS * NUM_ENTRY_PER_BLOCK - 2;
    for i in 0..capacity {
        fs.create(&format!("/f{i}")).unwrap();
    }
    assert!(matches!(fs.create("/last"), Err(Error::DirectoryFull)));

    fs.rm("/f0").unwrap();
    fs.mkdir("/sub").unwrap();
    for i in 0..NUM_ENTRY_PER_BLOCK - 2 {
        fs.create(&format!("/sub/g{i}")).unwrap();
    }
    assert!(matches!(fs.create("/sub/last"), Err(Error::DirectoryFull)));
    fs.check().unwrap();
}

#[test]
fn test_open_table_capacity() {
    let mut fs = fresh_fs();
    for i in 0..MAX_OPEN_FILES {
        fs.create(&format!("/f{i}")).unwrap();
    }
    // Slot 0 already holds the root directory.
    for i in 0..MAX_OPEN_FILES - 1 {
        fs.open(&format!("/f{i}")).unwrap();
    }
    assert!(matches!(fs.open(&format!("/f{}", MAX_OPEN_FILES - 1)), Err(Error::OpenTableFull)));
    assert!(matches!(fs.open("/f0"), Err(Error::AlreadyOpen)));

    let handle = fs.handle_of("/f0").unwrap();
    fs.close(handle).unwrap();
    fs.open(&format!("/f{}", MAX_OPEN_FILES - 1)).unwrap();

    assert!(matches!(fs.close(0), Err(Error::NotPermitted)));
    fs.close_all().unwrap();
    assert_eq!(fs.open_files().count(), 1);
}

#[test]
fn test_out_of_space_create() {
    let mut fs = fresh_fs();
    fs.create("/big").unwrap();
    let handle = fs.open("/big").unwrap();
    let free = fs.usage().unwrap().free;
    let data = vec![b'x'; free * BLOCK_SIZE];
    fs.write(handle, &data, WriteMode::Overwrite).unwrap();
    fs.close(handle).unwrap();
    assert_eq!(fs.usage().unwrap().free, 1);

    fs.create("/last").unwrap();
    assert_eq!(fs.usage().unwrap().free, 0);

    let table = fat::read_table(fs.device(), FAT_START).unwrap();
    let image = fs.device().as_bytes().to_vec();
    assert!(matches!(fs.create("/more"), Err(Error::OutOfSpace)));
    assert!(matches!(fs.mkdir("/dir"), Err(Error::OutOfSpace)));
    assert_eq!(fat::read_table(fs.device(), FAT_START).unwrap(), table);
    assert_eq!(fs.device().as_bytes(), &image[..]);

    let usage = fs.check().unwrap();
    assert_eq!(usage.free, 0);
    assert_eq!(usage.used, NUM_BLOCKS);
}

#[test]
fn test_mount_existing() {
    let mut fs = fresh_fs();
    fs.mkdir("/docs").unwrap();
    fs.create("/docs/a.md").unwrap();
    let handle = fs.open("/docs/a.md").unwrap();
    fs.write(handle, b"# title\n", WriteMode::Overwrite).unwrap();
    fs.shutdown().unwrap();

    let device: DiskImage = fs.into_device();
    let mut fs = FileSystem::mount(device, Box::new(FixedClock::default())).unwrap();
    let entry = fs.lookup("/docs/a.md").unwrap();
    assert_eq!(entry.fcb.length, 8);
    let handle = fs.open("/docs/a.md").unwrap();
    assert_eq!(fs.read_all(handle).unwrap(), b"# title\n");
}

#[test]
fn test_mount_rejects_garbage() {
    let mut device = DiskImage::in_memory();
    device.write_block(0, &[0xEE; BLOCK_SIZE]).unwrap();
    assert!(matches!(
        FileSystem::mount(device, Box::new(FixedClock::default())),
        Err(Error::InvalidSuperBlock)
    ));
}
