//! Common utilities for tests

#![allow(dead_code)]

use std::path::PathBuf;

use gluon::{DiskImage, FileSystem, FixedClock};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// A freshly formatted in-memory disk with a clock stuck at 1980-01-01.
pub fn fresh_fs() -> FileSystem<DiskImage> {
    FileSystem::format(DiskImage::in_memory(), Box::new(FixedClock::default())).unwrap()
}

/// A per-test image path under the system temp directory, removed beforehand.
pub fn temp_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gluon-{}-{}.img", std::process::id(), name));
    let _ = std::fs::remove_file(&path);
    path
}
