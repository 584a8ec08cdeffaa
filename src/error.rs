use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error on backing file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid superblock")]
    InvalidSuperBlock,
    #[error("invalid block id {0}")]
    InvalidBlockId(usize),
    #[error("buffer size does not match block size")]
    BadBufferSize,
    #[error("file system is corrupted: {0}")]
    Corrupted(String),
    #[error("no such file or directory")]
    NotFound,
    #[error("file or directory already exists")]
    AlreadyExists,
    #[error("no space left on disk")]
    OutOfSpace,
    #[error("open file table is full")]
    OpenTableFull,
    #[error("directory is full")]
    DirectoryFull,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("invalid path")]
    InvalidPath,
    #[error("invalid handle {0}")]
    InvalidHandle(usize),
    #[error("invalid argument: {0}")]
    InvalidOperand(String),
    #[error("not a directory")]
    NotDirectory,
    #[error("not a regular file")]
    NotFile,
    #[error("directory not empty")]
    NotEmpty,
    #[error("file is open")]
    Busy,
    #[error("file is already open")]
    AlreadyOpen,
    #[error("file is not open")]
    NotOpen,
    #[error("operation not permitted on this entry")]
    NotPermitted,
}

pub type Result<T> = core::result::Result<T, FsError>;
