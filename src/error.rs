//! Error types shared by every decoding stage.

use std::io;

use thiserror::Error;

/// Failure kinds produced while decoding an ext2 image or resolving a path.
///
/// Every leaf operation in the core returns `Result<T, Ext2Error>`; the
/// FUSE adapter is the only place that flattens this down to a raw errno.
#[derive(Debug, Error)]
pub enum Ext2Error {
    /// The underlying image handle failed, or returned an unexpectedly
    /// short read where a full one was required.
    #[error("image I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path component does not exist in its parent directory.
    #[error("no such file or directory")]
    NotFound,

    /// An interior path component is not a directory.
    #[error("not a directory")]
    NotADirectory,

    /// A directory was opened without `O_DIRECTORY`.
    #[error("is a directory")]
    IsADirectory,

    /// Any operation that would mutate the image.
    #[error("read-only filesystem")]
    ReadOnlyFilesystem,

    /// The superblock could not be read at mount time. Fatal: there is no
    /// sensible way to serve requests without it.
    #[error("invalid or unreadable superblock: {0}")]
    InvalidSuperblock(io::Error),
}

impl Ext2Error {
    /// Maps the error to the negative `errno` value the FUSE boundary
    /// expects (`fuser::Reply*::error` takes the positive `errno`, the
    /// sign flip happens at the call site).
    pub fn errno(&self) -> i32 {
        match self {
            Ext2Error::Io(_) | Ext2Error::InvalidSuperblock(_) => libc::EIO,
            Ext2Error::NotFound => libc::ENOENT,
            Ext2Error::NotADirectory => libc::ENOTDIR,
            Ext2Error::IsADirectory => libc::EISDIR,
            Ext2Error::ReadOnlyFilesystem => libc::EROFS,
        }
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Ext2Error>;
