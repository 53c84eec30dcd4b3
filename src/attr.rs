//! Attribute translation: inodes and directory entries to stat-like
//! records, independent of any particular filesystem-bridge API.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::format::inode::Inode;
use crate::format::{
    file_type_to_mode_bits, FT_BLKDEV, FT_CHRDEV, FT_DIR, FT_FIFO, FT_REG_FILE, FT_SOCK, FT_SYMLINK, S_IFBLK,
    S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFSOCK,
};

/// The inode's type, independent of permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    RegularFile,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Symlink,
}

impl Kind {
    /// Decodes the type bits out of an on-disk `i_mode`. A mode with no
    /// recognised type bit (corrupt or pre-type-field image) is treated
    /// as a regular file; the on-disk inode is trusted, per this crate's
    /// no-corruption-recovery stance.
    fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            S_IFDIR => Kind::Directory,
            S_IFCHR => Kind::CharDevice,
            S_IFBLK => Kind::BlockDevice,
            S_IFIFO => Kind::Fifo,
            S_IFSOCK => Kind::Socket,
            S_IFLNK => Kind::Symlink,
            _ => Kind::RegularFile,
        }
    }

    /// Decodes a directory entry's `file_type` byte, the same table the
    /// on-disk format uses, without needing to load the entry's inode.
    pub fn from_dirent_type(file_type: u8) -> Self {
        match file_type {
            FT_DIR => Kind::Directory,
            FT_CHRDEV => Kind::CharDevice,
            FT_BLKDEV => Kind::BlockDevice,
            FT_FIFO => Kind::Fifo,
            FT_SOCK => Kind::Socket,
            FT_SYMLINK => Kind::Symlink,
            FT_REG_FILE => Kind::RegularFile,
            _ => Kind::RegularFile,
        }
    }
}

/// A stat-like attribute record, translated from an on-disk inode.
#[derive(Debug, Clone)]
pub struct Attr {
    pub ino: u64,
    pub kind: Kind,
    /// Permission bits only (`i_mode & 0o7777`); the type bits live in
    /// `kind`.
    pub perm: u16,
    pub size: u64,
    /// 512-byte sector count, `i_blocks` verbatim.
    pub blocks: u64,
    pub nlink: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

fn from_epoch_secs(secs: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs as u64)
}

impl Attr {
    /// Builds an attribute record for `ino` from its already-loaded
    /// inode. `uid`/`gid` are deliberately not here: the on-disk owner is
    /// masked in favour of the invoking context's identity (see the
    /// filesystem-bridge adapter).
    pub fn from_inode(ino: u32, inode: &Inode) -> Self {
        Attr {
            ino: ino as u64,
            kind: Kind::from_mode(inode.mode),
            perm: inode.mode & !S_IFMT,
            size: inode.size(),
            blocks: inode.blocks as u64,
            nlink: inode.links_count as u32,
            atime: from_epoch_secs(inode.atime),
            mtime: from_epoch_secs(inode.mtime),
            ctime: from_epoch_secs(inode.ctime),
        }
    }
}

/// Minimal attributes for one `readdir` entry: enough to populate the
/// bridge's dirent callback without loading the child inode.
#[derive(Debug, Clone)]
pub struct DirEntryAttr {
    pub ino: u64,
    pub kind: Kind,
    /// The `i_mode` type bits this entry would carry, using the same
    /// mapping table the directory-record decoder uses.
    pub mode_bits: u16,
}

impl DirEntryAttr {
    pub fn from_raw(inode: u32, file_type: u8) -> Self {
        Self {
            ino: inode as u64,
            kind: Kind::from_dirent_type(file_type),
            mode_bits: file_type_to_mode_bits(file_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_mode_recognises_directory() {
        assert_eq!(Kind::from_mode(S_IFDIR | 0o755), Kind::Directory);
        assert_eq!(Kind::from_mode(crate::format::S_IFREG | 0o644), Kind::RegularFile);
    }

    #[test]
    fn attr_strips_type_bits_from_perm() {
        let mut inode = unsafe { std::mem::zeroed::<Inode>() };
        inode.mode = S_IFDIR | 0o750;
        inode.links_count = 3;
        let attr = Attr::from_inode(2, &inode);
        assert_eq!(attr.perm, 0o750);
        assert_eq!(attr.kind, Kind::Directory);
        assert_eq!(attr.nlink, 3);
    }
}
