//! `MountContext`: the process-wide, read-only state shared by every
//! request once a mount has started — the image handle, the superblock,
//! and the block size derived from it.
//!
//! This replaces the three module-level globals (`g_img`, `g_block_size`,
//! `g_sb`) the original decoder kept: a single value constructed once at
//! mount and threaded through every callback, which also means nothing
//! stops a process from serving more than one mount at a time.

use crate::attr::{Attr, DirEntryAttr};
use crate::dir;
use crate::error::{Ext2Error, Result};
use crate::format::inode::{Inode, ROOT_INODE};
use crate::format::superblock::Superblock;
use crate::io::BlockDevice;
use crate::path;
use crate::traversal::read_range;

/// Access-intent flags an `open` caller may request. The core only cares
/// whether any write intent is present; individual `O_RDONLY`-style
/// distinctions are the bridge's concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub write: bool,
    pub directory: bool,
}

/// Mount-wide state: the image handle plus the superblock read from it.
/// Immutable after construction, safe to share across request threads
/// (see the crate's concurrency notes).
pub struct MountContext<D> {
    dev: D,
    sb: Superblock,
}

impl<D: BlockDevice> MountContext<D> {
    /// Reads the superblock from `dev` and materialises a mount context.
    /// Fatal on a short or failed superblock read — there is no sensible
    /// way to serve requests without it.
    pub fn mount(dev: D) -> Result<Self> {
        let sb = Superblock::read(&dev).map_err(|e| match e {
            Ext2Error::Io(io) => Ext2Error::InvalidSuperblock(io),
            other => other,
        })?;
        Ok(Self { dev, sb })
    }

    pub fn block_size(&self) -> u32 {
        self.sb.block_size()
    }

    /// Loads the inode record addressed by `ino`.
    pub fn load_inode(&self, ino: u32) -> Result<Inode> {
        Inode::load(&self.dev, &self.sb, ino)
    }

    /// Walks an absolute path down to an inode number, from the root.
    pub fn resolve_path(&self, path: &str) -> Result<u32> {
        path::resolve(&self.dev, &self.sb, path)
    }

    /// `getattr`: translates an already-resolved inode into a stat-like
    /// record. `ino` is trusted to have been resolved by this mount
    /// (the bridge is responsible for rejecting stale/unknown numbers
    /// before calling down into the core).
    pub fn getattr(&self, ino: u32) -> Result<Attr> {
        let inode = self.load_inode(ino)?;
        Ok(Attr::from_inode(ino, &inode))
    }

    /// Single-component lookup within an already-resolved directory:
    /// the operation the FUSE `lookup` callback performs on every path
    /// component the kernel hasn't already cached. Built directly on the
    /// same directory decoder the full path resolver uses.
    pub fn lookup(&self, parent: u32, name: &[u8]) -> Result<Attr> {
        let dir_inode = self.load_inode(parent)?;
        if !dir_inode.is_dir() {
            return Err(Ext2Error::NotADirectory);
        }
        let entry = dir::lookup(&self.dev, &self.sb, &dir_inode, name)?.ok_or(Ext2Error::NotFound)?;
        let child = self.load_inode(entry.inode)?;
        Ok(Attr::from_inode(entry.inode, &child))
    }

    /// `readdir`: the full, ordered `(name, attr)` listing of a
    /// directory, including the on-disk `.`/`..` records verbatim.
    pub fn readdir(&self, ino: u32) -> Result<Vec<(Vec<u8>, DirEntryAttr)>> {
        let inode = self.load_inode(ino)?;
        if !inode.is_dir() {
            return Err(Ext2Error::NotADirectory);
        }
        let entries = dir::entries(&self.dev, &self.sb, &inode)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.name, DirEntryAttr::from_raw(e.inode, e.file_type)))
            .collect())
    }

    /// `open`: validates access intent against an already-resolved inode.
    /// Any write intent is refused outright; opening a directory without
    /// the directory flag is `EISDIR`.
    pub fn open(&self, ino: u32, flags: OpenFlags) -> Result<()> {
        if flags.write {
            return Err(Ext2Error::ReadOnlyFilesystem);
        }
        let inode = self.load_inode(ino)?;
        if inode.is_dir() && !flags.directory {
            return Err(Ext2Error::IsADirectory);
        }
        Ok(())
    }

    /// `opendir`: succeeds only when the inode is a directory.
    pub fn opendir(&self, ino: u32) -> Result<()> {
        let inode = self.load_inode(ino)?;
        if !inode.is_dir() {
            return Err(Ext2Error::NotADirectory);
        }
        Ok(())
    }

    /// `read`: random-access read of `len` bytes at `offset` from an
    /// already-resolved inode's logical byte space.
    pub fn read(&self, ino: u32, offset: u64, len: usize) -> Result<Vec<u8>> {
        let inode = self.load_inode(ino)?;
        read_range(&self.dev, &self.sb, &inode, offset, len)
    }

    /// Every mutating operation (`write`, `mknod`, `mkdir`, and any
    /// implicit file creation) uniformly refuses with `EROFS`, regardless
    /// of whether the target path would otherwise have resolved.
    pub fn reject_mutation(&self) -> Result<()> {
        Err(Ext2Error::ReadOnlyFilesystem)
    }

    /// The root inode number, exposed so the bridge can seed its inode
    /// table at `init` without a path walk.
    pub fn root_inode(&self) -> u32 {
        ROOT_INODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_record(buf: &mut Vec<u8>, inode: u32, name: &[u8], rec_len: u16, file_type: u8) {
        buf.extend_from_slice(&inode.to_le_bytes());
        buf.extend_from_slice(&rec_len.to_le_bytes());
        buf.push(name.len() as u8);
        buf.push(file_type);
        buf.extend_from_slice(name);
        let padding = rec_len as usize - (8 + name.len());
        buf.extend(std::iter::repeat(0).take(padding));
    }

    /// A one-block-per-directory image with `/` containing a regular
    /// file `hello.txt` of 11 bytes ("hello world").
    fn fixture() -> Vec<u8> {
        const BLOCK_SIZE: usize = 1024;
        let mut dev = vec![0u8; BLOCK_SIZE * 6];

        // Superblock at offset 1024. `block_size_log` stays 0 (1024-byte
        // blocks) from the zeroed buffer; only the fields this fixture
        // needs are set explicitly.
        let sb_off = 1024usize;
        dev[sb_off + 40..sb_off + 44].copy_from_slice(&32u32.to_le_bytes()); // inodes_per_group
        dev[sb_off + 76..sb_off + 80].copy_from_slice(&1u32.to_le_bytes()); // major_version
        dev[sb_off + 88..sb_off + 90].copy_from_slice(&128u16.to_le_bytes()); // inode_size

        // Group descriptor table at block 2 (right after the one-block
        // superblock): inode table starts at block 4.
        let gd_off = sb_off + std::mem::size_of::<Superblock>();
        dev[gd_off + 8..gd_off + 12].copy_from_slice(&4u32.to_le_bytes()); // inode_table_start_addr = block 4

        // Root directory data at block 3: entries "." ".." "hello.txt" -> inode 11.
        let mut root_block = Vec::new();
        push_record(&mut root_block, 2, b".", 12, 2);
        push_record(&mut root_block, 2, b"..", 12, 2);
        push_record(&mut root_block, 11, b"hello.txt", (BLOCK_SIZE - 24) as u16, 1);
        root_block.resize(BLOCK_SIZE, 0);
        dev[3 * BLOCK_SIZE..4 * BLOCK_SIZE].copy_from_slice(&root_block);

        // Inode table at block 4.
        let table_off = 4 * BLOCK_SIZE;
        write_inode(&mut dev, table_off, 2, 0x4000 | 0o755, BLOCK_SIZE as u32, 3);
        write_inode(&mut dev, table_off, 11, 0x8000 | 0o644, 11, 5);

        // File data at block 5.
        dev[5 * BLOCK_SIZE..5 * BLOCK_SIZE + 11].copy_from_slice(b"hello world");

        dev
    }

    fn write_inode(dev: &mut [u8], table_off: usize, ino: u32, mode: u16, size: u32, data_block: u32) {
        let off = table_off + (ino as usize - 1) * 128;
        dev[off..off + 2].copy_from_slice(&mode.to_le_bytes());
        dev[off + 4..off + 8].copy_from_slice(&size.to_le_bytes());
        dev[off + 40..off + 44].copy_from_slice(&data_block.to_le_bytes());
        dev[off + 26..off + 28].copy_from_slice(&1u16.to_le_bytes()); // links_count
    }

    #[test]
    fn mount_and_root_getattr() {
        let ctx = MountContext::mount(fixture()).unwrap();
        let attr = ctx.getattr(ctx.root_inode()).unwrap();
        assert_eq!(attr.kind, crate::attr::Kind::Directory);
    }

    #[test]
    fn lookup_and_read_whole_file() {
        let ctx = MountContext::mount(fixture()).unwrap();
        let attr = ctx.lookup(ctx.root_inode(), b"hello.txt").unwrap();
        assert_eq!(attr.size, 11);
        let data = ctx.read(attr.ino as u32, 0, 11).unwrap();
        assert_eq!(&data, b"hello world");
    }

    #[test]
    fn open_write_is_read_only_filesystem() {
        let ctx = MountContext::mount(fixture()).unwrap();
        let ino = ctx.resolve_path("/hello.txt").unwrap();
        let err = ctx
            .open(ino, OpenFlags {
                write: true,
                directory: false,
            })
            .unwrap_err();
        assert!(matches!(err, Ext2Error::ReadOnlyFilesystem));
    }

    #[test]
    fn open_directory_without_flag_is_is_a_directory() {
        let ctx = MountContext::mount(fixture()).unwrap();
        let err = ctx
            .open(ctx.root_inode(), OpenFlags::default())
            .unwrap_err();
        assert!(matches!(err, Ext2Error::IsADirectory));
    }

    #[test]
    fn readdir_includes_dot_and_dotdot() {
        let ctx = MountContext::mount(fixture()).unwrap();
        let names: Vec<_> = ctx
            .readdir(ctx.root_inode())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec![b".".to_vec(), b"..".to_vec(), b"hello.txt".to_vec()]);
    }

    #[test]
    fn mutation_always_rejected() {
        let ctx = MountContext::mount(fixture()).unwrap();
        assert!(matches!(ctx.reject_mutation(), Err(Ext2Error::ReadOnlyFilesystem)));
    }
}
