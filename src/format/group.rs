//! The block group descriptor table (BGDT): one fixed-size header per
//! block group, read on demand to locate that group's inode table.

use std::mem::size_of;

use crate::error::{Ext2Error, Result};
use crate::io::{read_exact_at, BlockDevice};

use super::superblock::Superblock;
use super::SUPERBLOCK_OFFSET;

/// The raw, on-disk block group descriptor. Only `inode_table_start_addr`
/// is interpreted by this crate; the rest exist to keep the struct's size
/// (and therefore every subsequent group's offset) correct.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct GroupDescriptor {
    pub block_usage_bitmap_addr: u32,
    pub inode_usage_bitmap_addr: u32,
    pub inode_table_start_addr: u32,
    pub unallocated_blocks_number: u16,
    pub unallocated_inodes_number: u16,
    pub directories_number: u16,
    _padding: [u8; 14],
}

const _: () = assert!(size_of::<GroupDescriptor>() == 32);

impl GroupDescriptor {
    /// The on-disk offset of the `index`th group descriptor. The BGDT
    /// starts immediately after the superblock, which always occupies
    /// one block (the superblock is 1024 bytes and sits at the start of
    /// the second 1024-byte slot regardless of block size).
    fn disk_offset(index: u32, sb: &Superblock) -> u64 {
        SUPERBLOCK_OFFSET + size_of::<Superblock>() as u64 + index as u64 * size_of::<Self>() as u64
    }

    /// Reads the `index`th group descriptor.
    pub fn read(dev: &dyn BlockDevice, sb: &Superblock, index: u32) -> Result<Self> {
        let off = Self::disk_offset(index, sb);
        let bytes = read_exact_at(dev, off, size_of::<Self>())?;
        if bytes.len() != size_of::<Self>() {
            return Err(Ext2Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read while loading a group descriptor",
            )));
        }
        // SAFETY: `GroupDescriptor` is `repr(C, packed)` of plain integers
        // and a byte array, so any bit pattern is valid.
        Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Self) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_superblock() {
        let sb = unsafe { std::mem::zeroed::<Superblock>() };
        assert_eq!(
            GroupDescriptor::disk_offset(0, &sb),
            SUPERBLOCK_OFFSET + size_of::<Superblock>() as u64
        );
        assert_eq!(
            GroupDescriptor::disk_offset(1, &sb),
            SUPERBLOCK_OFFSET + size_of::<Superblock>() as u64 + size_of::<GroupDescriptor>() as u64
        );
    }
}
