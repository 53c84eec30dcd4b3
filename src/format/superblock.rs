//! The ext2 superblock: the single global header read once at mount.

use std::mem::size_of;

use crate::error::{Ext2Error, Result};
use crate::io::{read_exact_at, BlockDevice};

use super::SUPERBLOCK_OFFSET;

/// The raw, on-disk superblock layout. Field order and sizes mirror the
/// format exactly; only the fields this crate actually uses are
/// interpreted, the rest exist to keep the struct's size (and therefore
/// every offset computed from it) correct.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Superblock {
    pub total_inodes: u32,
    pub total_blocks: u32,
    pub superuser_blocks: u32,
    pub total_unallocated_blocks: u32,
    pub total_unallocated_inodes: u32,
    pub superblock_block_number: u32,
    /// `log2(block_size) - 10`.
    pub block_size_log: u32,
    pub fragment_size_log: u32,
    pub blocks_per_group: u32,
    pub fragments_per_group: u32,
    pub inodes_per_group: u32,
    pub last_mount_timestamp: u32,
    pub last_write_timestamp: u32,
    pub mount_count_since_fsck: u16,
    pub mount_count_before_fsck: u16,
    pub signature: u16,
    pub fs_state: u16,
    pub error_action: u16,
    pub minor_version: u16,
    pub last_fsck_timestamp: u32,
    pub fsck_interval: u32,
    pub os_id: u32,
    pub major_version: u32,
    pub uid_reserved: u16,
    pub gid_reserved: u16,

    // Extended superblock fields (present whenever `major_version >= 1`).
    pub first_non_reserved_inode: u32,
    pub inode_size: u16,
    pub superblock_group: u16,
    pub optional_features: u32,
    pub required_features: u32,
    pub write_required_features: u32,
    pub filesystem_id: [u8; 16],
    pub volume_name: [u8; 16],
    pub last_mount_path: [u8; 64],
    pub compression_algorithms: u32,
    pub files_preallocate_count: u8,
    pub directories_preallocate_count: u8,
    _unused: u16,
    pub journal_id: [u8; 16],
    pub journal_inode: u32,
    pub journal_device: u32,
    pub orphan_inode_head: u32,

    _padding: [u8; 788],
}

const _: () = assert!(size_of::<Superblock>() == 1024);

/// The ext2 magic signature (`s_magic`). Not validated at mount — a
/// corrupt superblock is out of scope, see the crate's top-level docs.
pub const EXT2_SIGNATURE: u16 = 0xef53;

impl Superblock {
    /// Reads the superblock from its fixed absolute offset.
    pub fn read(dev: &dyn BlockDevice) -> Result<Self> {
        let bytes = read_exact_at(dev, SUPERBLOCK_OFFSET, size_of::<Self>())?;
        if bytes.len() != size_of::<Self>() {
            return Err(Ext2Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read while loading the superblock",
            )));
        }
        // SAFETY: `Superblock` is `repr(C, packed)` of plain integers and
        // byte arrays, so any 1024-byte sequence is a valid bit pattern.
        let sb = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Superblock) };
        Ok(sb)
    }

    /// The filesystem's block size in bytes: `1024 << s_log_block_size`.
    pub fn block_size(&self) -> u32 {
        1024u32 << self.block_size_log
    }

    /// The size in bytes of one on-disk inode record.
    pub fn inode_size(&self) -> u32 {
        if self.major_version >= 1 {
            self.inode_size as u32
        } else {
            128
        }
    }
}
