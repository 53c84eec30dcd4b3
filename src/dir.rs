//! Directory decoding: walks a directory inode's data blocks and yields
//! `(inode, file_type, name)` triples, in on-disk order.
//!
//! The path resolver and the `readdir` surface both consume this same
//! sequence so there is exactly one place that understands directory
//! record layout.

use crate::error::Result;
use crate::format::dirent::DirBlockIter;
use crate::format::inode::Inode;
use crate::format::superblock::Superblock;
use crate::io::BlockDevice;
use crate::traversal::read_range;

/// One decoded directory entry, owned so it can outlive the data block
/// buffer it was read from.
#[derive(Debug, Clone)]
pub struct Entry {
    pub inode: u32,
    pub file_type: u8,
    pub name: Vec<u8>,
}

/// Reads every data block of `dir` and returns its entries in on-disk
/// order. `dir` must already be known to be a directory; this function
/// does not check `i_mode`.
///
/// Blocks are read one at a time via [`read_range`] (so holes in a
/// directory's own block list — unusual but not forbidden — are skipped
/// without producing any entries, never an error).
pub fn entries(dev: &dyn BlockDevice, sb: &Superblock, dir: &Inode) -> Result<Vec<Entry>> {
    let block_size = sb.block_size() as u64;
    let size = dir.size();
    let mut out = Vec::new();

    let mut block_offset = 0u64;
    while block_offset < size {
        let chunk = read_range(dev, sb, dir, block_offset, block_size as usize)?;
        if !chunk.is_empty() {
            for e in DirBlockIter::new(&chunk) {
                out.push(Entry {
                    inode: e.inode,
                    file_type: e.file_type,
                    name: e.name.to_vec(),
                });
            }
        }
        block_offset += block_size;
    }

    Ok(out)
}

/// Looks up a single exact-match name within `dir`'s entries, without
/// materialising the whole directory listing into the caller's result if
/// an early match is found (still reads whole blocks at a time, same as
/// [`entries`], since directory records don't straddle block boundaries
/// but the target may be in any block).
pub fn lookup(dev: &dyn BlockDevice, sb: &Superblock, dir: &Inode, name: &[u8]) -> Result<Option<Entry>> {
    let block_size = sb.block_size() as u64;
    let size = dir.size();

    let mut block_offset = 0u64;
    while block_offset < size {
        let chunk = read_range(dev, sb, dir, block_offset, block_size as usize)?;
        if !chunk.is_empty() {
            for e in DirBlockIter::new(&chunk) {
                if e.name == name {
                    return Ok(Some(Entry {
                        inode: e.inode,
                        file_type: e.file_type,
                        name: e.name.to_vec(),
                    }));
                }
            }
        }
        block_offset += block_size;
    }

    Ok(None)
}
