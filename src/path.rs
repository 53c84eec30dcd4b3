//! Path resolution: walks a `/`-separated absolute path down to an inode
//! number, starting from the root inode.

use crate::dir;
use crate::error::{Ext2Error, Result};
use crate::format::inode::{Inode, ROOT_INODE};
use crate::format::superblock::Superblock;
use crate::io::BlockDevice;

/// Resolves an absolute path to an inode number.
///
/// Written as a flat loop over tokenised components rather than the
/// recursive walk the format naturally suggests, so resolution depth
/// doesn't grow the call stack.
///
/// Directory-type enforcement only applies to interior components: the
/// inode matched by the final component is never required to be a
/// directory by this function (callers like `open`/`opendir` check that
/// themselves, against their own flags).
pub fn resolve(dev: &dyn BlockDevice, sb: &Superblock, path: &str) -> Result<u32> {
    if path == "/" {
        return Ok(ROOT_INODE);
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(Ext2Error::NotFound);
    };

    let mut current = ROOT_INODE;

    for name in rest.split('/').filter(|c| !c.is_empty()) {
        let inode = Inode::load(dev, sb, current)?;
        if !inode.is_dir() {
            return Err(Ext2Error::NotADirectory);
        }
        let entry = dir::lookup(dev, sb, &inode, name.as_bytes())?.ok_or(Ext2Error::NotFound)?;
        current = entry.inode;
    }

    Ok(current)
}
