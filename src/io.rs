//! Exact-transfer primitives over a seekable, random-access byte handle.
//!
//! Every decoding stage above this module assumes it either gets a full
//! block's worth of bytes or an unambiguous short-read signal; pushing the
//! interrupted/short-read retry loop down here keeps every higher level
//! branchless in the common case.

use std::io;

use crate::error::{Ext2Error, Result};

/// A random-access, read-only byte source.
///
/// Implemented for [`std::fs::File`] via positional reads so that no shared
/// seek cursor is mutated across concurrent requests (see the concurrency
/// notes on [`crate::mount::MountContext`]). Test code implements it for an
/// in-memory buffer to build synthetic images without touching disk.
pub trait BlockDevice: Send + Sync {
    /// Reads into `buf` starting at `offset`, returning the number of bytes
    /// actually read in a single underlying call (may be short).
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl BlockDevice for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

impl BlockDevice for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - offset);
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

/// Reads exactly `len` bytes at `offset`, retrying interrupted operations
/// and stopping early on a clean EOF.
///
/// A zero-byte underlying read is treated as EOF: whatever has already
/// been delivered is returned rather than treated as an error, so the
/// caller can decide whether a short result is itself a problem (it is,
/// for a block read that the superblock/inode table promised would be
/// there; it is not, for probing past a sparse hole that was already
/// zero-filled by the caller before this call).
pub fn read_exact_at<D: BlockDevice + ?Sized>(dev: &D, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0usize;
    while filled < len {
        match dev.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Ext2Error::Io(e)),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// A random-access, write-capable byte sink.
///
/// The core read-only filesystem never calls this — every mutating FUSE
/// callback is refused with `EROFS` before any write would occur — but the
/// module keeps the dual of [`read_exact_at`] for symmetry with the
/// exact-transfer contract, the same shape the original `pread_exact` /
/// `write_exact` pair exposed.
pub trait BlockDeviceMut: BlockDevice {
    /// Writes `buf` at `offset`, returning the number of bytes actually
    /// written in a single underlying call (may be short).
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

impl BlockDeviceMut for std::fs::File {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(self, buf, offset)
    }
}

impl BlockDeviceMut for Vec<u8> {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let offset = offset as usize;
        if self.len() < offset + buf.len() {
            self.resize(offset + buf.len(), 0);
        }
        self[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }
}

/// Writes exactly `buf.len()` bytes at `offset`, retrying interrupted
/// operations and stopping early on a zero-length write.
pub fn write_exact_at<D: BlockDeviceMut + ?Sized>(dev: &mut D, offset: u64, buf: &[u8]) -> Result<usize> {
    let mut written = 0usize;
    while written < buf.len() {
        match dev.write_at(&buf[written..], offset + written as u64) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Ext2Error::Io(e)),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_exact_at_full_buffer() {
        let dev: Vec<u8> = (0..64).collect();
        let got = read_exact_at(&dev, 10, 16).unwrap();
        assert_eq!(got, (10..26).collect::<Vec<u8>>());
    }

    #[test]
    fn read_exact_at_short_at_eof() {
        let dev: Vec<u8> = (0..10).collect();
        let got = read_exact_at(&dev, 5, 16).unwrap();
        assert_eq!(got, (5..10).collect::<Vec<u8>>());
    }

    #[test]
    fn read_exact_at_past_end_is_empty() {
        let dev: Vec<u8> = vec![1, 2, 3];
        let got = read_exact_at(&dev, 10, 4).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn write_exact_at_grows_buffer() {
        let mut dev: Vec<u8> = vec![0; 4];
        let n = write_exact_at(&mut dev, 2, &[9, 9, 9]).unwrap();
        assert_eq!(n, 3);
        assert_eq!(dev, vec![0, 0, 9, 9, 9]);
    }
}
