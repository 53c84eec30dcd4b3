//! The FUSE bridge: a thin `fuser::Filesystem` adapter over
//! [`MountContext`]. Everything here is glue — translating the kernel's
//! inode-number/file-handle protocol into calls against the core, and
//! flattening [`Ext2Error`] down to the raw errno `fuser` expects.
//!
//! `fuser` exposes the low-level, inode-based FUSE API rather than a
//! path-based one: every component past the first in a path is resolved
//! by a separate `lookup(parent_ino, name)` call that the kernel caches,
//! so this adapter almost never needs [`crate::path::resolve`] itself —
//! only `init` uses it, to report the root inode.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, Request,
};
use log::{debug, trace, warn};

use crate::attr::{Attr, Kind};
use crate::context::{MountContext, OpenFlags};
use crate::error::Ext2Error;
use crate::io::BlockDevice;

/// How long the kernel may cache attribute/entry replies before asking
/// again. The image is immutable for the mount's lifetime, but a short
/// TTL rather than an infinite one keeps behaviour unsurprising if the
/// backing file is ever replaced out from under a long-running mount.
const ATTR_TTL: Duration = Duration::from_secs(1);

fn to_file_type(kind: Kind) -> FileType {
    match kind {
        Kind::RegularFile => FileType::RegularFile,
        Kind::Directory => FileType::Directory,
        Kind::CharDevice => FileType::CharDevice,
        Kind::BlockDevice => FileType::BlockDevice,
        Kind::Fifo => FileType::NamedPipe,
        Kind::Socket => FileType::Socket,
        Kind::Symlink => FileType::Symlink,
    }
}

/// Adapts [`Ext2Error`] to the FUSE reply boundary's positive errno.
fn reply_error(err: &Ext2Error) -> i32 {
    if matches!(err, Ext2Error::Io(_) | Ext2Error::InvalidSuperblock(_)) {
        warn!("image I/O error while serving request: {err}");
    }
    err.errno()
}

/// A `fuser::Filesystem` over a mounted ext2 image. `uid`/`gid` are the
/// identity every inode is reported as owning, since the on-disk owner
/// is deliberately masked in favour of the invoking context's identity.
pub struct Ext2Fs<D> {
    ctx: MountContext<D>,
    uid: u32,
    gid: u32,
}

impl<D: BlockDevice> Ext2Fs<D> {
    pub fn new(ctx: MountContext<D>, uid: u32, gid: u32) -> Self {
        Self { ctx, uid, gid }
    }

    fn file_attr(&self, attr: &Attr) -> FileAttr {
        FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.blocks,
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: SystemTime::UNIX_EPOCH,
            kind: to_file_type(attr.kind),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: self.ctx.block_size(),
            flags: 0,
        }
    }
}

impl<D: BlockDevice> Filesystem for Ext2Fs<D> {
    fn init(&mut self, _req: &Request, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        debug!("mounted, root inode = {}", self.ctx.root_inode());
        Ok(())
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        trace!("lookup(parent={parent}, name={name:?})");
        match self.ctx.lookup(parent as u32, name.as_bytes()) {
            Ok(attr) => reply.entry(&ATTR_TTL, &self.file_attr(&attr), 0),
            Err(e) => reply.error(reply_error(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!("getattr(ino={ino})");
        match self.ctx.getattr(ino as u32) {
            Ok(attr) => reply.attr(&ATTR_TTL, &self.file_attr(&attr)),
            Err(e) => reply.error(reply_error(&e)),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let write = flags & (libc::O_WRONLY | libc::O_RDWR) != 0;
        match self.ctx.open(ino as u32, OpenFlags { write, directory: false }) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(reply_error(&e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        trace!("read(ino={ino}, offset={offset}, size={size})");
        let offset = offset.max(0) as u64;
        match self.ctx.read(ino as u32, offset, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(reply_error(&e)),
        }
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.ctx.opendir(ino as u32) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(reply_error(&e)),
        }
    }

    fn readdir(&mut self, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        trace!("readdir(ino={ino}, offset={offset})");
        let entries = match self.ctx.readdir(ino as u32) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(reply_error(&e));
                return;
            }
        };

        for (i, (name, entry)) in entries.into_iter().enumerate().skip(offset as usize) {
            let next_offset = (i + 1) as i64;
            let full = reply.add(entry.ino, next_offset, to_file_type(entry.kind), OsStr::from_bytes(&name));
            if full {
                break;
            }
        }
        reply.ok();
    }

    fn mknod(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: fuser::ReplyEntry,
    ) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn mkdir(&mut self, _req: &Request, _parent: u64, _name: &OsStr, _mode: u32, _umask: u32, reply: ReplyEntry) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn write(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn unlink(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn rmdir(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn rename(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }

    fn setattr(
        &mut self,
        _req: &Request,
        _ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        reply.error(Ext2Error::ReadOnlyFilesystem.errno());
    }
}
