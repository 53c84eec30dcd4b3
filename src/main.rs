//! `ext2ro-mount`: mounts a read-only ext2 image at a directory via FUSE.
//!
//! Mirrors the original exercise's `ext2fuse(img_fd, mntp)` entry point:
//! open the image, read the superblock once, then hand control to the
//! FUSE event loop. A failure to read the superblock is fatal — there is
//! no sensible way to serve requests without it — everything past that
//! point is a per-request error handled inside [`ext2ro::fs::Ext2Fs`].

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fuser::MountOption;
use log::error;

use ext2ro::context::MountContext;
use ext2ro::fs::Ext2Fs;

/// Mount a read-only ext2 disk image as a userspace filesystem.
#[derive(Debug, Parser)]
#[command(name = "ext2ro-mount", version, about)]
struct Args {
    /// Path to the ext2 disk image.
    image: PathBuf,

    /// Directory to mount the filesystem on.
    mountpoint: PathBuf,

    /// Stay attached to the terminal instead of forking to the background.
    #[arg(short = 'f', long)]
    foreground: bool,

    /// Allow other users to access the mount (requires `user_allow_other`
    /// in `/etc/fuse.conf`).
    #[arg(long)]
    allow_other: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let image = match File::open(&args.image) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to open image {}: {e}", args.image.display());
            return ExitCode::FAILURE;
        }
    };

    let ctx = match MountContext::mount(image) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("failed to read superblock from {}: {e}", args.image.display());
            return ExitCode::FAILURE;
        }
    };

    // The on-disk owner is masked (see `Attr::from_inode`); every inode is
    // reported as owned by whoever invoked the mount.
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    let fs = Ext2Fs::new(ctx, uid, gid);

    let mut options = vec![MountOption::RO, MountOption::FSName("ext2ro".to_string())];
    if args.allow_other {
        options.push(MountOption::AllowOther);
    }

    if args.foreground {
        return match fuser::mount2(fs, &args.mountpoint, &options) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("mount failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Background mode: service requests on a dedicated thread; park this
    // one for the rest of the process's life so the session's `Drop`
    // (which tears the mount down) never runs early.
    match fuser::spawn_mount2(fs, &args.mountpoint, &options) {
        Ok(_session) => {
            // The session services requests on its own thread and tears
            // the mount down on drop; park the main thread for the rest
            // of the process's life so that drop never runs early.
            loop {
                std::thread::park();
            }
        }
        Err(e) => {
            error!("mount failed: {e}");
            ExitCode::FAILURE
        }
    }
}
