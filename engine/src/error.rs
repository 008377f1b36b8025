//! Engine-wide error type.
//!
//! Grounded on `efs::error::Error` and `efs::fs::error::FsError`: a flat
//! `Display`-able enum rather than `Box<dyn Error>`, so callers can match on
//! the kind to decide between the three categories `spec.md` §7 names
//! (user error, resource exhaustion, fatal). Ignored conditions (§7d) are
//! not represented here at all: they are logged and return `Ok(())`.

use derive_more::{Display, Error, From};

/// Everything that can go wrong in the engine.
#[derive(Debug, Display, Error, From)]
pub enum EngineError {
    /// A pathname component does not exist.
    #[display("not found: {_0}")]
    #[from(ignore)]
    NotFound(String),

    /// Expected a directory, found something else.
    #[display("not a directory: {_0}")]
    #[from(ignore)]
    NotADirectory(String),

    /// Expected a regular file, found something else.
    #[display("not a regular file: {_0}")]
    #[from(ignore)]
    NotARegularFile(String),

    /// The destination of a `creat`/`mkdir`/`link`/`symlink` already exists.
    #[display("already exists: {_0}")]
    #[from(ignore)]
    AlreadyExists(String),

    /// `rmdir` on a non-empty directory.
    #[display("not empty: {_0}")]
    #[from(ignore)]
    NotEmpty(String),

    /// The target is in use and the operation requires exclusive access
    /// (`rmdir` with other references, `umount` of a busy device, mounting
    /// onto a directory that is already referenced elsewhere).
    #[display("busy: {_0}")]
    #[from(ignore)]
    Busy(String),

    /// `open` requested a mode incompatible with the file's existing open mode.
    #[display("already open: {_0}")]
    #[from(ignore)]
    AlreadyOpen(String),

    /// `link`/`mv` attempted across two different mounted devices.
    #[display("cross-device link: {_0}")]
    #[from(ignore)]
    CrossDevice(String),

    /// `rmdir`/`unlink` refused on ".", ".." or "/".
    #[display("refused: {_0}")]
    #[from(ignore)]
    RemoveRefused(String),

    /// A numeric argument (fd, offset, mode) is out of its valid range.
    #[display("invalid argument: {_0}")]
    #[from(ignore)]
    InvalidArgument(String),

    /// A bounded table (mount table, open-file table, descriptor array) has
    /// no free slot.
    #[display("resource exhausted: {_0}")]
    #[from(ignore)]
    TableFull(&'static str),

    /// The file is not on a mounted device / path did not resolve through a
    /// mount point as expected.
    #[display("not mounted: {_0}")]
    #[from(ignore)]
    NotMounted(String),

    /// Unrecoverable condition: inode cache exhaustion, failure to mount
    /// the filesystem root, or bitmap allocation failure on an exhausted
    /// device. `cli` matches on this to exit the process instead of
    /// returning to the prompt.
    #[display("fatal: {_0}")]
    #[from(ignore)]
    Fatal(String),

    /// Propagated I/O failure talking to the backing image file.
    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

impl EngineError {
    /// Whether this error is one of the fatal conditions from `spec.md` §7c.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
