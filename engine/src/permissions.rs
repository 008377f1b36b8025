//! UNIX-style file type and permission bits.
//!
//! Grounded on `efs::permissions::Permissions` (the bottom-12-bits bitflags
//! set with a `Display` impl rendering the `rwxrwxrwx` triad) and
//! `efs::fs::ext2::inode::TypePermissions` (the top-nibble type discriminant
//! packed into the same 16-bit mode word ext2 stores on disk).

use core::fmt::Display;

use bitflags::bitflags;

bitflags! {
    /// The low 12 bits of an inode's mode word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u16 {
        /// Other - execute
        const OTHER_EXEC  = 0o0001;
        /// Other - write
        const OTHER_WRITE = 0o0002;
        /// Other - read
        const OTHER_READ  = 0o0004;
        /// Group - execute
        const GROUP_EXEC  = 0o0010;
        /// Group - write
        const GROUP_WRITE = 0o0020;
        /// Group - read
        const GROUP_READ  = 0o0040;
        /// Owner - execute
        const USER_EXEC   = 0o0100;
        /// Owner - write
        const USER_WRITE  = 0o0200;
        /// Owner - read
        const USER_READ   = 0o0400;
        /// Sticky bit
        const STICKY      = 0o1000;
        /// Set-group-ID
        const SET_GID     = 0o2000;
        /// Set-user-ID
        const SET_UID     = 0o4000;
    }
}

impl Display for Permissions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}{}{}",
            if self.contains(Self::USER_READ) { "r" } else { "-" },
            if self.contains(Self::USER_WRITE) { "w" } else { "-" },
            if self.contains(Self::USER_EXEC) { "x" } else { "-" },
            if self.contains(Self::GROUP_READ) { "r" } else { "-" },
            if self.contains(Self::GROUP_WRITE) { "w" } else { "-" },
            if self.contains(Self::GROUP_EXEC) { "x" } else { "-" },
            if self.contains(Self::OTHER_READ) { "r" } else { "-" },
            if self.contains(Self::OTHER_WRITE) { "w" } else { "-" },
            if self.contains(Self::OTHER_EXEC) { "x" } else { "-" },
        )
    }
}

impl Permissions {
    /// Mask covering only the mode bits `chmod` is allowed to touch (the low 9 bits).
    pub const CHMOD_MASK: u16 = 0o777;
}

/// The file-type discriminant packed into the top nibble of the mode word.
///
/// ext2 also defines fifo/char-device/block-device/socket types; this
/// simulator never creates them (`spec.md` Non-goals), but `Other` is kept
/// so `stat`/`ls` on a foreign image do not panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// A regular file.
    Regular,
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink,
    /// Any other ext2 file type (fifo, device, socket) this simulator does not create.
    Other,
}

/// Type bits, as stored in the top nibble of `mode`.
pub const S_IFREG: u16 = 0o100_000;
/// Directory type bit.
pub const S_IFDIR: u16 = 0o040_000;
/// Symbolic link type bit.
pub const S_IFLNK: u16 = 0o120_000;
/// Mask isolating the type nibble from the mode word.
pub const S_IFMT: u16 = 0o170_000;

/// The mode word a new regular file is created with: type `S_IFREG`, `rw-r--r--`.
pub const REG_FILE_MODE: u16 = S_IFREG | 0o644;
/// The mode word a new directory is created with: type `S_IFDIR`, `rwxr-xr-x`.
pub const DIR_FILE_MODE: u16 = S_IFDIR | 0o755;
/// The mode word a symlink's inode is rewritten to by `symlink`: type `S_IFLNK`, `rwxrwxrwx`.
pub const LNK_FILE_MODE: u16 = S_IFLNK | 0o777;

impl FileType {
    /// Extracts the file type from a raw mode word.
    #[must_use]
    pub const fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::Regular,
            S_IFDIR => Self::Directory,
            S_IFLNK => Self::Symlink,
            _ => Self::Other,
        }
    }
}

/// Formats a mode word the way `ls -l`/`stat` would: type letter followed by the `rwx` triad.
#[must_use]
pub fn format_mode(mode: u16) -> String {
    let kind = match FileType::from_mode(mode) {
        FileType::Regular => '-',
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::Other => '?',
    };
    let perms = Permissions::from_bits_truncate(mode & 0o7777);
    format!("{kind}{perms}")
}
