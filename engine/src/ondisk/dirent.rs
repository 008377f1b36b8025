//! Directory entry header.
//!
//! Grounded on `efs::fs::ext2::directory::Header`. A directory block is a
//! packed sequence of these headers, each immediately followed by
//! `name_len` bytes of (non-NUL-terminated) file name, with `rec_len`
//! rounding the whole record up to a 4-byte boundary. The last entry in a
//! block absorbs whatever space remains, so `rec_len` can exceed
//! `HEADER_LEN + name_len` (`spec.md` §4's rec_len tiling invariant).

use crate::block_io::Block;
use crate::types::InodeNum;

use super::{read_at, write_at};

/// Number of bytes a [`DirentHeader`] occupies before the name bytes.
pub const HEADER_LEN: usize = 8;

/// Entries are padded so every record starts on a 4-byte boundary.
pub const ENTRY_ALIGN: usize = 4;

/// File type tag stored in a directory entry, mirroring
/// [`crate::permissions::FileType`] but as the single on-disk byte ext2
/// actually stores (`0` is "unknown", used only for entries this simulator
/// never produces).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFileType {
    /// Type not recorded (real ext2's `EXT2_FT_UNKNOWN`).
    Unknown = 0,
    /// Regular file.
    Regular = 1,
    /// Directory.
    Directory = 2,
    /// Symbolic link.
    Symlink = 7,
}

impl EntryFileType {
    /// Maps a raw on-disk byte to a variant, defaulting to `Unknown` for
    /// any value this simulator does not itself produce (device nodes,
    /// fifos, sockets).
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Regular,
            2 => Self::Directory,
            7 => Self::Symlink,
            _ => Self::Unknown,
        }
    }
}

/// The fixed-size prefix of a directory entry.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct DirentHeader {
    /// Inode number this entry names, or `0` for a deleted/unused slot.
    pub inode: u32,
    /// Total record length in bytes, including this header and the name.
    pub rec_len: u16,
    /// Length of the file name in bytes.
    pub name_len: u8,
    /// The entry's file type tag.
    pub file_type: u8,
}

const _: () = assert!(core::mem::size_of::<DirentHeader>() == HEADER_LEN);

impl DirentHeader {
    /// Builds a header for a new entry naming `inode`, given the name's
    /// byte length and the record length it will occupy.
    #[must_use]
    pub fn new(inode: InodeNum, name_len: u8, rec_len: u16, file_type: EntryFileType) -> Self {
        Self {
            inode: inode.0,
            rec_len,
            name_len,
            file_type: file_type as u8,
        }
    }

    /// Whether this slot names a live entry.
    #[must_use]
    pub const fn is_used(&self) -> bool {
        self.inode != 0
    }

    /// Reads a header at byte `offset` within a directory block.
    #[must_use]
    pub fn from_block(block: &Block, offset: usize) -> Self {
        unsafe { read_at(block, offset) }
    }

    /// Writes this header at byte `offset` within a directory block.
    pub fn write_into(&self, block: &mut Block, offset: usize) {
        unsafe { write_at(block, offset, *self) };
    }
}

/// Rounds `len` up to the next multiple of [`ENTRY_ALIGN`].
#[must_use]
pub const fn align_up(len: usize) -> usize {
    (len + ENTRY_ALIGN - 1) & !(ENTRY_ALIGN - 1)
}

/// The minimum `rec_len` a name of `name_len` bytes needs: header plus name,
/// rounded up to the alignment.
#[must_use]
pub const fn min_rec_len(name_len: usize) -> u16 {
    align_up(HEADER_LEN + name_len) as u16
}
