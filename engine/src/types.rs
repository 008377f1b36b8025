//! Small newtypes shared across the engine.
//!
//! Grounded on `efs::types`: thin wrappers around the POSIX-ish scalar
//! fields (`uid_t`, `gid_t`, `mode_t`, block/inode numbers) so that callers
//! cannot accidentally pass an inode number where a block number is
//! expected.

use derive_more::{Add, Deref, DerefMut, Sub};

/// User ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deref, DerefMut, Default)]
pub struct Uid(pub u32);

/// Group ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deref, DerefMut, Default)]
pub struct Gid(pub u32);

/// POSIX time in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deref, DerefMut, Default)]
pub struct Time(pub u32);

/// Inode number. Numbering starts at 1; inode 2 is always the root of its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, DerefMut, Add, Sub)]
pub struct InodeNum(pub u32);

/// Physical or logical block number. `0` means "no block".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, DerefMut, Add, Sub)]
pub struct BlockNum(pub u32);

impl BlockNum {
    /// The sentinel meaning "this slot holds no block".
    pub const NONE: Self = Self(0);

    /// Whether this is the "no block" sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// The root directory's inode number on any ext2 device.
pub const ROOT_INODE: InodeNum = InodeNum(2);

/// Size in bytes of a block: ext2 supports other sizes, but this simulator
/// only ever formats and mounts 1024-byte-block images.
pub const BLOCK_SIZE: usize = 1024;

/// Number of block-number entries that fit in one indirect block.
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / core::mem::size_of::<u32>();

/// Number of inodes that fit in one block of the inode table.
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / 128;

/// ext2 magic number, checked against the superblock on mount.
pub const EXT2_MAGIC: u16 = 0xEF53;

/// Block holding the superblock.
pub const SUPERBLOCK_BLOCK: u32 = 1;

/// Block holding the (only) group descriptor.
pub const GROUP_DESC_BLOCK: u32 = 2;
