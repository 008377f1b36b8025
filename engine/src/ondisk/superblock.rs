//! The ext2 superblock, persisted at [`SUPERBLOCK_BLOCK`](crate::types::SUPERBLOCK_BLOCK).

use crate::block_io::Block;
use crate::types::EXT2_MAGIC;

use super::{read_at, write_at};

/// Filesystem state flag: cleanly unmounted.
pub const STATE_CLEAN: u16 = 1;
/// Filesystem state flag: mounted / not cleanly unmounted.
pub const STATE_ERROR: u16 = 2;

/// Behaviour on error: continue. This simulator never errors out the whole
/// device, so it never inspects this field beyond round-tripping it.
pub const ERRORS_CONTINUE: u16 = 1;

/// Creator OS: Linux, for lack of a value meaning "this simulator".
pub const CREATOR_OS_LINUX: u32 = 0;

/// The on-disk superblock, 1024 bytes wide to occupy a whole block.
///
/// Field order and sizes follow the real ext2 superblock for the fields
/// this simulator actually uses; unused real-ext2 fields (reserved GDT
/// blocks, journal, UUID, volume name, and so on) are folded into `padding`
/// rather than modeled individually, since nothing here ever reads them.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    /// Total number of inodes on the device.
    pub inodes_count: u32,
    /// Total number of blocks on the device.
    pub blocks_count: u32,
    /// Number of blocks not currently allocated.
    pub free_blocks_count: u32,
    /// Number of inodes not currently allocated.
    pub free_inodes_count: u32,
    /// Block number of the first usable (non-reserved) block.
    pub first_data_block: u32,
    /// `block_size = 1024 << log_block_size`. Always `0` in this simulator.
    pub log_block_size: u32,
    /// Number of blocks in each block group.
    pub blocks_per_group: u32,
    /// Number of inodes in each block group.
    pub inodes_per_group: u32,
    /// Last mount time, POSIX seconds.
    pub mtime: u32,
    /// Last write time, POSIX seconds.
    pub wtime: u32,
    /// Number of mounts since the last full check.
    pub mnt_count: u16,
    /// Number of mounts allowed before a check is forced. Never enforced here.
    pub max_mnt_count: u16,
    /// Magic number, must equal [`EXT2_MAGIC`].
    pub magic: u16,
    /// Filesystem state ([`STATE_CLEAN`] / [`STATE_ERROR`]).
    pub state: u16,
    /// Behaviour on error ([`ERRORS_CONTINUE`]).
    pub errors: u16,
    /// Minor revision level.
    pub minor_rev_level: u16,
    /// Creator OS ([`CREATOR_OS_LINUX`]).
    pub creator_os: u32,
    /// Revision level. `0` (original format, dynamic inode sizes unused).
    pub rev_level: u32,
    /// First inode usable for standard files (non-reserved).
    pub first_ino: u32,
    /// Size in bytes of the on-disk inode structure (always 128 here).
    pub inode_size: u16,
    /// Padding out to a full block; unused real-ext2 fields live here.
    pub padding: [u8; 958],
}

const _: () = assert!(core::mem::size_of::<Superblock>() == 1024);

impl Superblock {
    /// Reads the superblock out of block 1 of the image.
    #[must_use]
    pub fn from_block(block: &Block) -> Self {
        unsafe { read_at(block, 0) }
    }

    /// Serializes this superblock into a fresh block-sized buffer.
    #[must_use]
    pub fn to_block(&self) -> Block {
        let mut block = [0_u8; crate::types::BLOCK_SIZE];
        unsafe { write_at(&mut block, 0, *self) };
        block
    }

    /// Whether the magic number identifies this as an ext2 image.
    #[must_use]
    pub const fn is_valid_magic(&self) -> bool {
        self.magic == EXT2_MAGIC
    }
}
