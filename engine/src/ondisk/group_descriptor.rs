//! The (sole) block group descriptor, persisted at
//! [`GROUP_DESC_BLOCK`](crate::types::GROUP_DESC_BLOCK).
//!
//! Grounded on `efs::fs::ext2::block_group::BlockGroupDescriptor`: this
//! simulator only ever formats a single-group image (`spec.md` §2 Non-goals),
//! so there is exactly one descriptor, but its layout still matches the real
//! 32-byte on-disk record.

use crate::block_io::Block;

use super::{read_at, write_at};

/// The block group descriptor: bitmap/inode-table locations plus the
/// group's free-space counters.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct GroupDescriptor {
    /// Block number of the block bitmap.
    pub block_bitmap: u32,
    /// Block number of the inode bitmap.
    pub inode_bitmap: u32,
    /// Block number of the first block of the inode table.
    pub inode_table: u32,
    /// Free blocks remaining in this group.
    pub free_blocks_count: u16,
    /// Free inodes remaining in this group.
    pub free_inodes_count: u16,
    /// Number of inodes allocated to directories in this group.
    pub used_dirs_count: u16,
    /// Alignment padding (matches the real on-disk layout's reserved halfword).
    pub pad: u16,
    /// Reserved for future real-ext2 fields; always zeroed here.
    pub reserved: [u8; 12],
}

const _: () = assert!(core::mem::size_of::<GroupDescriptor>() == 32);

impl GroupDescriptor {
    /// Reads the group descriptor out of its block.
    #[must_use]
    pub fn from_block(block: &Block) -> Self {
        unsafe { read_at(block, 0) }
    }

    /// Serializes this descriptor into a fresh block-sized buffer.
    #[must_use]
    pub fn to_block(&self) -> Block {
        let mut block = [0_u8; crate::types::BLOCK_SIZE];
        unsafe { write_at(&mut block, 0, *self) };
        block
    }
}
