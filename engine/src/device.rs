//! Component 2: Mounted Device.
//!
//! Grounded on `efs::dev::Device` (file-backed reads/writes) and
//! `efs::fs::ext2::block_group::BlockGroupDescriptor` (the counters this
//! module keeps in lock-step on every allocation), simplified from the
//! teacher's generic `Device<T, FSE>` trait to a single concrete
//! `std::fs::File`-backed type, since this simulator only ever mounts real
//! files (`spec.md` §6).

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::{info, trace, warn};

use crate::block_io::{self, bit_clear, bit_set, find_first_clear};
use crate::error::EngineError;
use crate::ondisk::group_descriptor::GroupDescriptor;
use crate::ondisk::inode::{self, Inode};
use crate::ondisk::superblock::Superblock;
use crate::types::{GROUP_DESC_BLOCK, INODES_PER_BLOCK, InodeNum, SUPERBLOCK_BLOCK};

/// Which bounded resource an `allocate`/`deallocate` call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocKind {
    /// An inode number (bit `k` of the inode bitmap names inode `k + 1`).
    Inode,
    /// A physical block number.
    Block,
}

/// A mounted ext2 image: the backing file plus its in-memory superblock and
/// group descriptor mirrors.
#[derive(Debug)]
pub struct MountedDevice {
    file: File,
    superblock: Superblock,
    group_desc: GroupDescriptor,
}

impl MountedDevice {
    /// Opens `image_path` read-write and validates it as an ext2 image.
    ///
    /// Failure to open or to find the magic number is always reported; it
    /// is the caller's job (`spec.md` §4.7) to decide whether that failure
    /// is fatal (first mount) or an ordinary user error (subsequent mounts).
    pub fn mount(image_path: &Path) -> Result<Self, EngineError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path)
            .map_err(EngineError::Io)?;

        let sb_block = block_io::read_block(&mut file, SUPERBLOCK_BLOCK)?;
        let superblock = Superblock::from_block(&sb_block);
        if !superblock.is_valid_magic() {
            return Err(EngineError::NotFound(format!(
                "{}: not an ext2 image (bad magic)",
                image_path.display()
            )));
        }

        let gd_block = block_io::read_block(&mut file, GROUP_DESC_BLOCK)?;
        let group_desc = GroupDescriptor::from_block(&gd_block);

        info!("mounted {}", image_path.display());
        Ok(Self {
            file,
            superblock,
            group_desc,
        })
    }

    /// The block number of the first block of the inode table.
    #[must_use]
    pub const fn inode_table_start(&self) -> u32 {
        self.group_desc.inode_table
    }

    /// Free blocks remaining on this device.
    #[must_use]
    pub const fn free_blocks_count(&self) -> u32 {
        self.group_desc.free_blocks_count as u32
    }

    /// Free inodes remaining on this device.
    #[must_use]
    pub const fn free_inodes_count(&self) -> u32 {
        self.group_desc.free_inodes_count as u32
    }

    /// Total blocks on this device.
    #[must_use]
    pub const fn blocks_count(&self) -> u32 {
        self.superblock.blocks_count
    }

    /// Total inodes on this device.
    #[must_use]
    pub const fn inodes_count(&self) -> u32 {
        self.superblock.inodes_count
    }

    /// Reads the inode numbered `inum` from the inode table.
    pub fn read_inode(&mut self, inum: InodeNum) -> Result<Inode, EngineError> {
        let (block_offset, slot) = inode::locate(inum);
        let block_num = self.inode_table_start() + block_offset as u32;
        let block = block_io::read_block(&mut self.file, block_num)?;
        Ok(Inode::from_block(&block, slot))
    }

    /// Writes `inode` back to its slot in the inode table.
    pub fn write_inode(&mut self, inum: InodeNum, inode: &Inode) -> Result<(), EngineError> {
        let (block_offset, slot) = inode::locate(inum);
        let block_num = self.inode_table_start() + block_offset as u32;
        let mut block = block_io::read_block(&mut self.file, block_num)?;
        inode.write_into(&mut block, slot);
        block_io::write_block(&mut self.file, block_num, &block)
    }

    /// Reads a data block of this device.
    pub fn read_block(&mut self, block_num: u32) -> Result<block_io::Block, EngineError> {
        block_io::read_block(&mut self.file, block_num)
    }

    /// Writes a data block of this device.
    pub fn write_block(&mut self, block_num: u32, data: &block_io::Block) -> Result<(), EngineError> {
        block_io::write_block(&mut self.file, block_num, data)
    }

    /// Allocates the first free inode or block number, returning it 1-based.
    ///
    /// Fatal (`spec.md` §4.2) if the relevant bitmap is fully set: either the
    /// image is exhausted or its free counters are corrupt.
    pub fn allocate(&mut self, kind: AllocKind) -> Result<u32, EngineError> {
        let (bitmap_block, count) = self.bitmap_location(kind);
        let mut bitmap = block_io::read_block(&mut self.file, bitmap_block)?;
        let Some(bit) = find_first_clear(&bitmap, count as usize) else {
            return Err(EngineError::Fatal(format!(
                "{kind:?} bitmap exhausted: no free slot among {count} entries"
            )));
        };
        bit_set(&mut bitmap, bit);
        block_io::write_block(&mut self.file, bitmap_block, &bitmap)?;
        self.adjust_free_count(kind, -1);
        self.persist_metadata()?;
        let num = bit as u32 + 1;
        trace!("allocated {kind:?} {num}");
        Ok(num)
    }

    /// Frees inode or block number `num` (1-based). Out-of-range numbers are
    /// ignored with a diagnostic, per `spec.md` §4.2.
    pub fn deallocate(&mut self, kind: AllocKind, num: u32) -> Result<(), EngineError> {
        let (bitmap_block, count) = self.bitmap_location(kind);
        if num == 0 || num > count {
            warn!("deallocate {kind:?} {num}: out of range, ignored");
            return Ok(());
        }
        let bit = (num - 1) as usize;
        let mut bitmap = block_io::read_block(&mut self.file, bitmap_block)?;
        bit_clear(&mut bitmap, bit);
        block_io::write_block(&mut self.file, bitmap_block, &bitmap)?;
        self.adjust_free_count(kind, 1);
        self.persist_metadata()?;
        trace!("deallocated {kind:?} {num}");
        Ok(())
    }

    fn bitmap_location(&self, kind: AllocKind) -> (u32, u32) {
        match kind {
            AllocKind::Inode => (self.group_desc.inode_bitmap, self.superblock.inodes_count),
            AllocKind::Block => (self.group_desc.block_bitmap, self.superblock.blocks_count),
        }
    }

    fn adjust_free_count(&mut self, kind: AllocKind, delta: i32) {
        match kind {
            AllocKind::Inode => {
                self.superblock.free_inodes_count = (self.superblock.free_inodes_count as i32 + delta) as u32;
                self.group_desc.free_inodes_count = (self.group_desc.free_inodes_count as i32 + delta) as u16;
            }
            AllocKind::Block => {
                self.superblock.free_blocks_count = (self.superblock.free_blocks_count as i32 + delta) as u32;
                self.group_desc.free_blocks_count = (self.group_desc.free_blocks_count as i32 + delta) as u16;
            }
        }
    }

    /// Writes the in-memory superblock and group descriptor back to their
    /// fixed blocks. Called after every allocation/deallocation so the
    /// image stays consistent across a restart (`spec.md` §5).
    fn persist_metadata(&mut self) -> Result<(), EngineError> {
        let sb_block = self.superblock.to_block();
        block_io::write_block(&mut self.file, SUPERBLOCK_BLOCK, &sb_block)?;
        let gd_block = self.group_desc.to_block();
        block_io::write_block(&mut self.file, GROUP_DESC_BLOCK, &gd_block)
    }
}

const _: () = assert!(INODES_PER_BLOCK > 0);
