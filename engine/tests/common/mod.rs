//! Builds a fresh, minimal ext2 image in-process: superblock, group
//! descriptor, bitmaps, a zeroed inode table, and a root directory holding
//! only "." and "..". Building rather than shipping a binary fixture keeps
//! this simulator's own allocator/format code under test.

use std::fs::OpenOptions;
use std::path::Path;

use ext2sim_engine::block_io;
use ext2sim_engine::directory;
use ext2sim_engine::ondisk::group_descriptor::GroupDescriptor;
use ext2sim_engine::ondisk::inode::{self, Inode};
use ext2sim_engine::ondisk::superblock::Superblock;
use ext2sim_engine::permissions::DIR_FILE_MODE;
use ext2sim_engine::types::{
    BLOCK_SIZE, EXT2_MAGIC, GROUP_DESC_BLOCK, INODES_PER_BLOCK, ROOT_INODE, SUPERBLOCK_BLOCK,
};

pub const INODES_COUNT: u32 = 64;
pub const BLOCKS_COUNT: u32 = 256;

pub const BLOCK_BITMAP: u32 = 3;
pub const INODE_BITMAP: u32 = 4;
pub const INODE_TABLE_START: u32 = 5;

fn inode_table_blocks() -> u32 {
    let per_block = INODES_PER_BLOCK as u32;
    (INODES_COUNT + per_block - 1) / per_block
}

/// Block number of the root directory's sole data block, in a freshly
/// formatted image built by [`format_image`].
pub fn root_data_block() -> u32 {
    INODE_TABLE_START + inode_table_blocks()
}

/// Formats a fresh image at `path` sized per [`BLOCKS_COUNT`]/[`INODES_COUNT`].
pub fn format_image(path: &Path) {
    let root_block = root_data_block();
    let used_blocks = root_block + 1;

    let mut file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path).expect("create scratch image");
    file.set_len(u64::from(BLOCKS_COUNT) * BLOCK_SIZE as u64).expect("size scratch image");

    let superblock = Superblock {
        inodes_count: INODES_COUNT,
        blocks_count: BLOCKS_COUNT,
        free_blocks_count: BLOCKS_COUNT - used_blocks,
        free_inodes_count: INODES_COUNT - 2,
        first_data_block: 1,
        log_block_size: 0,
        blocks_per_group: BLOCKS_COUNT,
        inodes_per_group: INODES_COUNT,
        mtime: 0,
        wtime: 0,
        mnt_count: 0,
        max_mnt_count: 0xFFFF,
        magic: EXT2_MAGIC,
        state: 1,
        errors: 1,
        minor_rev_level: 0,
        creator_os: 0,
        rev_level: 0,
        first_ino: 11,
        inode_size: 128,
        padding: [0; 958],
    };
    block_io::write_block(&mut file, SUPERBLOCK_BLOCK, &superblock.to_block()).expect("write superblock");

    let group_desc = GroupDescriptor {
        block_bitmap: BLOCK_BITMAP,
        inode_bitmap: INODE_BITMAP,
        inode_table: INODE_TABLE_START,
        free_blocks_count: (BLOCKS_COUNT - used_blocks) as u16,
        free_inodes_count: (INODES_COUNT - 2) as u16,
        used_dirs_count: 1,
        pad: 0,
        reserved: [0; 12],
    };
    block_io::write_block(&mut file, GROUP_DESC_BLOCK, &group_desc.to_block()).expect("write group descriptor");

    let mut block_bitmap = [0_u8; BLOCK_SIZE];
    for bit in 0..used_blocks as usize {
        block_io::bit_set(&mut block_bitmap, bit);
    }
    block_io::write_block(&mut file, BLOCK_BITMAP, &block_bitmap).expect("write block bitmap");

    let mut inode_bitmap = [0_u8; BLOCK_SIZE];
    block_io::bit_set(&mut inode_bitmap, 0);
    block_io::bit_set(&mut inode_bitmap, 1);
    block_io::write_block(&mut file, INODE_BITMAP, &inode_bitmap).expect("write inode bitmap");

    for i in 0..inode_table_blocks() {
        block_io::write_block(&mut file, INODE_TABLE_START + i, &[0_u8; BLOCK_SIZE]).expect("zero inode table block");
    }

    let mut root = Inode::zeroed();
    root.mode = DIR_FILE_MODE;
    root.links_count = 2;
    root.size = BLOCK_SIZE as u32;
    root.block[0] = root_block;

    let (block_offset, slot) = inode::locate(ROOT_INODE);
    let table_block_num = INODE_TABLE_START + block_offset as u32;
    let mut table_block = block_io::read_block(&mut file, table_block_num).expect("read inode table block");
    root.write_into(&mut table_block, slot);
    block_io::write_block(&mut file, table_block_num, &table_block).expect("write root inode");

    let root_dir_block = directory::init_block(ROOT_INODE, ROOT_INODE);
    block_io::write_block(&mut file, root_block, &root_dir_block).expect("write root directory block");
}
