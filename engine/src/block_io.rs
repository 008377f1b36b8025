//! Component 1: Block I/O.
//!
//! Grounded on `efs::dev::Device`'s `std::fs::File` impl (seek-then-
//! `read_exact`/`write_all`), simplified to this simulator's one fixed
//! block size instead of `efs`'s generic `Device<T, FSE>` abstraction: every
//! read or write here moves exactly one 1024-byte block.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::EngineError;
use crate::types::BLOCK_SIZE;

/// One on-disk block, read or written as a unit.
pub type Block = [u8; BLOCK_SIZE];

/// Reads the block at `block_num` from `file`.
///
/// Block 0 is never touched by this simulator (it is the boot sector in a
/// real ext2 layout); callers are expected to have already rejected it.
pub fn read_block(file: &mut File, block_num: u32) -> Result<Block, EngineError> {
    let mut buf = [0_u8; BLOCK_SIZE];
    file.seek(SeekFrom::Start(u64::from(block_num) * BLOCK_SIZE as u64))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Writes `data` to the block at `block_num` in `file`.
pub fn write_block(file: &mut File, block_num: u32, data: &Block) -> Result<(), EngineError> {
    file.seek(SeekFrom::Start(u64::from(block_num) * BLOCK_SIZE as u64))?;
    file.write_all(data)?;
    Ok(())
}

/// Tests bit `bit` of a bitmap block.
///
/// Bits are numbered little-end-first: bit `k` lives in byte `k / 8`, mask
/// `1 << (k % 8)`.
#[must_use]
pub fn bit_test(bitmap: &Block, bit: usize) -> bool {
    bitmap[bit / 8] & (1 << (bit % 8)) != 0
}

/// Sets bit `bit` of a bitmap block.
pub fn bit_set(bitmap: &mut Block, bit: usize) {
    bitmap[bit / 8] |= 1 << (bit % 8);
}

/// Clears bit `bit` of a bitmap block.
pub fn bit_clear(bitmap: &mut Block, bit: usize) {
    bitmap[bit / 8] &= !(1 << (bit % 8));
}

/// Scans `bitmap` for the first clear bit among its first `count` bits.
///
/// Returns `None` if all `count` bits are set (the allocator is exhausted).
#[must_use]
pub fn find_first_clear(bitmap: &Block, count: usize) -> Option<usize> {
    (0..count).find(|&bit| !bit_test(bitmap, bit))
}
