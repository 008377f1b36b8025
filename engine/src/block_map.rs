//! Component 4: Block Map.
//!
//! Grounded on the indirect-block walk `efs::fs::ext2::inode::Inode`
//! performs when resolving a file's logical blocks, adapted to this
//! simulator's flat 15-slot `block` array (see
//! [`crate::ondisk::inode`]) and to `spec.md` §4.4's fixed two-level
//! (direct / single-indirect / double-indirect) layout — the
//! triple-indirect slot is never populated.

use crate::device::AllocKind;
use crate::error::EngineError;
use crate::mount_table::{DeviceId, MountTable};
use crate::ondisk::inode::{Inode, DOUBLE_INDIRECT, SINGLE_INDIRECT};
use crate::types::{BlockNum, Time, PTRS_PER_BLOCK};

const DIRECT_COUNT: usize = SINGLE_INDIRECT;
const SINGLE_INDIRECT_COUNT: usize = PTRS_PER_BLOCK;
const DOUBLE_INDIRECT_COUNT: usize = PTRS_PER_BLOCK * PTRS_PER_BLOCK;

fn read_ptrs(mount_table: &mut MountTable, device: DeviceId, block_num: u32) -> Result<[u32; PTRS_PER_BLOCK], EngineError> {
    let block = mount_table.device_mut(device)?.read_block(block_num)?;
    let mut ptrs = [0_u32; PTRS_PER_BLOCK];
    for (i, ptr) in ptrs.iter_mut().enumerate() {
        let off = i * core::mem::size_of::<u32>();
        *ptr = u32::from_ne_bytes(block[off..off + 4].try_into().expect("4-byte slice"));
    }
    Ok(ptrs)
}

fn write_ptrs(mount_table: &mut MountTable, device: DeviceId, block_num: u32, ptrs: &[u32; PTRS_PER_BLOCK]) -> Result<(), EngineError> {
    let mut block = [0_u8; crate::types::BLOCK_SIZE];
    for (i, ptr) in ptrs.iter().enumerate() {
        let off = i * core::mem::size_of::<u32>();
        block[off..off + 4].copy_from_slice(&ptr.to_ne_bytes());
    }
    mount_table.device_mut(device)?.write_block(block_num, &block)
}

/// Translates logical file-block index `logical` to a physical block
/// number, or [`BlockNum::NONE`] if that slot has never been allocated.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] for indices beyond the
/// double-indirect range (triple-indirect is unsupported, `spec.md` §4.4).
pub fn logical_to_physical(mount_table: &mut MountTable, device: DeviceId, inode: &Inode, logical: usize) -> Result<BlockNum, EngineError> {
    if logical < DIRECT_COUNT {
        return Ok(inode.block_ptr(logical));
    }

    if logical < DIRECT_COUNT + SINGLE_INDIRECT_COUNT {
        let indirect = inode.block_ptr(SINGLE_INDIRECT);
        if indirect.is_none() {
            return Ok(BlockNum::NONE);
        }
        let ptrs = read_ptrs(mount_table, device, indirect.0)?;
        return Ok(BlockNum(ptrs[logical - DIRECT_COUNT]));
    }

    if logical < DIRECT_COUNT + SINGLE_INDIRECT_COUNT + DOUBLE_INDIRECT_COUNT {
        let double = inode.block_ptr(DOUBLE_INDIRECT);
        if double.is_none() {
            return Ok(BlockNum::NONE);
        }
        let rel = logical - DIRECT_COUNT - SINGLE_INDIRECT_COUNT;
        let outer = read_ptrs(mount_table, device, double.0)?;
        let inner_block = outer[rel / PTRS_PER_BLOCK];
        if inner_block == 0 {
            return Ok(BlockNum::NONE);
        }
        let inner = read_ptrs(mount_table, device, inner_block)?;
        return Ok(BlockNum(inner[rel % PTRS_PER_BLOCK]));
    }

    Err(EngineError::InvalidArgument(format!(
        "logical block {logical} exceeds the double-indirect range (triple-indirect is unsupported)"
    )))
}

/// Allocates a new physical block and wires it into the first available
/// slot of `inode`'s block map, allocating indirect structure blocks on
/// first use (`spec.md` §4.4).
///
/// # Errors
///
/// Propagates allocation failure; returns [`EngineError::InvalidArgument`]
/// if the file has exhausted the double-indirect range.
pub fn allocate_next_block(mount_table: &mut MountTable, device: DeviceId, inode: &mut Inode) -> Result<BlockNum, EngineError> {
    if let Some(slot) = (0..DIRECT_COUNT).find(|&i| inode.block_ptr(i).is_none()) {
        let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
        inode.set_block_ptr(slot, BlockNum(num));
        return Ok(BlockNum(num));
    }

    let indirect = inode.block_ptr(SINGLE_INDIRECT);
    let indirect_block = if indirect.is_none() {
        let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
        write_ptrs(mount_table, device, num, &[0; PTRS_PER_BLOCK])?;
        inode.set_block_ptr(SINGLE_INDIRECT, BlockNum(num));
        num
    } else {
        indirect.0
    };
    let mut ptrs = read_ptrs(mount_table, device, indirect_block)?;
    if let Some(slot) = ptrs.iter().position(|&p| p == 0) {
        let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
        ptrs[slot] = num;
        write_ptrs(mount_table, device, indirect_block, &ptrs)?;
        return Ok(BlockNum(num));
    }

    let double = inode.block_ptr(DOUBLE_INDIRECT);
    let double_block = if double.is_none() {
        let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
        write_ptrs(mount_table, device, num, &[0; PTRS_PER_BLOCK])?;
        inode.set_block_ptr(DOUBLE_INDIRECT, BlockNum(num));
        num
    } else {
        double.0
    };
    let mut outer = read_ptrs(mount_table, device, double_block)?;
    for outer_slot in outer.iter_mut() {
        let inner_block = if *outer_slot == 0 {
            let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
            write_ptrs(mount_table, device, num, &[0; PTRS_PER_BLOCK])?;
            *outer_slot = num;
            write_ptrs(mount_table, device, double_block, &outer)?;
            num
        } else {
            *outer_slot
        };
        let mut inner = read_ptrs(mount_table, device, inner_block)?;
        if let Some(slot) = inner.iter().position(|&p| p == 0) {
            let num = mount_table.device_mut(device)?.allocate(AllocKind::Block)?;
            inner[slot] = num;
            write_ptrs(mount_table, device, inner_block, &inner)?;
            return Ok(BlockNum(num));
        }
    }

    Err(EngineError::InvalidArgument(
        "file too large: the double-indirect block map is fully populated".into(),
    ))
}

/// Deallocates every data and structural block referenced by `inode`, then
/// zeroes its block array and refreshes its timestamps. Symbolic links
/// short-circuit: their target is inline in the block array, not a real
/// block reference.
pub fn truncate(mount_table: &mut MountTable, device: DeviceId, inode: &mut Inode, now: Time) -> Result<(), EngineError> {
    use crate::permissions::FileType;

    if FileType::from_mode(inode.mode) == FileType::Symlink {
        inode.size = 0;
        return Ok(());
    }

    for i in 0..DIRECT_COUNT {
        let ptr = inode.block_ptr(i);
        if ptr.is_none() {
            break;
        }
        mount_table.device_mut(device)?.deallocate(AllocKind::Block, ptr.0)?;
    }

    let indirect = inode.block_ptr(SINGLE_INDIRECT);
    if !indirect.is_none() {
        let ptrs = read_ptrs(mount_table, device, indirect.0)?;
        for &ptr in ptrs.iter() {
            if ptr != 0 {
                mount_table.device_mut(device)?.deallocate(AllocKind::Block, ptr)?;
            }
        }
        mount_table.device_mut(device)?.deallocate(AllocKind::Block, indirect.0)?;
    }

    let double = inode.block_ptr(DOUBLE_INDIRECT);
    if !double.is_none() {
        let outer = read_ptrs(mount_table, device, double.0)?;
        for &inner_block in outer.iter() {
            if inner_block == 0 {
                continue;
            }
            let inner = read_ptrs(mount_table, device, inner_block)?;
            for &ptr in inner.iter() {
                if ptr != 0 {
                    mount_table.device_mut(device)?.deallocate(AllocKind::Block, ptr)?;
                }
            }
            mount_table.device_mut(device)?.deallocate(AllocKind::Block, inner_block)?;
        }
        mount_table.device_mut(device)?.deallocate(AllocKind::Block, double.0)?;
    }

    inode.block = [0; 15];
    inode.size = 0;
    inode.atime = now.0;
    inode.mtime = now.0;
    inode.ctime = now.0;
    Ok(())
}
