//! Component 5: Directory.
//!
//! Grounded on `efs::fs::ext2::directory`'s `Header`/`Entry` cursor-style
//! walk over a raw directory block, adapted to this simulator's
//! direct-blocks-only directories (`spec.md` §4.5): a directory's data
//! lives entirely in `inode.block[0..12]`, so there is no indirect-block
//! case to handle here the way a general ext2 reader would need.

use crate::block_map;
use crate::device::AllocKind;
use crate::error::EngineError;
use crate::mount_table::{DeviceId, MountTable};
use crate::ondisk::dirent::{align_up, min_rec_len, DirentHeader, EntryFileType, HEADER_LEN};
use crate::ondisk::inode::Inode;
use crate::types::{BlockNum, InodeNum, Time, BLOCK_SIZE};

/// Maximum number of direct blocks a directory may occupy (`spec.md` §13
/// Open Question (b): indirect directory blocks are out of scope).
pub const MAX_DIRECTORY_BLOCKS: usize = 12;

/// Maximum byte length of an entry's file name.
pub const MAX_NAME_LEN: usize = 255;

/// One decoded directory entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The inode this entry names.
    pub inode: InodeNum,
    /// The entry's file name.
    pub name: String,
    /// The entry's file type tag.
    pub file_type: EntryFileType,
    /// Index of the data block (0-based, within the directory's direct
    /// slots) this entry lives in.
    pub block_index: usize,
    /// Byte offset of this entry's header within its block.
    pub offset: usize,
    /// This entry's on-disk record length.
    pub rec_len: u16,
}

fn read_block(mount_table: &mut MountTable, device: DeviceId, block_num: u32) -> Result<crate::block_io::Block, EngineError> {
    mount_table.device_mut(device)?.read_block(block_num)
}

fn write_block(mount_table: &mut MountTable, device: DeviceId, block_num: u32, data: &crate::block_io::Block) -> Result<(), EngineError> {
    mount_table.device_mut(device)?.write_block(block_num, data)
}

/// Builds the initial contents of a fresh directory data block: "." and
/// ".." entries, the latter's `rec_len` absorbing the rest of the block.
#[must_use]
pub fn init_block(self_inode: InodeNum, parent_inode: InodeNum) -> crate::block_io::Block {
    let mut block = [0_u8; BLOCK_SIZE];
    let dot = DirentHeader::new(self_inode, 1, 12, EntryFileType::Directory);
    dot.write_into(&mut block, 0);
    block[HEADER_LEN] = b'.';

    let dotdot_rec_len = (BLOCK_SIZE - 12) as u16;
    let dotdot = DirentHeader::new(parent_inode, 2, dotdot_rec_len, EntryFileType::Directory);
    dotdot.write_into(&mut block, 12);
    block[12 + HEADER_LEN] = b'.';
    block[12 + HEADER_LEN + 1] = b'.';

    block
}

/// Iterates every live entry of `dir_inode`'s data blocks, in order.
pub fn iter_entries(mount_table: &mut MountTable, device: DeviceId, dir_inode: &Inode) -> Result<Vec<Entry>, EngineError> {
    let mut entries = Vec::new();
    for block_index in 0..MAX_DIRECTORY_BLOCKS {
        let ptr = dir_inode.block_ptr(block_index);
        if ptr.is_none() {
            break;
        }
        let block = read_block(mount_table, device, ptr.0)?;
        let mut offset = 0_usize;
        while offset < BLOCK_SIZE {
            let header = DirentHeader::from_block(&block, offset);
            let rec_len = header.rec_len;
            if header.is_used() {
                let name_start = offset + HEADER_LEN;
                let name_end = name_start + header.name_len as usize;
                let name = String::from_utf8_lossy(&block[name_start..name_end]).into_owned();
                entries.push(Entry {
                    inode: InodeNum(header.inode),
                    name,
                    file_type: EntryFileType::from_u8(header.file_type),
                    block_index,
                    offset,
                    rec_len,
                });
            }
            offset += rec_len as usize;
            if rec_len == 0 {
                break;
            }
        }
    }
    Ok(entries)
}

/// Looks up `name` among `dir_inode`'s entries.
pub fn find(mount_table: &mut MountTable, device: DeviceId, dir_inode: &Inode, name: &str) -> Result<Option<Entry>, EngineError> {
    Ok(iter_entries(mount_table, device, dir_inode)?.into_iter().find(|e| e.name == name))
}

/// Whether `dir_inode` is an empty directory: only "." and ".." present.
///
/// Implemented exactly as `spec.md` §4.5 specifies: type directory,
/// `links_count <= 2`, and the ".." entry's `rec_len` equals `1024 - 12`.
pub fn is_empty(mount_table: &mut MountTable, device: DeviceId, dir_inode: &Inode) -> Result<bool, EngineError> {
    use crate::permissions::FileType;
    if FileType::from_mode(dir_inode.mode) != FileType::Directory || dir_inode.links_count > 2 {
        return Ok(false);
    }
    let ptr = dir_inode.block_ptr(0);
    if ptr.is_none() {
        return Ok(true);
    }
    let block = read_block(mount_table, device, ptr.0)?;
    let dotdot = DirentHeader::from_block(&block, 12);
    Ok(dotdot.rec_len as usize == BLOCK_SIZE - 12)
}

/// Inserts a new entry `(name -> inode, file_type)` into `dir_inode`,
/// appending into an existing block's slack or allocating a fresh block
/// (`spec.md` §4.5 Append / Add to a new block).
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] if `name` exceeds
/// [`MAX_NAME_LEN`], or [`EngineError::TableFull`] if the directory has
/// already used [`MAX_DIRECTORY_BLOCKS`] blocks.
pub fn add_entry(
    mount_table: &mut MountTable,
    device: DeviceId,
    dir_inode: &mut Inode,
    name: &str,
    inode_num: InodeNum,
    file_type: EntryFileType,
    now: Time,
) -> Result<(), EngineError> {
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::InvalidArgument(format!("name {name:?} exceeds {MAX_NAME_LEN} bytes")));
    }
    let ideal = min_rec_len(name.len());

    let used_blocks = (0..MAX_DIRECTORY_BLOCKS)
        .take_while(|&i| !dir_inode.block_ptr(i).is_none())
        .count();

    for block_index in 0..used_blocks {
        let ptr = dir_inode.block_ptr(block_index);
        let mut block = read_block(mount_table, device, ptr.0)?;
        if let Some((offset, last_rec_len)) = find_last_entry(&block) {
            let last_ideal = align_up(HEADER_LEN + used_name_len(&block, offset)) as u16;
            if ideal <= last_rec_len - last_ideal {
                let mut header = DirentHeader::from_block(&block, offset);
                header.rec_len = last_ideal;
                header.write_into(&mut block, offset);

                let new_offset = offset + last_ideal as usize;
                let remaining = last_rec_len - last_ideal;
                let new_header = DirentHeader::new(inode_num, name.len() as u8, remaining, file_type);
                new_header.write_into(&mut block, new_offset);
                block[new_offset + HEADER_LEN..new_offset + HEADER_LEN + name.len()].copy_from_slice(name.as_bytes());

                write_block(mount_table, device, ptr.0, &block)?;
                dir_inode.ctime = now.0;
                return Ok(());
            }
        }
    }

    if used_blocks >= MAX_DIRECTORY_BLOCKS {
        return Err(EngineError::TableFull("directory (12 direct blocks exhausted)"));
    }

    let new_block_num = block_map::allocate_next_block(mount_table, device, dir_inode)?;
    let mut block = [0_u8; BLOCK_SIZE];
    let header = DirentHeader::new(inode_num, name.len() as u8, BLOCK_SIZE as u16, file_type);
    header.write_into(&mut block, 0);
    block[HEADER_LEN..HEADER_LEN + name.len()].copy_from_slice(name.as_bytes());
    write_block(mount_table, device, new_block_num.0, &block)?;

    dir_inode.size += BLOCK_SIZE as u32;
    dir_inode.ctime = now.0;
    Ok(())
}

/// Removes the entry named `name` from `dir_inode` (`spec.md` §4.5 Remove).
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] if no such entry exists.
pub fn remove_entry(mount_table: &mut MountTable, device: DeviceId, dir_inode: &mut Inode, name: &str, now: Time) -> Result<(), EngineError> {
    let Some(target) = find(mount_table, device, dir_inode, name)? else {
        return Err(EngineError::NotFound(name.to_owned()));
    };

    let ptr = dir_inode.block_ptr(target.block_index);
    let mut block = read_block(mount_table, device, ptr.0)?;

    let is_sole = target.offset == 0 && target.rec_len as usize == BLOCK_SIZE;
    if is_sole {
        mount_table.device_mut(device)?.deallocate(AllocKind::Block, ptr.0)?;
        compact_blocks(dir_inode, target.block_index);
        dir_inode.size -= BLOCK_SIZE as u32;
        dir_inode.ctime = now.0;
        return Ok(());
    }

    let is_last = target.offset + target.rec_len as usize == BLOCK_SIZE;
    if is_last {
        let prev_offset = find_previous_entry(&block, target.offset).expect("a non-sole last entry has a predecessor");
        let mut prev = DirentHeader::from_block(&block, prev_offset);
        prev.rec_len += target.rec_len;
        prev.write_into(&mut block, prev_offset);
        write_block(mount_table, device, ptr.0, &block)?;
        dir_inode.ctime = now.0;
        return Ok(());
    }

    let removed_len = target.rec_len as usize;
    let tail_start = target.offset + removed_len;
    let tail_len = BLOCK_SIZE - tail_start;
    block.copy_within(tail_start..tail_start + tail_len, target.offset);
    let new_last_offset = if let Some((last_offset, _)) = find_last_entry_up_to(&block, BLOCK_SIZE - removed_len) {
        last_offset
    } else {
        target.offset
    };
    let mut last_header = DirentHeader::from_block(&block, new_last_offset);
    last_header.rec_len += removed_len as u16;
    last_header.write_into(&mut block, new_last_offset);
    write_block(mount_table, device, ptr.0, &block)?;
    dir_inode.ctime = now.0;
    Ok(())
}

fn used_name_len(block: &crate::block_io::Block, offset: usize) -> usize {
    DirentHeader::from_block(block, offset).name_len as usize
}

fn find_last_entry(block: &crate::block_io::Block) -> Option<(usize, u16)> {
    find_last_entry_up_to(block, BLOCK_SIZE)
}

fn find_last_entry_up_to(block: &crate::block_io::Block, end: usize) -> Option<(usize, u16)> {
    let mut offset = 0_usize;
    let mut last = None;
    while offset < end {
        let header = DirentHeader::from_block(block, offset);
        last = Some((offset, header.rec_len));
        if header.rec_len == 0 {
            break;
        }
        offset += header.rec_len as usize;
    }
    last
}

fn find_previous_entry(block: &crate::block_io::Block, target_offset: usize) -> Option<usize> {
    let mut offset = 0_usize;
    let mut prev = None;
    while offset < target_offset {
        prev = Some(offset);
        let header = DirentHeader::from_block(block, offset);
        offset += header.rec_len as usize;
    }
    prev
}

/// Removes block slot `removed_index` from the direct block array, sliding
/// later block numbers forward so there are no gaps (`spec.md` §4.5 Remove,
/// sole-entry case).
fn compact_blocks(dir_inode: &mut Inode, removed_index: usize) {
    for i in removed_index..MAX_DIRECTORY_BLOCKS - 1 {
        let next = dir_inode.block_ptr(i + 1);
        dir_inode.set_block_ptr(i, next);
    }
    dir_inode.set_block_ptr(MAX_DIRECTORY_BLOCKS - 1, BlockNum::NONE);
}
