//! Bitmap/counter parity: after any sequence of allocations and
//! deallocations, the set bits in a bitmap match (total - free_count).

mod common;

use ext2sim_engine::device::{AllocKind, MountedDevice};

fn popcount(bitmap: &[u8; 1024], count: u32) -> u32 {
    (0..count as usize).filter(|&bit| bitmap[bit / 8] & (1 << (bit % 8)) != 0).count() as u32
}

#[test]
fn block_bitmap_parity_after_allocate_and_deallocate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    let mut device = MountedDevice::mount(&image).expect("mount");
    let before_free = device.free_blocks_count();

    let mut allocated = Vec::new();
    for _ in 0..5 {
        allocated.push(device.allocate(AllocKind::Block).expect("allocate block"));
    }
    assert_eq!(device.free_blocks_count(), before_free - 5);

    for num in allocated.drain(..2) {
        device.deallocate(AllocKind::Block, num).expect("deallocate block");
    }
    assert_eq!(device.free_blocks_count(), before_free - 3);

    let bitmap = device.read_block(common::BLOCK_BITMAP).expect("read block bitmap");
    let set_bits = popcount(&bitmap, device.blocks_count());
    assert_eq!(set_bits, device.blocks_count() - device.free_blocks_count());
}

#[test]
fn inode_bitmap_parity_after_allocate_and_deallocate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    let mut device = MountedDevice::mount(&image).expect("mount");
    let before_free = device.free_inodes_count();

    let a = device.allocate(AllocKind::Inode).expect("allocate inode");
    let b = device.allocate(AllocKind::Inode).expect("allocate inode");
    assert_eq!(device.free_inodes_count(), before_free - 2);

    device.deallocate(AllocKind::Inode, a).expect("deallocate inode");
    assert_eq!(device.free_inodes_count(), before_free - 1);

    let bitmap = device.read_block(common::INODE_BITMAP).expect("read inode bitmap");
    let set_bits = popcount(&bitmap, device.inodes_count());
    assert_eq!(set_bits, device.inodes_count() - device.free_inodes_count());

    device.deallocate(AllocKind::Inode, b).expect("deallocate inode");
}

#[test]
fn deallocate_out_of_range_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    let mut device = MountedDevice::mount(&image).expect("mount");
    let before_free = device.free_blocks_count();
    device.deallocate(AllocKind::Block, 0).expect("out-of-range deallocate is a no-op");
    device.deallocate(AllocKind::Block, device.blocks_count() + 1).expect("out-of-range deallocate is a no-op");
    assert_eq!(device.free_blocks_count(), before_free);
}
