//! Inode cache uniqueness (one live slot per `(device, inode)`, refcounted)
//! and dirty write-back on release, driven directly against `InodeCache`.

mod common;

use ext2sim_engine::device::MountedDevice;
use ext2sim_engine::inode_cache::InodeCache;
use ext2sim_engine::mount_table::MountTable;
use ext2sim_engine::types::ROOT_INODE;

#[test]
fn repeated_get_returns_the_same_slot_and_bumps_refcount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    let mut mount_table = MountTable::new(4);
    let mut cache = InodeCache::new(16);
    let device = MountedDevice::mount(&image).expect("mount");
    let device_id = mount_table.register(device, image.clone(), "/".to_owned(), None).expect("register");

    let first = cache.get(&mut mount_table, device_id, ROOT_INODE).expect("first get");
    assert_eq!(cache.get_entry(first).refcount(), 1);

    let second = cache.get(&mut mount_table, device_id, ROOT_INODE).expect("second get");
    assert_eq!(first, second, "the same (device, inode) pair must resolve to the same cache slot");
    assert_eq!(cache.get_entry(first).refcount(), 2);

    cache.put(&mut mount_table, second).expect("release second");
    assert_eq!(cache.get_entry(first).refcount(), 1);
    cache.put(&mut mount_table, first).expect("release first");
}

#[test]
fn dirty_inode_is_written_back_when_refcount_drops_to_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    {
        let mut mount_table = MountTable::new(4);
        let mut cache = InodeCache::new(16);
        let device = MountedDevice::mount(&image).expect("mount");
        let device_id = mount_table.register(device, image.clone(), "/".to_owned(), None).expect("register");

        let handle = cache.get(&mut mount_table, device_id, ROOT_INODE).expect("get root");
        cache.get_entry_mut(handle).inode_mut().mode = 0o40_755;
        cache.get_entry_mut(handle).mark_dirty();
        cache.put(&mut mount_table, handle).expect("release triggers write-back");
    }

    let mut device = MountedDevice::mount(&image).expect("remount");
    let root = device.read_inode(ROOT_INODE).expect("read root inode");
    assert_eq!(root.mode, 0o40_755, "the write-back must have reached disk");
}

#[test]
fn flush_clears_dirty_entries_without_releasing_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);

    let mut mount_table = MountTable::new(4);
    let mut cache = InodeCache::new(16);
    let device = MountedDevice::mount(&image).expect("mount");
    let device_id = mount_table.register(device, image.clone(), "/".to_owned(), None).expect("register");

    let handle = cache.get(&mut mount_table, device_id, ROOT_INODE).expect("get root");
    cache.get_entry_mut(handle).inode_mut().links_count = 5;
    cache.get_entry_mut(handle).mark_dirty();
    cache.flush(&mut mount_table).expect("flush");

    assert_eq!(cache.get_entry(handle).refcount(), 1, "flush must not release the handle");

    let on_disk = mount_table.device_mut(device_id).expect("device").read_inode(ROOT_INODE).expect("read back");
    assert_eq!(on_disk.links_count, 5);

    cache.put(&mut mount_table, handle).expect("release");
}
