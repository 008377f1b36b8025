//! Directory tiling and the empty-directory predicate, exercised directly
//! against the directory/inode-cache/mount-table layer rather than through
//! `Simulator`, since these are properties of the on-disk block layout.

mod common;

use ext2sim_engine::device::MountedDevice;
use ext2sim_engine::directory;
use ext2sim_engine::inode_cache::{CacheHandle, InodeCache};
use ext2sim_engine::mount_table::{DeviceId, MountTable};
use ext2sim_engine::ondisk::dirent::{DirentHeader, EntryFileType};
use ext2sim_engine::types::{InodeNum, Time, BLOCK_SIZE, ROOT_INODE};

fn mount_fresh(image: &std::path::Path) -> (MountTable, InodeCache, DeviceId) {
    let mut mount_table = MountTable::new(4);
    let mut cache = InodeCache::new(16);
    let device = MountedDevice::mount(image).expect("mount");
    let device_id = mount_table.register(device, image.to_path_buf(), "/".to_owned(), None).expect("register");
    let root_handle = cache.get(&mut mount_table, device_id, ROOT_INODE).expect("load root");
    mount_table.set_root_handle(device_id, root_handle).expect("set root handle");
    (mount_table, cache, device_id)
}

fn root_handle(cache: &mut InodeCache, mount_table: &mut MountTable, device_id: DeviceId) -> CacheHandle {
    cache.get(mount_table, device_id, ROOT_INODE).expect("acquire root")
}

#[test]
fn empty_root_directory_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);
    let (mut mount_table, mut cache, device_id) = mount_fresh(&image);

    let handle = root_handle(&mut cache, &mut mount_table, device_id);
    let root_inode = *cache.get_entry(handle).inode();
    assert!(directory::is_empty(&mut mount_table, device_id, &root_inode).expect("is_empty"));
    cache.put(&mut mount_table, handle).expect("release");
}

#[test]
fn directory_tiling_holds_after_add_and_remove() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);
    let (mut mount_table, mut cache, device_id) = mount_fresh(&image);

    let handle = root_handle(&mut cache, &mut mount_table, device_id);

    for (i, name) in ["alpha", "beta", "gamma"].into_iter().enumerate() {
        let inode = cache.get_entry_mut(handle).inode_mut();
        directory::add_entry(&mut mount_table, device_id, inode, name, InodeNum(10 + i as u32), EntryFileType::Regular, Time(0)).expect("add entry");
        cache.get_entry_mut(handle).mark_dirty();
    }

    let root_inode = *cache.get_entry(handle).inode();
    assert!(!directory::is_empty(&mut mount_table, device_id, &root_inode).expect("is_empty"));

    let entries = directory::iter_entries(&mut mount_table, device_id, &root_inode).expect("iter entries");
    assert_eq!(entries.len(), 5, "., .., and the three added entries");

    assert_tiling_invariant(&mut mount_table, device_id, &root_inode);

    for name in ["alpha", "beta", "gamma"] {
        let inode = cache.get_entry_mut(handle).inode_mut();
        directory::remove_entry(&mut mount_table, device_id, inode, name, Time(0)).expect("remove entry");
        cache.get_entry_mut(handle).mark_dirty();
    }

    let root_inode = *cache.get_entry(handle).inode();
    assert!(directory::is_empty(&mut mount_table, device_id, &root_inode).expect("is_empty"));
    assert_tiling_invariant(&mut mount_table, device_id, &root_inode);

    cache.put(&mut mount_table, handle).expect("release");
}

fn assert_tiling_invariant(mount_table: &mut MountTable, device_id: DeviceId, dir_inode: &ext2sim_engine::ondisk::inode::Inode) {
    let block_num = dir_inode.block_ptr(0).0;
    let block = mount_table.device_mut(device_id).expect("device").read_block(block_num).expect("read directory block");

    let mut offset = 0_usize;
    let mut total = 0_usize;
    while offset < BLOCK_SIZE {
        let header = DirentHeader::from_block(&block, offset);
        let rec_len = header.rec_len as usize;
        assert!(rec_len > 0, "rec_len must never be zero mid-block");
        if header.is_used() {
            let ideal = ext2sim_engine::ondisk::dirent::min_rec_len(header.name_len as usize) as usize;
            assert!(rec_len >= ideal, "rec_len {rec_len} must be at least the ideal length {ideal}");
        }
        total += rec_len;
        offset += rec_len;
    }
    assert_eq!(total, BLOCK_SIZE, "rec_len values must tile the whole block");
    assert_eq!(offset, BLOCK_SIZE, "the last entry's end must equal the block end");
}
