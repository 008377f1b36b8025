//! Component 3: Inode Cache.
//!
//! Grounded on `efs::fs::ext2::inode`'s process-wide `Cache<(u32, u32),
//! Inode>` (the teacher keys by `(device_id, inode_num)` too), but built as
//! an explicit, explicitly-passed table (arena-backed, see
//! [`crate::arena`]) rather than a `once_cell`-backed `static`, per this
//! simulator's no-ambient-globals design.

use log::{error, trace};

use crate::arena::{Arena, Handle};
use crate::error::EngineError;
use crate::mount_table::{DeviceId, MountTable};
use crate::ondisk::inode::Inode;
use crate::types::InodeNum;

/// A stable reference to a slot of the inode cache.
pub type CacheHandle = Handle;

/// Reference-counted, write-back-on-release copy of an on-disk inode.
pub struct CachedInode {
    device: DeviceId,
    inode_num: InodeNum,
    inode: Inode,
    refcount: u32,
    dirty: bool,
    /// Set when this inode is a mount point: traversing into it should
    /// cross into the root of this device instead of reading its own data
    /// blocks (`spec.md` §4.6, crossing downward).
    mounted_device: Option<DeviceId>,
}

impl CachedInode {
    /// The device this inode lives on.
    #[must_use]
    pub const fn device(&self) -> DeviceId {
        self.device
    }

    /// This inode's number on its device.
    #[must_use]
    pub const fn inode_num(&self) -> InodeNum {
        self.inode_num
    }

    /// The cached on-disk inode body.
    #[must_use]
    pub const fn inode(&self) -> &Inode {
        &self.inode
    }

    /// Mutably borrows the on-disk inode body. Callers that change anything
    /// through this must call [`CachedInode::mark_dirty`].
    pub fn inode_mut(&mut self) -> &mut Inode {
        &mut self.inode
    }

    /// Marks this inode's in-memory copy as needing write-back.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Current reference count.
    #[must_use]
    pub const fn refcount(&self) -> u32 {
        self.refcount
    }

    /// The device this inode mounts, if it is a mount point.
    #[must_use]
    pub const fn mounted_device(&self) -> Option<DeviceId> {
        self.mounted_device
    }

    /// Records that this inode is the mount point for `device`.
    pub fn set_mounted_device(&mut self, device: Option<DeviceId>) {
        self.mounted_device = device;
    }
}

/// The bounded, process-wide table of cached inodes.
pub struct InodeCache {
    arena: Arena<CachedInode>,
}

impl InodeCache {
    /// Creates a cache with `capacity` slots (64 in the reference scaling,
    /// `spec.md` §3/SPEC_FULL §3 `INODE_TABLE_SIZE`).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: Arena::new(capacity, "inode cache"),
        }
    }

    /// Acquires a reference to `(device, inode_num)`, loading it from disk
    /// on first access.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fatal`] if every slot is occupied by a still
    /// referenced inode (`spec.md` §4.3 step 3).
    pub fn get(&mut self, mount_table: &mut MountTable, device: DeviceId, inode_num: InodeNum) -> Result<CacheHandle, EngineError> {
        if let Some(handle) = self
            .arena
            .find(|entry| entry.device == device && entry.inode_num == inode_num && entry.refcount > 0)
        {
            let entry = self.arena.get_mut(handle).expect("handle just found");
            entry.refcount += 1;
            trace!("cache hit for inode {inode_num:?} on device (refcount {})", entry.refcount);
            return Ok(handle);
        }

        let reusable = self.arena.find(|entry| entry.refcount == 0);
        let index = match reusable {
            Some(handle) => {
                let evicted = self.arena.remove(handle);
                if evicted.dirty {
                    self.write_back(mount_table, &evicted)?;
                }
                handle.index()
            }
            None => match self.arena.find_empty() {
                Some(index) => index,
                None => {
                    error!("inode cache exhausted: no free or reusable slot among its capacity");
                    return Err(EngineError::Fatal("inode cache exhausted".into()));
                }
            },
        };

        let inode = mount_table.device_mut(device)?.read_inode(inode_num)?;
        let entry = CachedInode {
            device,
            inode_num,
            inode,
            refcount: 1,
            dirty: false,
            mounted_device: None,
        };
        let handle = self.arena.insert_at(index, entry);
        trace!("loaded inode {inode_num:?} into cache slot {index}");
        Ok(handle)
    }

    /// Releases one reference to `handle`. On reaching refcount 0 while
    /// dirty, writes the inode back immediately.
    pub fn put(&mut self, mount_table: &mut MountTable, handle: CacheHandle) -> Result<(), EngineError> {
        let Some(entry) = self.arena.get_mut(handle) else {
            return Ok(());
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount == 0 && entry.dirty {
            let entry = self.arena.get(handle).expect("just checked");
            self.write_back(mount_table, entry)?;
            self.arena.get_mut(handle).expect("just checked").dirty = false;
        }
        Ok(())
    }

    /// Borrows the cached inode at `handle`.
    #[must_use]
    pub fn get_entry(&self, handle: CacheHandle) -> &CachedInode {
        self.arena.get(handle).expect("valid cache handle")
    }

    /// Mutably borrows the cached inode at `handle`.
    pub fn get_entry_mut(&mut self, handle: CacheHandle) -> &mut CachedInode {
        self.arena.get_mut(handle).expect("valid cache handle")
    }

    /// Force-writes every dirty live entry back to its device.
    pub fn flush(&mut self, mount_table: &mut MountTable) -> Result<(), EngineError> {
        let dirty: Vec<_> = self
            .arena
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(handle, _)| handle)
            .collect();
        for handle in dirty {
            let entry = self.arena.get(handle).expect("collected above");
            self.write_back(mount_table, entry)?;
            self.arena.get_mut(handle).expect("collected above").dirty = false;
        }
        Ok(())
    }

    /// Lists every live cached inode, for the `cache`/`minodes` command.
    pub fn iter(&self) -> impl Iterator<Item = &CachedInode> {
        self.arena.iter().map(|(_, entry)| entry)
    }

    fn write_back(&self, mount_table: &mut MountTable, entry: &CachedInode) -> Result<(), EngineError> {
        mount_table.device_mut(entry.device)?.write_inode(entry.inode_num, &entry.inode)
    }
}
