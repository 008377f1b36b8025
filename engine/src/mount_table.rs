//! Component 7: Mount Table.
//!
//! Grounded on this simulator's own Design Note on cyclic references
//! (mount-point inode ↔ device root): device slots live in an
//! [`crate::arena::Arena`], and the links between a device and the
//! directory it is mounted on are handles rather than owning pointers.
//! Orchestration that needs to resolve a path before mounting
//! (`spec.md` §4.2/§4.7) lives one layer up, in [`crate::simulator`]; this
//! module only owns the table itself and its structural invariants
//! (no duplicate image, no duplicate mount path).

use std::path::{Path, PathBuf};

use log::info;

use crate::arena::{Arena, Handle};
use crate::device::MountedDevice;
use crate::error::EngineError;
use crate::inode_cache::CacheHandle;

/// A stable reference to a mounted device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(Handle);

/// One entry of the mount table.
pub struct MountEntry {
    device: MountedDevice,
    image_path: PathBuf,
    mount_path: String,
    /// Cache handle of this device's root inode (inode 2), held with a
    /// perpetual reference for as long as the device is mounted. `None`
    /// only during the brief window between registering the entry and
    /// acquiring its root inode (the root inode cannot be acquired before
    /// the device is findable in this table).
    root_handle: Option<CacheHandle>,
    /// The parent device and the cache handle of the directory this
    /// device is mounted on, or `None` for the filesystem root.
    parent: Option<(DeviceId, CacheHandle)>,
}

impl MountEntry {
    /// The backing device.
    #[must_use]
    pub const fn device(&self) -> &MountedDevice {
        &self.device
    }

    /// Mutably borrows the backing device.
    pub fn device_mut(&mut self) -> &mut MountedDevice {
        &mut self.device
    }

    /// The image path this device was mounted from.
    #[must_use]
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// The absolute path this device is mounted at ("/" for the root).
    #[must_use]
    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    /// The cache handle of this device's root inode.
    ///
    /// # Panics
    ///
    /// Panics if called before [`MountTable::set_root_handle`] has run for
    /// this entry; every entry reachable by a [`DeviceId`] outside
    /// [`crate::simulator`]'s mount orchestration has one set.
    #[must_use]
    pub fn root_handle(&self) -> CacheHandle {
        self.root_handle.expect("root handle set during mount")
    }

    /// The parent device and mount-point handle, if this is not the root.
    #[must_use]
    pub const fn parent(&self) -> Option<(DeviceId, CacheHandle)> {
        self.parent
    }
}

/// The bounded table of mounted devices.
pub struct MountTable {
    arena: Arena<MountEntry>,
}

impl MountTable {
    /// Creates a table with `capacity` slots (4 in the reference scaling,
    /// SPEC_FULL §3 `MOUNT_TABLE_SIZE`).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: Arena::new(capacity, "mount table"),
        }
    }

    /// Whether any device is currently mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.iter().next().is_none()
    }

    /// Whether `image_path` is already mounted anywhere.
    #[must_use]
    pub fn is_image_mounted(&self, image_path: &Path) -> bool {
        self.arena.iter().any(|(_, entry)| entry.image_path == image_path)
    }

    /// Whether `mount_path` already names a mount point.
    #[must_use]
    pub fn is_mount_path_used(&self, mount_path: &str) -> bool {
        self.arena.iter().any(|(_, entry)| entry.mount_path == mount_path)
    }

    /// Registers a newly opened device. The caller has already performed
    /// every `spec.md` §4.7 precondition check (duplicate image/path,
    /// mount-point directory validity). The entry's root handle is unset
    /// until [`MountTable::set_root_handle`] is called; the root inode can
    /// only be acquired through [`crate::inode_cache::InodeCache::get`]
    /// once the device is findable by its [`DeviceId`], which requires it
    /// to be registered first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TableFull`] if every slot is in use.
    pub fn register(
        &mut self,
        device: MountedDevice,
        image_path: PathBuf,
        mount_path: String,
        parent: Option<(DeviceId, CacheHandle)>,
    ) -> Result<DeviceId, EngineError> {
        info!("registering mount of {} at {mount_path}", image_path.display());
        let entry = MountEntry {
            device,
            image_path,
            mount_path,
            root_handle: None,
            parent,
        };
        let handle = self.arena.insert(entry)?;
        Ok(DeviceId(handle))
    }

    /// Records the cache handle of `id`'s device root inode, once acquired.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMounted`] if `id` no longer refers to a
    /// live entry.
    pub fn set_root_handle(&mut self, id: DeviceId, root_handle: CacheHandle) -> Result<(), EngineError> {
        self.entry_mut(id)?.root_handle = Some(root_handle);
        Ok(())
    }

    /// Removes a device entry, returning it so the caller can release its
    /// permanently-held cache references and close the file.
    #[must_use]
    pub fn unregister(&mut self, id: DeviceId) -> Option<MountEntry> {
        self.arena.get(id.0)?;
        Some(self.arena.remove(id.0))
    }

    /// Borrows the device at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMounted`] if `id` no longer refers to a
    /// live entry.
    pub fn entry(&self, id: DeviceId) -> Result<&MountEntry, EngineError> {
        self.arena.get(id.0).ok_or_else(|| EngineError::NotMounted("stale device handle".into()))
    }

    /// Mutably borrows the entry at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMounted`] if `id` no longer refers to a
    /// live entry.
    pub fn entry_mut(&mut self, id: DeviceId) -> Result<&mut MountEntry, EngineError> {
        self.arena.get_mut(id.0).ok_or_else(|| EngineError::NotMounted("stale device handle".into()))
    }

    /// Borrows the underlying device at `id` directly.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMounted`] if `id` no longer refers to a
    /// live entry.
    pub fn device_mut(&mut self, id: DeviceId) -> Result<&mut MountedDevice, EngineError> {
        Ok(self.entry_mut(id)?.device_mut())
    }

    /// Lists every mounted device, for the `mount` (no-args) command.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &MountEntry)> {
        self.arena.iter().map(|(handle, entry)| (DeviceId(handle), entry))
    }
}
