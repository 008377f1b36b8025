//! Component 8: Open-File Table and Descriptors.
//!
//! Grounded on `spec.md` §4.8/§3's POSIX-like open-file description model,
//! built as an [`crate::arena::Arena`] like the inode cache and mount
//! table, since a description is itself a small reference-counted,
//! reusable-slot resource.

use log::trace;

use crate::arena::{Arena, Handle};
use crate::block_map;
use crate::error::EngineError;
use crate::inode_cache::{CacheHandle, InodeCache};
use crate::mount_table::{DeviceId, MountTable};
use crate::types::{Time, BLOCK_SIZE};

/// A stable reference to an open-file description.
pub type DescriptionHandle = Handle;

/// How a file was opened, controlling which operations its descriptors permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only.
    Read,
    /// Write-only; truncates the file on open.
    Write,
    /// Read and write.
    ReadWrite,
    /// Write-only, offset initialised to the current end of file.
    Append,
}

impl OpenMode {
    /// Parses the command-set's `0..3` encoding (`spec.md` §6).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] for any value outside `0..=3`.
    pub fn from_u8(value: u8) -> Result<Self, EngineError> {
        match value {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            2 => Ok(Self::ReadWrite),
            3 => Ok(Self::Append),
            other => Err(EngineError::InvalidArgument(format!("open mode {other}: must be 0..=3"))),
        }
    }

    /// Whether descriptors with this mode may call `read`.
    #[must_use]
    pub const fn allows_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether descriptors with this mode may call `write`.
    #[must_use]
    pub const fn allows_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite | Self::Append)
    }
}

/// A shared open-file description: offset, mode, and the cached inode it targets.
pub struct OpenFileDescription {
    cache_handle: CacheHandle,
    device: DeviceId,
    mode: OpenMode,
    offset: u32,
    refcount: u32,
}

impl OpenFileDescription {
    /// The cache handle of the underlying inode.
    #[must_use]
    pub const fn cache_handle(&self) -> CacheHandle {
        self.cache_handle
    }

    /// The device the underlying inode lives on.
    #[must_use]
    pub const fn device(&self) -> DeviceId {
        self.device
    }

    /// This description's open mode.
    #[must_use]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The current byte offset.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

/// The bounded, process-wide table of open-file descriptions.
pub struct OpenFileTable {
    arena: Arena<OpenFileDescription>,
}

impl OpenFileTable {
    /// Creates a table with `capacity` slots (32 in the reference scaling,
    /// SPEC_FULL §3 `OPEN_FILES_TABLE_SIZE`).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: Arena::new(capacity, "open-file table"),
        }
    }

    /// Obtains (reusing or creating) the open-file description for
    /// `cache_handle` under `mode`, applying the read-compatibility rule
    /// from `spec.md` §3: a file already open non-READ cannot be reopened;
    /// one open only in READ may only be reopened in READ.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyOpen`] on an incompatible reopen, or
    /// [`EngineError::TableFull`] if no slot is free for a new description.
    pub fn open_description(
        &mut self,
        cache: &mut InodeCache,
        mount_table: &mut MountTable,
        device: DeviceId,
        cache_handle: CacheHandle,
        mode: OpenMode,
        now: Time,
    ) -> Result<DescriptionHandle, EngineError> {
        if let Some(handle) = self.arena.find(|d| d.cache_handle == cache_handle) {
            let existing_mode = self.arena.get(handle).expect("just found").mode;
            if existing_mode == OpenMode::Read && mode == OpenMode::Read {
                let d = self.arena.get_mut(handle).expect("just found");
                d.refcount += 1;
                return Ok(handle);
            }
            return Err(EngineError::AlreadyOpen("file already open in an incompatible mode".into()));
        }

        let size = cache.get_entry(cache_handle).inode().size;
        let offset = if mode == OpenMode::Append { size } else { 0 };

        let description = OpenFileDescription {
            cache_handle,
            device,
            mode,
            offset,
            refcount: 1,
        };
        let handle = self.arena.insert(description)?;

        if mode == OpenMode::Write {
            let inode = cache.get_entry_mut(cache_handle).inode_mut();
            block_map::truncate(mount_table, device, inode, now)?;
            cache.get_entry_mut(cache_handle).mark_dirty();
        }

        trace!("opened description for cache slot, mode {mode:?}");
        Ok(handle)
    }

    /// Releases one reference to `handle`. On reaching zero, releases the
    /// underlying cached inode and frees the slot.
    pub fn close(&mut self, cache: &mut InodeCache, mount_table: &mut MountTable, handle: DescriptionHandle) -> Result<(), EngineError> {
        let Some(description) = self.arena.get_mut(handle) else {
            return Ok(());
        };
        description.refcount = description.refcount.saturating_sub(1);
        if description.refcount == 0 {
            let cache_handle = description.cache_handle;
            self.arena.remove(handle);
            cache.put(mount_table, cache_handle)?;
        }
        Ok(())
    }

    /// Bumps the reference count of `handle` (used by `dup`/`dup2`).
    pub fn bump(&mut self, handle: DescriptionHandle) {
        if let Some(d) = self.arena.get_mut(handle) {
            d.refcount += 1;
        }
    }

    /// Sets the current offset of `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `offset` exceeds `size`.
    pub fn seek(&mut self, cache: &InodeCache, handle: DescriptionHandle, offset: u32) -> Result<u32, EngineError> {
        let description = self.arena.get_mut(handle).expect("valid description handle");
        let size = cache.get_entry(description.cache_handle).inode().size;
        if offset > size {
            return Err(EngineError::InvalidArgument(format!("offset {offset} exceeds size {size}")));
        }
        let previous = description.offset;
        description.offset = offset;
        Ok(previous)
    }

    /// Borrows the description at `handle`.
    #[must_use]
    pub fn get(&self, handle: DescriptionHandle) -> &OpenFileDescription {
        self.arena.get(handle).expect("valid description handle")
    }

    fn advance(&mut self, handle: DescriptionHandle, n: u32) {
        if let Some(d) = self.arena.get_mut(handle) {
            d.offset += n;
        }
    }

    /// Reads up to `n` bytes from `handle` into a fresh buffer, spanning
    /// block boundaries (`spec.md` §4.8 `read`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if the description's mode
    /// does not permit reading.
    pub fn read(
        &mut self,
        cache: &mut InodeCache,
        mount_table: &mut MountTable,
        handle: DescriptionHandle,
        n: u32,
        now: Time,
    ) -> Result<Vec<u8>, EngineError> {
        let description = self.arena.get(handle).expect("valid description handle");
        if !description.mode.allows_read() {
            return Err(EngineError::InvalidArgument("descriptor is not open for reading".into()));
        }
        let device = description.device;
        let cache_handle = description.cache_handle;
        let mut offset = description.offset;
        let size = cache.get_entry(cache_handle).inode().size;
        let want = n.min(size.saturating_sub(offset));

        let mut out = Vec::with_capacity(want as usize);
        let mut remaining = want;
        while remaining > 0 {
            let logical = (offset / BLOCK_SIZE as u32) as usize;
            let start_byte = (offset % BLOCK_SIZE as u32) as usize;
            let inode = *cache.get_entry(cache_handle).inode();
            let physical = block_map::logical_to_physical(mount_table, device, &inode, logical)?;
            let chunk = (BLOCK_SIZE - start_byte).min(remaining as usize);
            if physical.is_none() {
                out.extend(std::iter::repeat(0_u8).take(chunk));
            } else {
                let block = mount_table.device_mut(device)?.read_block(physical.0)?;
                out.extend_from_slice(&block[start_byte..start_byte + chunk]);
            }
            offset += chunk as u32;
            remaining -= chunk as u32;
        }

        self.advance(handle, want);
        let entry = cache.get_entry_mut(cache_handle);
        entry.inode_mut().atime = now.0;
        entry.mark_dirty();
        Ok(out)
    }

    /// Writes `bytes` to `handle`, allocating blocks on demand, growing
    /// `size` by the full byte count regardless of overwrite (`spec.md`
    /// §4.8 `write`, preserved per §13 Open Question (a)).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if the description's mode
    /// is read-only.
    pub fn write(
        &mut self,
        cache: &mut InodeCache,
        mount_table: &mut MountTable,
        handle: DescriptionHandle,
        bytes: &[u8],
        now: Time,
    ) -> Result<u32, EngineError> {
        let description = self.arena.get(handle).expect("valid description handle");
        if description.mode == OpenMode::Read {
            return Err(EngineError::InvalidArgument("descriptor is not open for writing".into()));
        }
        let device = description.device;
        let cache_handle = description.cache_handle;
        let mut offset = description.offset;

        let mut remaining = bytes;
        while !remaining.is_empty() {
            let logical = (offset / BLOCK_SIZE as u32) as usize;
            let start_byte = (offset % BLOCK_SIZE as u32) as usize;
            let mut physical = {
                let inode = *cache.get_entry(cache_handle).inode();
                block_map::logical_to_physical(mount_table, device, &inode, logical)?
            };
            if physical.is_none() {
                let inode = cache.get_entry_mut(cache_handle).inode_mut();
                physical = block_map::allocate_next_block(mount_table, device, inode)?;
            }
            let chunk = (BLOCK_SIZE - start_byte).min(remaining.len());
            let mut block = mount_table.device_mut(device)?.read_block(physical.0)?;
            block[start_byte..start_byte + chunk].copy_from_slice(&remaining[..chunk]);
            mount_table.device_mut(device)?.write_block(physical.0, &block)?;

            offset += chunk as u32;
            remaining = &remaining[chunk..];
        }

        self.advance(handle, bytes.len() as u32);
        let entry = cache.get_entry_mut(cache_handle);
        entry.inode_mut().size += bytes.len() as u32;
        entry.inode_mut().atime = now.0;
        entry.inode_mut().ctime = now.0;
        entry.inode_mut().mtime = now.0;
        entry.mark_dirty();
        Ok(bytes.len() as u32)
    }
}
