//! Component 10: Simulator — top-level orchestration.
//!
//! Owns every bounded table the rest of the engine threads explicitly
//! (mount table, inode cache, open-file table, process table) and performs
//! the one orchestration step the lower modules deliberately don't do
//! themselves: mounting and unmounting a device, which needs a resolved
//! mount-point directory, device registration, and the two-sided
//! cache/mount-table wiring that makes a mount point transparent to
//! `path::resolve` (`spec.md` §4.2/§4.7).
//!
//! Grounded on `original_source/main.cpp`'s bootstrap (mounts the root image
//! unconditionally, fatal on failure) and `MountedDevice.cpp`'s mount/unmount
//! pair. The explicit `now: Time` parameter every lower-level operation takes
//! is this simulator's own departure from the original's inline `time(0L)`
//! calls at each use site (`spec.md` Design Note §9); this module collapses
//! that back down to the single real clock read in [`Simulator::now`].

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::device::MountedDevice;
use crate::error::EngineError;
use crate::inode_cache::InodeCache;
use crate::mount_table::MountTable;
use crate::namespace::{self, StatInfo};
use crate::open_file::{OpenFileTable, OpenMode};
use crate::path::{self, Resolved};
use crate::permissions::FileType;
use crate::process::{Process, ProcessTable};
use crate::types::{BLOCK_SIZE, ROOT_INODE, Time};

/// Reference table sizes (SPEC_FULL §3).
pub const INODE_TABLE_SIZE: usize = 64;
/// Reference table sizes (SPEC_FULL §3).
pub const MOUNT_TABLE_SIZE: usize = 4;
/// Reference table sizes (SPEC_FULL §3).
pub const OPEN_FILES_TABLE_SIZE: usize = 32;
/// Reference table sizes (SPEC_FULL §3).
pub const PROCESS_TABLE_SIZE: usize = 2;

/// This simulator only ever runs the one bootstrap process.
const BOOTSTRAP_PID: usize = 0;

/// Top-level engine handle: every table `spec.md` names, wired together.
pub struct Simulator {
    mount_table: MountTable,
    cache: InodeCache,
    open_files: OpenFileTable,
    processes: ProcessTable,
}

impl Simulator {
    /// Mounts `image_path` as the filesystem root and spawns the bootstrap
    /// process rooted there.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fatal`] if the root image cannot be opened or
    /// is not a valid ext2 image: failure to mount the initial root is
    /// unconditionally fatal (`spec.md` §4.2/§7c), unlike every later mount.
    pub fn new(image_path: &Path) -> Result<Self, EngineError> {
        let mut mount_table = MountTable::new(MOUNT_TABLE_SIZE);
        let mut cache = InodeCache::new(INODE_TABLE_SIZE);

        let device = MountedDevice::mount(image_path).map_err(|e| EngineError::Fatal(format!("failed to mount root image: {e}")))?;
        let device_id = mount_table.register(device, image_path.to_path_buf(), "/".to_owned(), None)?;
        let root_handle = cache.get(&mut mount_table, device_id, ROOT_INODE)?;
        mount_table.set_root_handle(device_id, root_handle)?;

        let cwd_handle = cache.get(&mut mount_table, device_id, ROOT_INODE)?;
        let mut processes = ProcessTable::new(PROCESS_TABLE_SIZE);
        let pid = processes.spawn(Process::new(Resolved {
            device: device_id,
            handle: cwd_handle,
        }))?;
        debug_assert_eq!(pid, BOOTSTRAP_PID);

        info!("mounted root image {}", image_path.display());
        Ok(Self {
            mount_table,
            cache,
            open_files: OpenFileTable::new(OPEN_FILES_TABLE_SIZE),
            processes,
        })
    }

    /// The current wall-clock time, read once per call and threaded down
    /// explicitly from here into every operation that needs it.
    #[must_use]
    pub fn now(&self) -> Time {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        Time(secs as u32)
    }

    fn process(&self) -> &Process {
        self.processes.get(BOOTSTRAP_PID).expect("bootstrap process always present")
    }

    fn process_mut(&mut self) -> &mut Process {
        self.processes.get_mut(BOOTSTRAP_PID).expect("bootstrap process always present")
    }

    fn cwd(&self) -> Resolved {
        self.process().cwd()
    }

    /// `pwd`: the absolute path of the current working directory.
    ///
    /// # Errors
    ///
    /// Propagates [`path::fullpath`]'s errors.
    pub fn pwd(&mut self) -> Result<String, EngineError> {
        let cwd = self.cwd();
        path::fullpath(&mut self.cache, &mut self.mount_table, cwd)
    }

    /// `cd(path)`: changes the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotADirectory`] if `path` does not name a
    /// directory, or propagates [`path::resolve`]'s errors.
    pub fn cd(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let resolved = path::resolve(&mut self.cache, &mut self.mount_table, cwd, path)?;
        let inode = *self.cache.get_entry(resolved.handle).inode();
        if FileType::from_mode(inode.mode) != FileType::Directory {
            self.cache.put(&mut self.mount_table, resolved.handle)?;
            return Err(EngineError::NotADirectory(path.to_owned()));
        }
        self.cache.put(&mut self.mount_table, cwd.handle)?;
        self.process_mut().set_cwd(resolved);
        Ok(())
    }

    /// `mount(image, path)`: opens `image_path` and grafts its root onto
    /// `mount_path`, an existing, otherwise-unreferenced directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyExists`] if `image_path` is already
    /// mounted or `mount_path` is already a mount point,
    /// [`EngineError::NotADirectory`] if `mount_path` is not a directory, or
    /// [`EngineError::Busy`] if it is referenced anywhere besides this call.
    pub fn mount(&mut self, image_path: &Path, mount_path: &str) -> Result<(), EngineError> {
        if !mount_path.starts_with('/') {
            return Err(EngineError::InvalidArgument(format!("{mount_path}: mount path must be absolute")));
        }
        if self.mount_table.is_image_mounted(image_path) {
            return Err(EngineError::AlreadyExists(format!("{}: already mounted", image_path.display())));
        }
        if self.mount_table.is_mount_path_used(mount_path) {
            return Err(EngineError::AlreadyExists(format!("{mount_path}: already a mount point")));
        }

        let cwd = self.cwd();
        let mount_point = path::resolve(&mut self.cache, &mut self.mount_table, cwd, mount_path)?;
        let result = (|| -> Result<(), EngineError> {
            let inode = *self.cache.get_entry(mount_point.handle).inode();
            if FileType::from_mode(inode.mode) != FileType::Directory {
                return Err(EngineError::NotADirectory(mount_path.to_owned()));
            }
            if self.cache.get_entry(mount_point.handle).refcount() != 1 {
                return Err(EngineError::Busy(mount_path.to_owned()));
            }

            let device = MountedDevice::mount(image_path)?;
            let device_id = self.mount_table.register(
                device,
                image_path.to_path_buf(),
                mount_path.to_owned(),
                Some((mount_point.device, mount_point.handle)),
            )?;
            let root_handle = self.cache.get(&mut self.mount_table, device_id, ROOT_INODE)?;
            self.mount_table.set_root_handle(device_id, root_handle)?;
            self.cache.get_entry_mut(mount_point.handle).set_mounted_device(Some(device_id));
            Ok(())
        })();

        if result.is_err() {
            self.cache.put(&mut self.mount_table, mount_point.handle)?;
        } else {
            info!("mounted {} at {mount_path}", image_path.display());
        }
        result
    }

    /// `umount(path)`: detaches the device mounted at `mount_path`.
    ///
    /// Checks only the device's root-inode reference count for busy-ness
    /// (`spec.md` §4.7): an open file elsewhere on the device that never
    /// touched the root inode is not caught by this check.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMounted`] if nothing is mounted there,
    /// [`EngineError::InvalidArgument`] for the filesystem root, or
    /// [`EngineError::Busy`] if the device root is still referenced.
    pub fn umount(&mut self, mount_path: &str) -> Result<(), EngineError> {
        let device_id = self
            .mount_table
            .iter()
            .find(|(_, entry)| entry.mount_path() == mount_path)
            .map(|(id, _)| id)
            .ok_or_else(|| EngineError::NotMounted(mount_path.to_owned()))?;

        let parent = self.mount_table.entry(device_id)?.parent();
        if parent.is_none() {
            return Err(EngineError::InvalidArgument(format!("{mount_path}: cannot unmount the filesystem root")));
        }

        let root_handle = self.mount_table.entry(device_id)?.root_handle();
        if self.cache.get_entry(root_handle).refcount() != 1 {
            return Err(EngineError::Busy(mount_path.to_owned()));
        }

        self.cache.put(&mut self.mount_table, root_handle)?;
        self.mount_table.unregister(device_id);

        let (_, mount_point_handle) = parent.expect("checked above");
        self.cache.get_entry_mut(mount_point_handle).set_mounted_device(None);
        self.cache.put(&mut self.mount_table, mount_point_handle)?;

        info!("unmounted {mount_path}");
        Ok(())
    }

    /// `mount` with no arguments: one `"{image} on {path}"` line per mounted device.
    #[must_use]
    pub fn mounts(&self) -> Vec<String> {
        self.mount_table
            .iter()
            .map(|(_, entry)| format!("{} on {}", entry.image_path().display(), entry.mount_path()))
            .collect()
    }

    /// `creat(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::creat`].
    pub fn creat(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::creat(&mut self.cache, &mut self.mount_table, cwd, path, now)
    }

    /// `mkdir(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::mkdir`].
    pub fn mkdir(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::mkdir(&mut self.cache, &mut self.mount_table, cwd, path, now)
    }

    /// `rmdir(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::rmdir`].
    pub fn rmdir(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::rmdir(&mut self.cache, &mut self.mount_table, cwd, path, now)
    }

    /// `link(src, dst)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::link`].
    pub fn link(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::link(&mut self.cache, &mut self.mount_table, cwd, src, dst, false, now)
    }

    /// `unlink(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::unlink`].
    pub fn unlink(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::unlink(&mut self.cache, &mut self.mount_table, cwd, path, false, now)
    }

    /// `symlink(src, dst)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::symlink`].
    pub fn symlink(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::symlink(&mut self.cache, &mut self.mount_table, cwd, src, dst, now)
    }

    /// `chmod(mode, path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::chmod`].
    pub fn chmod(&mut self, path: &str, mode: u16) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::chmod(&mut self.cache, &mut self.mount_table, cwd, path, mode, now)
    }

    /// `utime(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::utime`].
    pub fn utime(&mut self, path: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::utime(&mut self.cache, &mut self.mount_table, cwd, path, now)
    }

    /// `stat(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::stat`].
    pub fn stat(&mut self, path: &str) -> Result<StatInfo, EngineError> {
        let cwd = self.cwd();
        namespace::stat(&mut self.cache, &mut self.mount_table, cwd, path)
    }

    /// `ls(path)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::ls`].
    pub fn ls(&mut self, path: &str) -> Result<Vec<String>, EngineError> {
        let cwd = self.cwd();
        namespace::ls(&mut self.cache, &mut self.mount_table, cwd, path)
    }

    /// `cp(src, dst)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::cp`].
    pub fn cp(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::cp(&mut self.cache, &mut self.mount_table, &mut self.open_files, cwd, src, dst, now)
    }

    /// `mv(src, dst)`.
    ///
    /// # Errors
    ///
    /// See [`namespace::mv`].
    pub fn mv(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        namespace::mv(&mut self.cache, &mut self.mount_table, &mut self.open_files, cwd, src, dst, now)
    }

    /// `open(path, mode)`: installs a new open-file description at the
    /// lowest free descriptor, per `spec.md` §4.8.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotARegularFile`] if `path` is not a regular
    /// file, [`EngineError::TableFull`] if the process has no free
    /// descriptor, or propagates [`path::resolve`]/[`OpenFileTable::open_description`]'s errors.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<usize, EngineError> {
        let cwd = self.cwd();
        let now = self.now();
        let resolved = path::resolve(&mut self.cache, &mut self.mount_table, cwd, path)?;
        let result = (|| -> Result<usize, EngineError> {
            let inode = *self.cache.get_entry(resolved.handle).inode();
            if FileType::from_mode(inode.mode) != FileType::Regular {
                return Err(EngineError::NotARegularFile(path.to_owned()));
            }
            let fd = self.process().lowest_free_descriptor().ok_or(EngineError::TableFull("process descriptor table"))?;
            let description = self
                .open_files
                .open_description(&mut self.cache, &mut self.mount_table, resolved.device, resolved.handle, mode, now)?;
            self.process_mut().install(fd, description)?;
            Ok(fd)
        })();
        self.cache.put(&mut self.mount_table, resolved.handle)?;
        result
    }

    /// `close(fd)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `fd` is not open.
    pub fn close(&mut self, fd: usize) -> Result<(), EngineError> {
        let Some(description) = self.process_mut().clear(fd) else {
            return Err(EngineError::InvalidArgument(format!("descriptor {fd} is not open")));
        };
        self.open_files.close(&mut self.cache, &mut self.mount_table, description)
    }

    /// `dup(fd)`: aliases `fd` at the lowest free descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `fd` is not open, or
    /// [`EngineError::TableFull`] if no descriptor is free.
    pub fn dup(&mut self, fd: usize) -> Result<usize, EngineError> {
        let description = self.process().descriptor(fd)?;
        let new_fd = self.process().lowest_free_descriptor().ok_or(EngineError::TableFull("process descriptor table"))?;
        self.open_files.bump(description);
        self.process_mut().install(new_fd, description)?;
        Ok(new_fd)
    }

    /// `dup2(fd, new_fd)`: aliases `fd` at `new_fd`, closing whatever `new_fd`
    /// previously held. A no-op if `fd == new_fd`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `fd` is not open or
    /// `new_fd` is out of range.
    pub fn dup2(&mut self, fd: usize, new_fd: usize) -> Result<(), EngineError> {
        let description = self.process().descriptor(fd)?;
        if fd == new_fd {
            return Ok(());
        }
        if let Some(previous) = self.process_mut().clear(new_fd) {
            self.open_files.close(&mut self.cache, &mut self.mount_table, previous)?;
        }
        self.open_files.bump(description);
        self.process_mut().install(new_fd, description)?;
        Ok(())
    }

    /// `lseek(fd, offset)`, returning the previous offset.
    ///
    /// # Errors
    ///
    /// Propagates [`OpenFileTable::seek`]'s errors.
    pub fn lseek(&mut self, fd: usize, offset: u32) -> Result<u32, EngineError> {
        let description = self.process().descriptor(fd)?;
        self.open_files.seek(&self.cache, description, offset)
    }

    /// `read(fd, n)`.
    ///
    /// # Errors
    ///
    /// Propagates [`OpenFileTable::read`]'s errors.
    pub fn read(&mut self, fd: usize, n: u32) -> Result<Vec<u8>, EngineError> {
        let description = self.process().descriptor(fd)?;
        let now = self.now();
        self.open_files.read(&mut self.cache, &mut self.mount_table, description, n, now)
    }

    /// `write(fd, bytes)`.
    ///
    /// # Errors
    ///
    /// Propagates [`OpenFileTable::write`]'s errors.
    pub fn write(&mut self, fd: usize, bytes: &[u8]) -> Result<u32, EngineError> {
        let description = self.process().descriptor(fd)?;
        let now = self.now();
        self.open_files.write(&mut self.cache, &mut self.mount_table, description, bytes, now)
    }

    /// `cat(path)`: reads a whole regular file through a transient descriptor.
    ///
    /// # Errors
    ///
    /// Propagates [`Simulator::open`]/[`Simulator::read`]'s errors.
    pub fn cat(&mut self, path: &str) -> Result<Vec<u8>, EngineError> {
        let fd = self.open(path, OpenMode::Read)?;
        let result = (|| -> Result<Vec<u8>, EngineError> {
            let mut out = Vec::new();
            loop {
                let chunk = self.read(fd, BLOCK_SIZE as u32)?;
                if chunk.is_empty() {
                    break;
                }
                out.extend_from_slice(&chunk);
            }
            Ok(out)
        })();
        self.close(fd)?;
        result
    }

    /// `pfd`: one line per open descriptor of the running process.
    #[must_use]
    pub fn pfd(&self) -> Vec<String> {
        self.process()
            .open_descriptors()
            .map(|(fd, handle)| {
                let description = self.open_files.get(handle);
                format!("{fd}: {:?} offset {}", description.mode(), description.offset())
            })
            .collect()
    }

    /// `quit`: writes every dirty cached inode back to its device.
    ///
    /// # Errors
    ///
    /// Propagates [`InodeCache::flush`]'s errors.
    pub fn flush(&mut self) -> Result<(), EngineError> {
        self.cache.flush(&mut self.mount_table)
    }
}
