//! Component 6: Path Resolver.
//!
//! `spec.md` §4.6's splitting rule is supplemented from
//! `original_source/PathComponents.cpp` (SPEC_FULL.md §6): split on `'/'`,
//! drop empty components, and remember whether the original path was
//! absolute.

use crate::directory;
use crate::error::EngineError;
use crate::inode_cache::{CacheHandle, InodeCache};
use crate::mount_table::{DeviceId, MountTable};
use crate::permissions::FileType;
use crate::types::{InodeNum, ROOT_INODE};

/// A path split into its non-empty, `/`-separated components, remembering
/// whether the original string began with `/`.
#[derive(Debug, Clone)]
pub struct SplitPath {
    absolute: bool,
    components: Vec<String>,
}

impl SplitPath {
    /// Splits `path` the way `original_source/PathComponents.cpp` does:
    /// `/`-separated, empty components (from `//` or a trailing `/`)
    /// dropped.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            absolute: path.starts_with('/'),
            components: path.split('/').filter(|c| !c.is_empty()).map(str::to_owned).collect(),
        }
    }

    /// Whether the original path began with `/`.
    #[must_use]
    pub const fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// The ordered, non-empty path components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Splits into `(parent_path, final_component)` using standard
    /// dirname/basename semantics. The parent path is itself absolute iff
    /// the input was.
    #[must_use]
    pub fn split_parent(path: &str) -> (String, String) {
        let split = Self::new(path);
        match split.components.split_last() {
            None if split.absolute => ("/".to_owned(), String::new()),
            None => (String::new(), String::new()),
            Some((last, init)) => {
                let prefix = if split.absolute { "/" } else { "" };
                (format!("{prefix}{}", init.join("/")), last.clone())
            }
        }
    }
}

/// A resolved location: the device and cached-inode handle of an acquired
/// inode. Callers must release it via [`InodeCache::put`].
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    /// The device the resolved inode lives on.
    pub device: DeviceId,
    /// The cache handle of the resolved inode. Already acquired (ref-count
    /// bumped); the caller owns the release.
    pub handle: CacheHandle,
}

/// Acquires a fresh reference to the filesystem root.
///
/// # Errors
///
/// Returns [`EngineError::Fatal`] if no device is mounted at "/" yet.
pub fn acquire_root(cache: &mut InodeCache, mount_table: &mut MountTable) -> Result<Resolved, EngineError> {
    let root_device = mount_table
        .iter()
        .find(|(_, entry)| entry.parent().is_none())
        .map(|(id, _)| id)
        .ok_or_else(|| EngineError::Fatal("filesystem root not mounted".into()))?;
    let handle = cache.get(mount_table, root_device, ROOT_INODE)?;
    Ok(Resolved { device: root_device, handle })
}

/// Acquires a fresh reference to whatever `at` currently refers to.
pub fn reacquire(cache: &mut InodeCache, mount_table: &mut MountTable, at: Resolved) -> Result<Resolved, EngineError> {
    let inode_num = cache.get_entry(at.handle).inode_num();
    let handle = cache.get(mount_table, at.device, inode_num)?;
    Ok(Resolved { device: at.device, handle })
}

/// Resolves `path` starting from `cwd` (used when `path` is relative).
///
/// Implements `spec.md` §4.6: crosses mount points upward on `..` out of a
/// device root, and downward whenever a traversed entry names a mount
/// point. The caller must eventually `put` the returned handle (and still
/// owns releasing `cwd` separately: this never consumes it).
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] if any component does not exist, or
/// [`EngineError::NotADirectory`] if a non-final component is not a
/// directory.
pub fn resolve(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str) -> Result<Resolved, EngineError> {
    let split = SplitPath::new(path);
    let mut current = if split.is_absolute() {
        acquire_root(cache, mount_table)?
    } else {
        reacquire(cache, mount_table, cwd)?
    };

    for component in split.components() {
        if component == "." {
            continue;
        }

        if component == ".." {
            let inode_num = cache.get_entry(current.handle).inode_num();
            let parent_link = mount_table.entry(current.device)?.parent();
            if inode_num == ROOT_INODE {
                if let Some((parent_device, parent_mount_handle)) = parent_link {
                    let parent_inode_num = cache.get_entry(parent_mount_handle).inode_num();
                    let new_handle = cache.get(mount_table, parent_device, parent_inode_num)?;
                    cache.put(mount_table, current.handle)?;
                    current = Resolved {
                        device: parent_device,
                        handle: new_handle,
                    };
                    continue;
                }
                // Root of the whole namespace: ".." at "/" stays at "/".
                continue;
            }
        }

        let dir_inode = *cache.get_entry(current.handle).inode();
        if FileType::from_mode(dir_inode.mode) != FileType::Directory {
            cache.put(mount_table, current.handle)?;
            return Err(EngineError::NotADirectory(component.clone()));
        }

        let found = directory::find(mount_table, current.device, &dir_inode, component)?;
        let Some(found) = found else {
            cache.put(mount_table, current.handle)?;
            return Err(EngineError::NotFound(component.clone()));
        };

        cache.put(mount_table, current.handle)?;
        let mut next_device = current.device;
        let mut next_handle = cache.get(mount_table, next_device, found.inode)?;

        if let Some(mounted) = cache.get_entry(next_handle).mounted_device() {
            cache.put(mount_table, next_handle)?;
            next_device = mounted;
            next_handle = cache.get(mount_table, next_device, ROOT_INODE)?;
        }

        current = Resolved {
            device: next_device,
            handle: next_handle,
        };
    }

    Ok(current)
}

/// Computes the absolute path of a directory inode by walking upward via
/// its ".." entries, crossing mount points in reverse (`spec.md` §4.6
/// `fullpath`).
pub fn fullpath(cache: &mut InodeCache, mount_table: &mut MountTable, start: Resolved) -> Result<String, EngineError> {
    let mut parts: Vec<String> = Vec::new();
    let mut device = start.device;
    let mut inode_num = cache.get_entry(start.handle).inode_num();

    loop {
        let parent_link = mount_table.entry(device)?.parent();
        if inode_num == ROOT_INODE && parent_link.is_none() {
            break;
        }

        let (parent_device, parent_inode_num) = if inode_num == ROOT_INODE {
            let (parent_device, parent_mount_handle) = parent_link.expect("checked above");
            (parent_device, cache.get_entry(parent_mount_handle).inode_num())
        } else {
            let dir_handle = cache.get(mount_table, device, inode_num)?;
            let dir_inode = *cache.get_entry(dir_handle).inode();
            cache.put(mount_table, dir_handle)?;
            (device, dotdot_target(mount_table, device, &dir_inode)?)
        };

        let parent_handle = cache.get(mount_table, parent_device, parent_inode_num)?;
        let parent_inode = *cache.get_entry(parent_handle).inode();
        let entries = directory::iter_entries(mount_table, parent_device, &parent_inode)?;
        cache.put(mount_table, parent_handle)?;

        let name = entries
            .into_iter()
            .find(|e| e.inode == inode_num && e.name != "." && e.name != "..")
            .map_or_else(|| "?".to_owned(), |e| e.name);

        parts.push(name);
        device = parent_device;
        inode_num = parent_inode_num;
    }

    if parts.is_empty() {
        return Ok("/".to_owned());
    }
    parts.reverse();
    Ok(format!("/{}", parts.join("/")))
}

fn dotdot_target(mount_table: &mut MountTable, device: DeviceId, dir_inode: &crate::ondisk::inode::Inode) -> Result<InodeNum, EngineError> {
    let ptr = dir_inode.block_ptr(0);
    let block = mount_table.device_mut(device)?.read_block(ptr.0)?;
    let header = crate::ondisk::dirent::DirentHeader::from_block(&block, 12);
    Ok(InodeNum(header.inode))
}
