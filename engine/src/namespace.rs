//! Component 9: Namespace Operations.
//!
//! Grounded on `original_source/INodeTable.cpp`'s `ls_file`/`ls_dir` (the
//! one-line `ls -l`-style entry formatter) and `efs::permissions::Permissions`'s
//! `Display` impl (the `rwxrwxrwx` triad it composes with). The mutating
//! operations themselves follow `spec.md` §4.9 directly: split a path,
//! resolve its parent, validate, touch the inode(s) involved.

use log::trace;

use crate::block_map;
use crate::device::AllocKind;
use crate::directory;
use crate::error::EngineError;
use crate::inode_cache::InodeCache;
use crate::mount_table::MountTable;
use crate::ondisk::dirent::EntryFileType;
use crate::ondisk::inode::Inode;
use crate::open_file::{OpenFileTable, OpenMode};
use crate::path::{self, Resolved, SplitPath};
use crate::permissions::{self, FileType, DIR_FILE_MODE, LNK_FILE_MODE, REG_FILE_MODE};
use crate::types::{Gid, InodeNum, Time, Uid, BLOCK_SIZE};

/// Maximum byte length of an inline symlink target: the 15-word block array
/// doubles as 60 bytes of storage, and `spec.md` §4.9 reserves the last byte.
pub const MAX_SYMLINK_LEN: usize = 59;

/// The `stat` command's result: dev/ino/size/uid/gid/mode/time.
#[derive(Debug, Clone)]
pub struct StatInfo {
    /// Mount path of the device the inode lives on.
    pub device: String,
    /// Inode number.
    pub inode_num: InodeNum,
    /// File size in bytes (inline target length, for a symlink).
    pub size: u32,
    /// Owning user ID.
    pub uid: Uid,
    /// Owning group ID.
    pub gid: Gid,
    /// Raw mode word.
    pub mode: u16,
    /// Last modification time.
    pub mtime: Time,
}

fn resolve_parent(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str) -> Result<(Resolved, String), EngineError> {
    let (parent_path, name) = SplitPath::split_parent(path);
    let parent = path::resolve(cache, mount_table, cwd, &parent_path)?;
    let parent_inode = *cache.get_entry(parent.handle).inode();
    if FileType::from_mode(parent_inode.mode) != FileType::Directory {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::NotADirectory(parent_path));
    }
    Ok((parent, name))
}

fn reject_dotted(name: &str, path: &str) -> Result<(), EngineError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(EngineError::RemoveRefused(format!("{path}: refused on \".\", \"..\" or \"/\"")));
    }
    Ok(())
}

/// Reads a symlink's inline target string out of its block array.
#[must_use]
pub fn read_symlink_target(inode: &Inode, size: u32) -> String {
    let words = inode.block;
    let mut buf = [0_u8; 60];
    for (i, word) in words.into_iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&word.to_ne_bytes());
    }
    let len = (size as usize).min(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

fn write_symlink_target(inode: &mut Inode, target: &str) {
    let mut buf = [0_u8; 60];
    buf[..target.len()].copy_from_slice(target.as_bytes());
    let mut words = [0_u32; 15];
    for (i, word) in words.iter_mut().enumerate() {
        *word = u32::from_ne_bytes(buf[i * 4..i * 4 + 4].try_into().expect("4-byte chunk"));
    }
    inode.block = words;
}

/// Formats one directory entry the way `ls` prints it: mode string, link
/// count, uid, gid, size, name, and for symlinks `-> target`.
#[must_use]
pub fn format_entry(inode: &Inode, name: &str) -> String {
    let mode_str = permissions::format_mode(inode.mode);
    let mut line = format!(
        "{mode_str} {links:>3} {uid:>5} {gid:>5} {size:>8} {name}",
        links = inode.links_count,
        uid = inode.uid,
        gid = inode.gid,
        size = inode.size,
    );
    if FileType::from_mode(inode.mode) == FileType::Symlink {
        line.push_str(" -> ");
        line.push_str(&read_symlink_target(inode, inode.size));
    }
    line
}

/// `creat(path)` (`spec.md` §4.9): allocates a new regular-file inode and
/// links it into its parent directory.
///
/// # Errors
///
/// Returns [`EngineError::AlreadyExists`] if `path` already names something,
/// or [`EngineError::NotADirectory`] if its parent is not a directory.
pub fn creat(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, now: Time) -> Result<(), EngineError> {
    let (parent, name) = resolve_parent(cache, mount_table, cwd, path)?;
    if name.is_empty() {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::InvalidArgument(format!("{path}: empty name")));
    }
    let parent_inode = *cache.get_entry(parent.handle).inode();
    if directory::find(mount_table, parent.device, &parent_inode, &name)?.is_some() {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::AlreadyExists(path.to_owned()));
    }

    let new_num = mount_table.device_mut(parent.device)?.allocate(AllocKind::Inode)?;
    let new_inode_num = InodeNum(new_num);
    let new_handle = cache.get(mount_table, parent.device, new_inode_num)?;
    let entry = cache.get_entry_mut(new_handle);
    *entry.inode_mut() = Inode::zeroed();
    entry.inode_mut().mode = REG_FILE_MODE;
    entry.inode_mut().links_count = 1;
    entry.inode_mut().atime = now.0;
    entry.inode_mut().ctime = now.0;
    entry.inode_mut().mtime = now.0;
    entry.mark_dirty();

    let parent_entry = cache.get_entry_mut(parent.handle);
    directory::add_entry(mount_table, parent.device, parent_entry.inode_mut(), &name, new_inode_num, EntryFileType::Regular, now)?;
    parent_entry.inode_mut().atime = now.0;
    parent_entry.mark_dirty();

    cache.put(mount_table, new_handle)?;
    cache.put(mount_table, parent.handle)?;
    trace!("created {path}");
    Ok(())
}

/// `mkdir(path)` (`spec.md` §4.9): like [`creat`], but also allocates and
/// initialises the new directory's first data block and bumps the parent's
/// link count.
///
/// # Errors
///
/// Same as [`creat`].
pub fn mkdir(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, now: Time) -> Result<(), EngineError> {
    let (parent, name) = resolve_parent(cache, mount_table, cwd, path)?;
    if name.is_empty() {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::InvalidArgument(format!("{path}: empty name")));
    }
    let parent_inode_num = cache.get_entry(parent.handle).inode_num();
    let parent_inode = *cache.get_entry(parent.handle).inode();
    if directory::find(mount_table, parent.device, &parent_inode, &name)?.is_some() {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::AlreadyExists(path.to_owned()));
    }

    let new_num = mount_table.device_mut(parent.device)?.allocate(AllocKind::Inode)?;
    let new_inode_num = InodeNum(new_num);
    let new_handle = cache.get(mount_table, parent.device, new_inode_num)?;
    *cache.get_entry_mut(new_handle).inode_mut() = Inode::zeroed();

    let block_num = block_map::allocate_next_block(mount_table, parent.device, cache.get_entry_mut(new_handle).inode_mut())?;
    let block = directory::init_block(new_inode_num, parent_inode_num);
    mount_table.device_mut(parent.device)?.write_block(block_num.0, &block)?;

    let entry = cache.get_entry_mut(new_handle);
    entry.inode_mut().mode = DIR_FILE_MODE;
    entry.inode_mut().links_count = 2;
    entry.inode_mut().size = BLOCK_SIZE as u32;
    entry.inode_mut().atime = now.0;
    entry.inode_mut().ctime = now.0;
    entry.inode_mut().mtime = now.0;
    entry.mark_dirty();

    let parent_entry = cache.get_entry_mut(parent.handle);
    directory::add_entry(mount_table, parent.device, parent_entry.inode_mut(), &name, new_inode_num, EntryFileType::Directory, now)?;
    parent_entry.inode_mut().links_count += 1;
    parent_entry.inode_mut().atime = now.0;
    parent_entry.mark_dirty();

    cache.put(mount_table, new_handle)?;
    cache.put(mount_table, parent.handle)?;
    trace!("created directory {path}");
    Ok(())
}

/// `rmdir(path)` (`spec.md` §4.9).
///
/// # Errors
///
/// Returns [`EngineError::RemoveRefused`] on ".", ".." or "/",
/// [`EngineError::NotADirectory`] if the target is not a directory,
/// [`EngineError::Busy`] if it is referenced anywhere besides this call, or
/// [`EngineError::NotEmpty`] if it holds more than "." and "..".
pub fn rmdir(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, now: Time) -> Result<(), EngineError> {
    let (parent, name) = resolve_parent(cache, mount_table, cwd, path)?;
    if let Err(e) = reject_dotted(&name, path) {
        cache.put(mount_table, parent.handle)?;
        return Err(e);
    }

    let parent_inode = *cache.get_entry(parent.handle).inode();
    let Some(target) = directory::find(mount_table, parent.device, &parent_inode, &name)? else {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::NotFound(path.to_owned()));
    };

    let child_handle = cache.get(mount_table, parent.device, target.inode)?;
    let result = (|| -> Result<(), EngineError> {
        let child_inode = *cache.get_entry(child_handle).inode();
        if FileType::from_mode(child_inode.mode) != FileType::Directory {
            return Err(EngineError::NotADirectory(path.to_owned()));
        }
        if cache.get_entry(child_handle).refcount() != 1 {
            return Err(EngineError::Busy(path.to_owned()));
        }
        if !directory::is_empty(mount_table, parent.device, &child_inode)? {
            return Err(EngineError::NotEmpty(path.to_owned()));
        }

        let inode = cache.get_entry_mut(child_handle).inode_mut();
        block_map::truncate(mount_table, parent.device, inode, now)?;
        mount_table.device_mut(parent.device)?.deallocate(AllocKind::Inode, target.inode.0)?;
        Ok(())
    })();

    cache.put(mount_table, child_handle)?;
    if let Err(e) = result {
        cache.put(mount_table, parent.handle)?;
        return Err(e);
    }

    let parent_entry = cache.get_entry_mut(parent.handle);
    directory::remove_entry(mount_table, parent.device, parent_entry.inode_mut(), &name, now)?;
    parent_entry.inode_mut().links_count -= 1;
    parent_entry.mark_dirty();
    cache.put(mount_table, parent.handle)?;
    trace!("removed directory {path}");
    Ok(())
}

/// `link(src, dst, is_moving)` (`spec.md` §4.9).
///
/// # Errors
///
/// Returns [`EngineError::AlreadyExists`] if `dst` exists,
/// [`EngineError::NotFound`] if `src` does not, [`EngineError::CrossDevice`]
/// if they are on different devices, or [`EngineError::InvalidArgument`] if
/// `src` is a directory and `is_moving` is false.
pub fn link(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, src: &str, dst: &str, is_moving: bool, now: Time) -> Result<(), EngineError> {
    let src_resolved = path::resolve(cache, mount_table, cwd, src)?;
    let result = link_inner(cache, mount_table, cwd, src_resolved, src, dst, is_moving, now);
    cache.put(mount_table, src_resolved.handle)?;
    result?;
    trace!("linked {src} -> {dst}");
    Ok(())
}

fn link_inner(
    cache: &mut InodeCache,
    mount_table: &mut MountTable,
    cwd: Resolved,
    src_resolved: Resolved,
    src: &str,
    dst: &str,
    is_moving: bool,
    now: Time,
) -> Result<(), EngineError> {
    let src_inode = *cache.get_entry(src_resolved.handle).inode();
    if !is_moving && FileType::from_mode(src_inode.mode) == FileType::Directory {
        return Err(EngineError::InvalidArgument(format!("{src}: is a directory")));
    }

    let (dst_parent, dst_name) = resolve_parent(cache, mount_table, cwd, dst)?;
    if let Err(e) = reject_dotted(&dst_name, dst) {
        cache.put(mount_table, dst_parent.handle)?;
        return Err(e);
    }
    let result = link_into_parent(cache, mount_table, dst_parent, &dst_name, src_resolved, &src_inode, src, dst, now);
    cache.put(mount_table, dst_parent.handle)?;
    result?;

    let src_entry = cache.get_entry_mut(src_resolved.handle);
    src_entry.inode_mut().links_count += 1;
    src_entry.inode_mut().ctime = now.0;
    src_entry.mark_dirty();
    Ok(())
}

fn link_into_parent(
    cache: &mut InodeCache,
    mount_table: &mut MountTable,
    dst_parent: Resolved,
    dst_name: &str,
    src_resolved: Resolved,
    src_inode: &Inode,
    src: &str,
    dst: &str,
    now: Time,
) -> Result<(), EngineError> {
    if dst_parent.device != src_resolved.device {
        return Err(EngineError::CrossDevice(format!("{src} -> {dst}")));
    }
    let dst_parent_inode = *cache.get_entry(dst_parent.handle).inode();
    if directory::find(mount_table, dst_parent.device, &dst_parent_inode, dst_name)?.is_some() {
        return Err(EngineError::AlreadyExists(dst.to_owned()));
    }
    let src_inode_num = cache.get_entry(src_resolved.handle).inode_num();
    let file_type = match FileType::from_mode(src_inode.mode) {
        FileType::Directory => EntryFileType::Directory,
        FileType::Symlink => EntryFileType::Symlink,
        _ => EntryFileType::Regular,
    };
    let parent_entry = cache.get_entry_mut(dst_parent.handle);
    directory::add_entry(mount_table, dst_parent.device, parent_entry.inode_mut(), dst_name, src_inode_num, file_type, now)?;
    parent_entry.mark_dirty();
    Ok(())
}

/// `unlink(path, is_moving)` (`spec.md` §4.9).
///
/// # Errors
///
/// Returns [`EngineError::RemoveRefused`] on ".", ".." or "/",
/// [`EngineError::RemoveRefused`] on a directory unless `is_moving`, or
/// [`EngineError::Busy`] if still referenced and not `is_moving`.
pub fn unlink(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, is_moving: bool, now: Time) -> Result<(), EngineError> {
    let (parent, name) = resolve_parent(cache, mount_table, cwd, path)?;
    if let Err(e) = reject_dotted(&name, path) {
        cache.put(mount_table, parent.handle)?;
        return Err(e);
    }

    let parent_inode = *cache.get_entry(parent.handle).inode();
    let Some(target) = directory::find(mount_table, parent.device, &parent_inode, &name)? else {
        cache.put(mount_table, parent.handle)?;
        return Err(EngineError::NotFound(path.to_owned()));
    };

    let child_handle = cache.get(mount_table, parent.device, target.inode)?;
    let result = (|| -> Result<(), EngineError> {
        let child_inode = *cache.get_entry(child_handle).inode();
        if !is_moving && FileType::from_mode(child_inode.mode) == FileType::Directory {
            return Err(EngineError::RemoveRefused(format!("{path}: is a directory")));
        }
        if !is_moving && cache.get_entry(child_handle).refcount() != 1 {
            return Err(EngineError::Busy(path.to_owned()));
        }

        let entry = cache.get_entry_mut(child_handle);
        entry.inode_mut().links_count -= 1;
        entry.inode_mut().ctime = now.0;
        if entry.inode_mut().links_count == 0 {
            let inode = entry.inode_mut();
            block_map::truncate(mount_table, parent.device, inode, now)?;
            mount_table.device_mut(parent.device)?.deallocate(AllocKind::Inode, target.inode.0)?;
        }
        entry.mark_dirty();
        Ok(())
    })();
    cache.put(mount_table, child_handle)?;
    if let Err(e) = result {
        cache.put(mount_table, parent.handle)?;
        return Err(e);
    }

    let parent_entry = cache.get_entry_mut(parent.handle);
    directory::remove_entry(mount_table, parent.device, parent_entry.inode_mut(), &name, now)?;
    parent_entry.mark_dirty();
    cache.put(mount_table, parent.handle)?;
    trace!("unlinked {path}");
    Ok(())
}

/// `symlink(src, dst)` (`spec.md` §4.9): `src` must be an absolute path
/// naming an existing regular file or directory.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] if `src` is not absolute or
/// exceeds [`MAX_SYMLINK_LEN`] bytes, or propagates [`creat`]'s errors for `dst`.
pub fn symlink(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, src: &str, dst: &str, now: Time) -> Result<(), EngineError> {
    if !src.starts_with('/') {
        return Err(EngineError::InvalidArgument(format!("{src}: symlink target must be an absolute path")));
    }
    if src.len() > MAX_SYMLINK_LEN {
        return Err(EngineError::InvalidArgument(format!("{src}: exceeds {MAX_SYMLINK_LEN} bytes")));
    }

    let target = path::resolve(cache, mount_table, cwd, src)?;
    let target_inode = *cache.get_entry(target.handle).inode();
    cache.put(mount_table, target.handle)?;
    let target_type = FileType::from_mode(target_inode.mode);
    if target_type != FileType::Regular && target_type != FileType::Directory {
        return Err(EngineError::InvalidArgument(format!("{src}: must be a regular file or directory")));
    }

    creat(cache, mount_table, cwd, dst, now)?;
    let resolved = path::resolve(cache, mount_table, cwd, dst)?;
    let entry = cache.get_entry_mut(resolved.handle);
    entry.inode_mut().mode = LNK_FILE_MODE;
    entry.inode_mut().size = src.len() as u32;
    entry.inode_mut().ctime = now.0;
    write_symlink_target(entry.inode_mut(), src);
    entry.mark_dirty();
    cache.put(mount_table, resolved.handle)?;
    trace!("symlinked {dst} -> {src}");
    Ok(())
}

/// `chmod(mode, path)`: sets the low 9 mode bits, leaving the type and any
/// set-uid/set-gid/sticky bits untouched.
///
/// # Errors
///
/// Propagates [`path::resolve`]'s errors.
pub fn chmod(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, mode: u16, now: Time) -> Result<(), EngineError> {
    let resolved = path::resolve(cache, mount_table, cwd, path)?;
    let entry = cache.get_entry_mut(resolved.handle);
    let current = entry.inode().mode;
    entry.inode_mut().mode = (current & !permissions::Permissions::CHMOD_MASK) | (mode & permissions::Permissions::CHMOD_MASK);
    entry.inode_mut().ctime = now.0;
    entry.mark_dirty();
    cache.put(mount_table, resolved.handle)?;
    Ok(())
}

/// `utime(path)`: refreshes atime and ctime to `now`.
///
/// # Errors
///
/// Propagates [`path::resolve`]'s errors.
pub fn utime(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str, now: Time) -> Result<(), EngineError> {
    let resolved = path::resolve(cache, mount_table, cwd, path)?;
    let entry = cache.get_entry_mut(resolved.handle);
    entry.inode_mut().atime = now.0;
    entry.inode_mut().ctime = now.0;
    entry.mark_dirty();
    cache.put(mount_table, resolved.handle)?;
    Ok(())
}

/// `stat(path)`: dev/ino/size/uid/gid/mode/time.
///
/// # Errors
///
/// Propagates [`path::resolve`]'s errors.
pub fn stat(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str) -> Result<StatInfo, EngineError> {
    let resolved = path::resolve(cache, mount_table, cwd, path)?;
    let inode_num = cache.get_entry(resolved.handle).inode_num();
    let inode = *cache.get_entry(resolved.handle).inode();
    let device_path = mount_table.entry(resolved.device)?.mount_path().to_owned();
    cache.put(mount_table, resolved.handle)?;
    Ok(StatInfo {
        device: device_path,
        inode_num,
        size: inode.size,
        uid: inode.owner(),
        gid: inode.group(),
        mode: inode.mode,
        mtime: inode.modified_at(),
    })
}

/// Lists `path`'s entries if it is a directory, or its own attribute line if
/// it is a file (`spec.md` §6 `ls`), formatted per [`format_entry`].
///
/// # Errors
///
/// Propagates [`path::resolve`]'s errors.
pub fn ls(cache: &mut InodeCache, mount_table: &mut MountTable, cwd: Resolved, path: &str) -> Result<Vec<String>, EngineError> {
    let resolved = path::resolve(cache, mount_table, cwd, path)?;
    let inode = *cache.get_entry(resolved.handle).inode();
    let lines = if FileType::from_mode(inode.mode) == FileType::Directory {
        directory::iter_entries(mount_table, resolved.device, &inode)?
            .into_iter()
            .map(|e| {
                let entry_inode = mount_table.device_mut(resolved.device).and_then(|d| d.read_inode(e.inode));
                entry_inode.map(|i| format_entry(&i, &e.name)).unwrap_or_else(|err| format!("{}: {err}", e.name))
            })
            .collect()
    } else {
        vec![format_entry(&inode, path)]
    };
    cache.put(mount_table, resolved.handle)?;
    Ok(lines)
}

/// `cp(src, dst)` (`spec.md` §4.9): copies block-sized chunks from `src`
/// into `dst`, creating `dst` if it does not already exist.
///
/// # Errors
///
/// Propagates [`path::resolve`], [`creat`], and I/O errors.
pub fn cp(
    cache: &mut InodeCache,
    mount_table: &mut MountTable,
    open_files: &mut OpenFileTable,
    cwd: Resolved,
    src: &str,
    dst: &str,
    now: Time,
) -> Result<(), EngineError> {
    match path::resolve(cache, mount_table, cwd, dst) {
        Ok(resolved) => cache.put(mount_table, resolved.handle)?,
        Err(_) => creat(cache, mount_table, cwd, dst, now)?,
    }

    let src_resolved = path::resolve(cache, mount_table, cwd, src)?;
    let dst_resolved = path::resolve(cache, mount_table, cwd, dst)?;

    let result = (|| -> Result<(), EngineError> {
        let src_description = open_files.open_description(cache, mount_table, src_resolved.device, src_resolved.handle, OpenMode::Read, now)?;
        let dst_description = open_files.open_description(cache, mount_table, dst_resolved.device, dst_resolved.handle, OpenMode::Write, now)?;

        loop {
            let chunk = open_files.read(cache, mount_table, src_description, BLOCK_SIZE as u32, now)?;
            if chunk.is_empty() {
                break;
            }
            open_files.write(cache, mount_table, dst_description, &chunk, now)?;
        }

        open_files.close(cache, mount_table, src_description)?;
        open_files.close(cache, mount_table, dst_description)?;
        Ok(())
    })();

    cache.put(mount_table, src_resolved.handle)?;
    cache.put(mount_table, dst_resolved.handle)?;
    result?;
    trace!("copied {src} -> {dst}");
    Ok(())
}

/// `mv(src, dst)` (`spec.md` §4.9): renames within a device via
/// [`link`]`+`[`unlink`], or copies across devices.
///
/// # Errors
///
/// Propagates [`link`]/[`unlink`]/[`cp`]'s errors.
pub fn mv(
    cache: &mut InodeCache,
    mount_table: &mut MountTable,
    open_files: &mut OpenFileTable,
    cwd: Resolved,
    src: &str,
    dst: &str,
    now: Time,
) -> Result<(), EngineError> {
    if let Ok(existing) = path::resolve(cache, mount_table, cwd, dst) {
        cache.put(mount_table, existing.handle)?;
        unlink(cache, mount_table, cwd, dst, true, now)?;
    }

    let src_resolved = path::resolve(cache, mount_table, cwd, src)?;
    let same_device = {
        let (dst_parent_path, _) = SplitPath::split_parent(dst);
        let dst_parent = path::resolve(cache, mount_table, cwd, &dst_parent_path)?;
        let same = dst_parent.device == src_resolved.device;
        cache.put(mount_table, dst_parent.handle)?;
        same
    };
    cache.put(mount_table, src_resolved.handle)?;

    if same_device {
        link(cache, mount_table, cwd, src, dst, true, now)?;
        unlink(cache, mount_table, cwd, src, true, now)?;
    } else {
        cp(cache, mount_table, open_files, cwd, src, dst, now)?;
        unlink(cache, mount_table, cwd, src, true, now)?;
    }
    trace!("moved {src} -> {dst}");
    Ok(())
}
