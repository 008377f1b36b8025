//! The running-user/process abstraction `spec.md` §1 names as an external
//! collaborator concern but still requires enough of (a cwd and a
//! per-process descriptor array) for the core to operate against.
//!
//! Grounded on `original_source/Process.hpp`: a process owns a current
//! working directory and a fixed-size file-descriptor array; this
//! simulator only ever runs one process (SPEC_FULL §3 `PROCESS_TABLE_SIZE
//! = 2`, leaving room for a second supervising process it never creates).

use crate::error::EngineError;
use crate::open_file::DescriptionHandle;
use crate::path::Resolved;
use crate::types::{Gid, Uid};

/// Number of descriptor slots in a process's file-descriptor array
/// (SPEC_FULL §3 `PROCESS_FILE_DESCRIPTORS`).
pub const PROCESS_FILE_DESCRIPTORS: usize = 16;

/// The uid/gid of the bootstrap process (SPEC_FULL §3 `SUPER_USER`).
pub const SUPER_USER: u32 = 0;

/// A running process: identity, current working directory, and open
/// descriptors.
pub struct Process {
    uid: Uid,
    gid: Gid,
    cwd: Resolved,
    descriptors: [Option<DescriptionHandle>; PROCESS_FILE_DESCRIPTORS],
}

impl Process {
    /// Creates the bootstrap process rooted at `cwd` (normally the
    /// filesystem root, acquired once at startup).
    #[must_use]
    pub const fn new(cwd: Resolved) -> Self {
        Self {
            uid: Uid(SUPER_USER),
            gid: Gid(SUPER_USER),
            cwd,
            descriptors: [None; PROCESS_FILE_DESCRIPTORS],
        }
    }

    /// This process's owning user ID.
    #[must_use]
    pub const fn uid(&self) -> Uid {
        self.uid
    }

    /// This process's owning group ID.
    #[must_use]
    pub const fn gid(&self) -> Gid {
        self.gid
    }

    /// The current working directory.
    #[must_use]
    pub const fn cwd(&self) -> Resolved {
        self.cwd
    }

    /// Replaces the current working directory. The caller is responsible
    /// for having released the previous one.
    pub fn set_cwd(&mut self, cwd: Resolved) {
        self.cwd = cwd;
    }

    /// Finds the lowest free descriptor slot.
    #[must_use]
    pub fn lowest_free_descriptor(&self) -> Option<usize> {
        self.descriptors.iter().position(Option::is_none)
    }

    /// Records `description` at `fd`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `fd` is out of range.
    pub fn install(&mut self, fd: usize, description: DescriptionHandle) -> Result<(), EngineError> {
        self.descriptors
            .get_mut(fd)
            .ok_or_else(|| EngineError::InvalidArgument(format!("descriptor {fd} out of range")))
            .map(|slot| *slot = Some(description))
    }

    /// Looks up the description at `fd`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `fd` is out of range or
    /// not currently open.
    pub fn descriptor(&self, fd: usize) -> Result<DescriptionHandle, EngineError> {
        self.descriptors
            .get(fd)
            .copied()
            .flatten()
            .ok_or_else(|| EngineError::InvalidArgument(format!("descriptor {fd} is not open")))
    }

    /// Clears descriptor `fd`, returning whatever description it held.
    pub fn clear(&mut self, fd: usize) -> Option<DescriptionHandle> {
        self.descriptors.get_mut(fd).and_then(Option::take)
    }

    /// Iterates over this process's open descriptors as `(fd, handle)`.
    pub fn open_descriptors(&self) -> impl Iterator<Item = (usize, DescriptionHandle)> + '_ {
        self.descriptors.iter().enumerate().filter_map(|(fd, d)| d.map(|h| (fd, h)))
    }
}

/// A bounded table of processes. This simulator only ever runs one, but
/// the table is sized per `original_source/main.hpp`'s
/// `PROCESS_TABLE_SIZE`, leaving room for a second without redesign.
pub struct ProcessTable {
    processes: Vec<Option<Process>>,
}

impl ProcessTable {
    /// Creates a table with `capacity` slots, all empty.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            processes: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Installs `process` into the first free slot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TableFull`] if every slot is in use.
    pub fn spawn(&mut self, process: Process) -> Result<usize, EngineError> {
        let slot = self
            .processes
            .iter()
            .position(Option::is_none)
            .ok_or(EngineError::TableFull("process table"))?;
        self.processes[slot] = Some(process);
        Ok(slot)
    }

    /// Borrows the process at `pid`.
    #[must_use]
    pub fn get(&self, pid: usize) -> Option<&Process> {
        self.processes.get(pid).and_then(Option::as_ref)
    }

    /// Mutably borrows the process at `pid`.
    #[must_use]
    pub fn get_mut(&mut self, pid: usize) -> Option<&mut Process> {
        self.processes.get_mut(pid).and_then(Option::as_mut)
    }
}
