//! A self-contained ext2 filesystem simulator: mounts real ext2 images as
//! files on the host and replays a small POSIX-like namespace on top of
//! them, one bootstrap process at a time.
//!
//! The modules below are layered bottom-up, each named after the component
//! of `spec.md` it implements:
//!
//! - [`types`] / [`error`] / [`permissions`] — shared scalars and the
//!   engine-wide error type.
//! - [`block_io`] / [`ondisk`] — raw 1024-byte block I/O and the on-disk
//!   struct layouts read out of them.
//! - [`arena`] — the generation-counted slot allocator every bounded table
//!   below is built on.
//! - [`device`] — a single mounted ext2 image: bitmaps, counters, inode and
//!   block I/O.
//! - [`inode_cache`] / [`mount_table`] — the process-wide caches that make
//!   cross-device references (mount point ↔ device root) safe to hold.
//! - [`block_map`] — logical-to-physical block translation and truncation.
//! - [`directory`] — directory-block entry iteration and mutation.
//! - [`path`] — path splitting and resolution, crossing mount points.
//! - [`open_file`] — the open-file-description table `read`/`write`/`seek` work against.
//! - [`process`] — the running process's cwd and descriptor array.
//! - [`namespace`] — the mutating filesystem operations (`creat`, `mkdir`, `link`, ...).
//! - [`simulator`] — top-level orchestration: bootstrapping, mounting, and
//!   every command-set operation, wired together.

pub mod arena;
pub mod block_io;
pub mod block_map;
pub mod device;
pub mod directory;
pub mod error;
pub mod inode_cache;
pub mod mount_table;
pub mod namespace;
pub mod ondisk;
pub mod open_file;
pub mod path;
pub mod permissions;
pub mod process;
pub mod simulator;
pub mod types;

pub use error::EngineError;
pub use simulator::Simulator;
