//! # Revlet
//!
//! A small single-user revision control system: content addressed blobs and
//! commits, a staging index, branches, and three-way merges of plain files in
//! one working directory.

mod hex;

/// A named file's contents at one point in time.
pub mod blob;
/// Immutable snapshots of every tracked file.
pub mod commit;
/// The `.rev` metadata directory.
pub mod dot_rev;
pub mod error;
/// Log, global log, find, and split point search.
pub mod graph;
pub mod merge;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`object_id::ObjectId`].
pub mod object_store;
pub mod repository;
/// Blobs staged for the next commit.
pub mod staging;
/// Branch table and staging index.
pub mod state;
pub mod status;
/// The files a repository versions.
pub mod worktree;

pub use error::{Error, Result};
pub use repository::Repository;
