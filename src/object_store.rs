use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{self, Error},
    object_id::ObjectId,
};

pub mod directory;
pub mod in_memory;

/// The two families of records kept in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Blob,
    Commit,
}

impl ObjectKind {
    /// Name of the sub-directory a [`directory::DirectoryObjectStore`] uses for this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blobs",
            ObjectKind::Commit => "commits",
        }
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Blob => f.write_str("blob"),
            ObjectKind::Commit => f.write_str("commit"),
        }
    }
}

/// Append-only storage of immutable records, each keyed by the id derived from its own content.
///
/// Records are never updated or deleted.
pub trait ObjectStore {
    type Error;

    fn has(&self, kind: ObjectKind, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, kind: ObjectKind, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `object` under `id`. Inserting an id that is already present does nothing.
    fn insert(&mut self, kind: ObjectKind, id: ObjectId, object: &[u8])
        -> Result<(), Self::Error>;

    /// Every id of the given kind, in ascending order.
    fn list(&self, kind: ObjectKind) -> Result<Vec<ObjectId>, Self::Error>;
}

/// A record that knows its own kind and id.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: ObjectKind;

    fn id(&self) -> ObjectId;
}

/// A convenience trait for writing and reading JSON encoded [`Record`]s from any [`ObjectStore`].
pub trait InsertJson {
    /// Inserts a pretty JSON encoded version of the record into the store.
    fn insert_json<R: Record>(&mut self, record: &R) -> error::Result<ObjectId>;

    /// Reads a JSON encoded record of the given type from the store at that given [`ObjectId`].
    fn read_json<R: Record>(&self, id: ObjectId) -> error::Result<R>;
}

impl<S> InsertJson for S
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn insert_json<R: Record>(&mut self, record: &R) -> error::Result<ObjectId> {
        let id = record.id();
        self.insert(R::KIND, id, &serde_json::to_vec_pretty(record)?)?;
        Ok(id)
    }

    fn read_json<R: Record>(&self, id: ObjectId) -> error::Result<R> {
        match self.read(R::KIND, id)? {
            None => Err(Error::MissingObject(R::KIND, id)),
            Some(obj) => Ok(serde_json::from_slice(&obj)?),
        }
    }
}
