use std::{
    fs::{create_dir_all, read_dir, File},
    io::{ErrorKind, Read, Write},
    path::PathBuf,
};

use crate::object_id::ObjectId;

use super::{ObjectKind, ObjectStore};

/// A persistent [`ObjectStore`] stored in a directory.
///
/// Each [`ObjectKind`] gets its own sub-directory. Inside it, the first two
/// hexadecimal characters of the [`ObjectId`] determine which directory to
/// place the record in, and the rest of the hexadecimal characters are the
/// file name.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.try_exists()? {
            log::info!("creating directory store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn path(&self, kind: ObjectKind, id: ObjectId) -> PathBuf {
        let s: String = format!("{}", id);
        let subdir: &str = &s[0..2];
        let filename: &str = &s[2..];
        self.root.join(kind.dir_name()).join(subdir).join(filename)
    }
}

impl ObjectStore for DirectoryObjectStore {
    type Error = std::io::Error;

    fn has(&self, kind: ObjectKind, id: ObjectId) -> Result<bool, Self::Error> {
        log::debug!("checking whether {} {} is contained in {:?}", kind, id, self.root);
        self.path(kind, id).try_exists()
    }

    fn read(&self, kind: ObjectKind, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} {} from {:?}", kind, id, self.root);
        match File::options().read(true).open(self.path(kind, id)) {
            Ok(mut f) => {
                let mut v = Vec::new();
                f.read_to_end(&mut v)?;
                Ok(Some(v))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn insert(
        &mut self,
        kind: ObjectKind,
        id: ObjectId,
        object: &[u8],
    ) -> Result<(), Self::Error> {
        let path = self.path(kind, id);
        if path.try_exists()? {
            log::debug!("{:?} already exists", path);
            return Ok(());
        }
        log::info!("inserting {} {} into {:?}", kind, id, self.root);
        if let Some(subdir_path) = path.parent() {
            create_dir_all(subdir_path)?;
        }
        let mut f = File::options().create_new(true).write(true).open(path)?;
        f.write_all(object)?;
        Ok(())
    }

    fn list(&self, kind: ObjectKind) -> Result<Vec<ObjectId>, Self::Error> {
        let kind_root = self.root.join(kind.dir_name());
        if !kind_root.try_exists()? {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for subdir in read_dir(&kind_root)? {
            let subdir = subdir?;
            if !subdir.file_type()?.is_dir() {
                continue;
            }
            let prefix = subdir.file_name().to_string_lossy().into_owned();
            for entry in read_dir(subdir.path())? {
                let rest = entry?.file_name().to_string_lossy().into_owned();
                match format!("{}{}", prefix, rest).parse::<ObjectId>() {
                    Ok(id) => ids.push(id),
                    Err(err) => log::warn!("skipping stray file in {:?}: {}", kind_root, err),
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("store")).unwrap();
    let id = ObjectId::digest([&b"hello, world"[..]]);
    store.insert(ObjectKind::Blob, id, b"hello, world").unwrap();
    assert!(store.has(ObjectKind::Blob, id).unwrap());
    assert!(!store.has(ObjectKind::Commit, id).unwrap());
    assert_eq!(
        store.read(ObjectKind::Blob, id).unwrap(),
        Some(Vec::from(&b"hello, world"[..]))
    );
    assert_eq!(store.read(ObjectKind::Commit, id).unwrap(), None);
}

#[test]
fn test_directory_object_store_insert_is_idempotent() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().into()).unwrap();
    let id = ObjectId::digest([&b"first"[..]]);
    store.insert(ObjectKind::Commit, id, b"first").unwrap();
    store.insert(ObjectKind::Commit, id, b"second").unwrap();
    assert_eq!(store.read(ObjectKind::Commit, id).unwrap(), Some(b"first".to_vec()));
}

#[test]
fn test_directory_object_store_list() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().into()).unwrap();
    assert!(store.list(ObjectKind::Commit).unwrap().is_empty());
    let mut ids: Vec<ObjectId> = (0u8..5)
        .map(|i| ObjectId::digest([&[i][..]]))
        .collect();
    for id in &ids {
        store.insert(ObjectKind::Commit, *id, b"{}").unwrap();
    }
    store
        .insert(ObjectKind::Blob, ObjectId::digest([&b"blob"[..]]), b"{}")
        .unwrap();
    ids.sort();
    assert_eq!(store.list(ObjectKind::Commit).unwrap(), ids);
    assert_eq!(store.list(ObjectKind::Blob).unwrap().len(), 1);
}
