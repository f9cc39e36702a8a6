use std::{collections::BTreeMap, convert::Infallible};

use crate::object_id::ObjectId;

use super::{ObjectKind, ObjectStore};

#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<(ObjectKind, ObjectId), Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = Infallible;

    fn has(&self, kind: ObjectKind, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.contains_key(&(kind, id)))
    }

    fn read(&self, kind: ObjectKind, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.objects.get(&(kind, id)).cloned())
    }

    fn insert(
        &mut self,
        kind: ObjectKind,
        id: ObjectId,
        object: &[u8],
    ) -> Result<(), Self::Error> {
        self.objects
            .entry((kind, id))
            .or_insert_with(|| Vec::from(object));
        Ok(())
    }

    fn list(&self, kind: ObjectKind) -> Result<Vec<ObjectId>, Self::Error> {
        Ok(self
            .objects
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
            .collect())
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let id = ObjectId::digest([&b"hello, world"[..]]);
    store.insert(ObjectKind::Blob, id, b"hello, world").unwrap();
    store.insert(ObjectKind::Blob, id, b"ignored").unwrap();
    assert!(store.has(ObjectKind::Blob, id).unwrap());
    assert!(!store.has(ObjectKind::Commit, id).unwrap());
    assert_eq!(
        store.read(ObjectKind::Blob, id).unwrap(),
        Some(Vec::from(&b"hello, world"[..]))
    );
    assert_eq!(store.list(ObjectKind::Blob).unwrap(), vec![id]);
    assert!(store.list(ObjectKind::Commit).unwrap().is_empty());
}
