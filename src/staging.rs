use std::{
    collections::BTreeSet,
    fs::{create_dir_all, read_dir, remove_file},
    path::PathBuf,
};

use crate::{
    blob::Blob,
    dot_rev::{read_json, write_json},
    error::{Error, Result},
    object_id::ObjectId,
    object_store::{ObjectKind, Record},
};

/// Blobs that have been added but not yet committed, one JSON file per blob id.
///
/// Unlike the object store, entries here are dropped again by [`StagingArea::retain`]
/// once the saved staging index stops referring to them.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: PathBuf) -> Result<Self> {
        if !root.try_exists()? {
            create_dir_all(&root)?;
        }
        Ok(StagingArea { root })
    }

    fn path(&self, id: ObjectId) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn stage(&self, blob: &Blob) -> Result<()> {
        log::debug!("staging {} as {}", blob.filename(), blob.id());
        write_json(blob, &self.path(blob.id()))
    }

    pub fn load(&self, id: ObjectId) -> Result<Blob> {
        let path = self.path(id);
        if !path.try_exists()? {
            return Err(Error::MissingObject(ObjectKind::Blob, id));
        }
        read_json(&path)
    }

    /// Deletes every staged blob whose id is not in `keep`.
    pub fn retain(&self, keep: &BTreeSet<ObjectId>) -> Result<()> {
        for entry in read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let kept = match entry.file_name().to_str().map(str::parse::<ObjectId>) {
                Some(Ok(id)) => keep.contains(&id),
                _ => false,
            };
            if !kept {
                log::debug!("dropping staged file {:?}", entry.file_name());
                remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

#[test]
fn test_stage_load() {
    let tempdir = tempfile::tempdir().unwrap();
    let staging = StagingArea::new(tempdir.path().join("staging")).unwrap();
    let blob = Blob::new("a.txt", b"x\n".to_vec());
    assert!(matches!(
        staging.load(blob.id()),
        Err(Error::MissingObject(ObjectKind::Blob, _))
    ));
    staging.stage(&blob).unwrap();
    assert_eq!(staging.load(blob.id()).unwrap(), blob);
}

#[test]
fn test_retain() {
    let tempdir = tempfile::tempdir().unwrap();
    let staging = StagingArea::new(tempdir.path().into()).unwrap();
    let a = Blob::new("a.txt", b"a".to_vec());
    let b = Blob::new("b.txt", b"b".to_vec());
    staging.stage(&a).unwrap();
    staging.stage(&b).unwrap();
    std::fs::write(tempdir.path().join("stray"), "junk").unwrap();

    staging.retain(&[a.id()].into()).unwrap();
    assert_eq!(staging.load(a.id()).unwrap(), a);
    assert!(staging.load(b.id()).is_err());
    assert_eq!(read_dir(tempdir.path()).unwrap().count(), 1);

    staging.retain(&BTreeSet::new()).unwrap();
    assert_eq!(read_dir(tempdir.path()).unwrap().count(), 0);
}
