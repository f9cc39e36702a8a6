use serde::{Deserialize, Serialize};

use crate::{
    object_id::ObjectId,
    object_store::{ObjectKind, Record},
};

/// The bytes of one named file at one point in time.
///
/// The id covers the filename as well as the contents, so the same bytes
/// under two names are two distinct blobs.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    id: ObjectId,
    filename: String,
    #[serde(with = "crate::hex::bytes")]
    contents: Vec<u8>,
}

impl Blob {
    pub fn new(filename: impl Into<String>, contents: Vec<u8>) -> Self {
        let filename = filename.into();
        let id = ObjectId::digest([filename.as_bytes(), contents.as_slice(), &b"blob"[..]]);
        Blob {
            id,
            filename,
            contents,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl Record for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;

    fn id(&self) -> ObjectId {
        self.id
    }
}

#[test]
fn test_blob_ids_are_filename_scoped() {
    let a = Blob::new("a.txt", b"same".to_vec());
    let b = Blob::new("b.txt", b"same".to_vec());
    let a_again = Blob::new("a.txt", b"same".to_vec());
    let a_edited = Blob::new("a.txt", b"different".to_vec());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.id(), a_again.id());
    assert_ne!(a.id(), a_edited.id());
}

#[test]
fn test_blob_json() {
    let blob = Blob::new("a.txt", vec![0, 159, 146, 150, b'\n']);
    let json = serde_json::to_string(&blob).unwrap();
    assert!(json.contains("\"009f92960a\""));
    let back: Blob = serde_json::from_str(&json).unwrap();
    assert_eq!(back, blob);
}
