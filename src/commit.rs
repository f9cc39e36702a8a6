use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    object_id::ObjectId,
    object_store::{ObjectKind, Record},
};

/// Message of the commit every repository starts from.
pub const ROOT_MESSAGE: &str = "initial commit";
/// Timestamp of the root commit, so its id is the same in every repository.
pub const ROOT_TIMESTAMP: &str = "Wed Dec 31 16:00:00 1969 -0800";
/// [`chrono`] format of every other commit's timestamp.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

/// A full snapshot of the tracked files, linked to the commit it was made on top of.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    id: ObjectId,
    /// The message added with the commit.
    message: String,
    timestamp: String,
    /// The previous [`Commit`]'s [`ObjectId`], absent only for the root.
    parent: Option<ObjectId>,
    /// The branch that was checked out when the commit was made.
    branch: String,
    /// Every tracked filename and the [`crate::blob::Blob`] holding its contents.
    tracked: BTreeMap<String, ObjectId>,
}

impl Commit {
    /// The parentless commit a new repository starts on.
    pub fn root(branch: impl Into<String>) -> Self {
        let id = ObjectId::digest([
            &b"commit"[..],
            ROOT_TIMESTAMP.as_bytes(),
            ROOT_MESSAGE.as_bytes(),
        ]);
        Commit {
            id,
            message: ROOT_MESSAGE.to_owned(),
            timestamp: ROOT_TIMESTAMP.to_owned(),
            parent: None,
            branch: branch.into(),
            tracked: BTreeMap::new(),
        }
    }

    /// Takes ownership of `tracked`; later changes to the caller's staging
    /// state cannot reach this snapshot.
    pub fn new(
        message: impl Into<String>,
        timestamp: impl Into<String>,
        parent: ObjectId,
        branch: impl Into<String>,
        tracked: BTreeMap<String, ObjectId>,
    ) -> Self {
        let message = message.into();
        let timestamp = timestamp.into();
        let parent_string = parent.to_string();
        let id = ObjectId::digest([
            message.as_bytes(),
            timestamp.as_bytes(),
            tracked_string(&tracked).as_bytes(),
            parent_string.as_bytes(),
            &b"commit"[..],
        ]);
        Commit {
            id,
            message,
            timestamp,
            parent: Some(parent),
            branch: branch.into(),
            tracked,
        }
    }

    /// The current local time in [`TIMESTAMP_FORMAT`].
    pub fn timestamp_now() -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tracked(&self) -> &BTreeMap<String, ObjectId> {
        &self.tracked
    }

    pub fn blob_of(&self, filename: &str) -> Option<ObjectId> {
        self.tracked.get(filename).copied()
    }
}

impl Record for Commit {
    const KIND: ObjectKind = ObjectKind::Commit;

    fn id(&self) -> ObjectId {
        self.id
    }
}

fn tracked_string(tracked: &BTreeMap<String, ObjectId>) -> String {
    let entries: Vec<String> = tracked
        .iter()
        .map(|(name, id)| format!("{}={}", name, id))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[test]
fn test_root_commit_is_reproducible() {
    let a = Commit::root("master");
    let b = Commit::root("master");
    assert_eq!(a.id(), b.id());
    assert_eq!(a.parent(), None);
    assert_eq!(a.message(), ROOT_MESSAGE);
    assert!(a.tracked().is_empty());
}

#[test]
fn test_commit_id_covers_snapshot() {
    let root = Commit::root("master");
    let blob = ObjectId::digest([&b"a.txt"[..], &b"x"[..], &b"blob"[..]]);
    let other = ObjectId::digest([&b"a.txt"[..], &b"y"[..], &b"blob"[..]]);
    let ts = ROOT_TIMESTAMP;
    let one = Commit::new("m", ts, root.id(), "master", [("a.txt".to_owned(), blob)].into());
    let two = Commit::new("m", ts, root.id(), "master", [("a.txt".to_owned(), other)].into());
    let three = Commit::new("m", ts, root.id(), "master", [("a.txt".to_owned(), blob)].into());
    assert_ne!(one.id(), two.id());
    assert_eq!(one.id(), three.id());
    assert_eq!(one.parent(), Some(root.id()));
}

#[test]
fn test_tracked_string() {
    let id = ObjectId::digest([&b"x"[..]]);
    assert_eq!(tracked_string(&BTreeMap::new()), "{}");
    let tracked: BTreeMap<String, ObjectId> =
        [("b".to_owned(), id), ("a".to_owned(), id)].into();
    assert_eq!(tracked_string(&tracked), format!("{{a={id}, b={id}}}"));
}

#[test]
fn test_timestamp_format_is_fixed_width() {
    let now = Commit::timestamp_now();
    assert_eq!(now.len(), ROOT_TIMESTAMP.len());
    assert!(chrono::DateTime::parse_from_str(&now, TIMESTAMP_FORMAT).is_ok());
    assert!(chrono::DateTime::parse_from_str(ROOT_TIMESTAMP, TIMESTAMP_FORMAT).is_ok());
}
