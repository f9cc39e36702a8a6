//! Read-only walks over the commit graph.

use std::collections::BTreeSet;

use crate::{
    commit::Commit,
    error::{Error, Result},
    object_id::ObjectId,
    object_store::{InsertJson, ObjectKind, ObjectStore, Record},
};

/// The commits reachable from a starting commit by following parent links,
/// newest first. Stops for good after the root or after the first error.
pub struct History<'a, S> {
    store: &'a S,
    next: Option<ObjectId>,
}

pub fn history<S>(store: &S, from: ObjectId) -> History<'_, S> {
    History {
        store,
        next: Some(from),
    }
}

impl<'a, S> Iterator for History<'a, S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.store.read_json::<Commit>(id) {
            Ok(commit) => {
                self.next = commit.parent();
                Some(Ok(commit))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a, S> std::iter::FusedIterator for History<'a, S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
}

/// Every stored commit, reachable or not.
pub fn all_commits<S>(store: &S) -> Result<Vec<Commit>>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    store
        .list(ObjectKind::Commit)?
        .into_iter()
        .map(|id| store.read_json(id))
        .collect()
}

/// Ids of every stored commit whose message is exactly `message`.
pub fn find<S>(store: &S, message: &str) -> Result<Vec<ObjectId>>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    let mut found = Vec::new();
    for id in store.list(ObjectKind::Commit)? {
        let commit: Commit = store.read_json(id)?;
        if commit.message() == message {
            found.push(id);
        }
    }
    if found.is_empty() {
        return Err(Error::NoMatchingCommit);
    }
    Ok(found)
}

/// Resolves a full id or a unique prefix of one to a stored commit.
pub fn resolve_commit<S>(store: &S, reference: &str) -> Result<ObjectId>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    if let Ok(id) = reference.parse::<ObjectId>() {
        return if store.has(ObjectKind::Commit, id)? {
            Ok(id)
        } else {
            Err(Error::CommitNotFound)
        };
    }
    let reference = reference.to_ascii_lowercase();
    if reference.is_empty() || !reference.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::CommitNotFound);
    }
    let mut matches = store
        .list(ObjectKind::Commit)?
        .into_iter()
        .filter(|id| id.to_string().starts_with(&reference));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => {
            log::debug!("commit prefix {} is ambiguous", reference);
            Err(Error::CommitNotFound)
        }
        _ => Err(Error::CommitNotFound),
    }
}

/// The first commit on `a`'s parent chain that is also an ancestor of `b`.
///
/// Exact as long as every commit has at most one parent, which holds for
/// every history this crate writes.
pub fn lowest_common_ancestor<S>(store: &S, a: ObjectId, b: ObjectId) -> Result<Commit>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    let b_ancestors: BTreeSet<ObjectId> = history(store, b)
        .map(|commit| commit.map(|c| c.id()))
        .collect::<Result<_>>()?;
    for commit in history(store, a) {
        let commit = commit?;
        if b_ancestors.contains(&commit.id()) {
            return Ok(commit);
        }
    }
    Err(Error::NoCommonAncestor(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commit::ROOT_TIMESTAMP, object_store::in_memory::InMemoryObjectStore};

    /// Stores `messages` as a chain on top of `parent`, returning the commits newest last.
    fn chain(store: &mut InMemoryObjectStore, parent: &Commit, messages: &[&str]) -> Vec<Commit> {
        let mut parent = parent.clone();
        let mut out = Vec::new();
        for message in messages {
            let blob = ObjectId::digest([message.as_bytes()]);
            let mut tracked = parent.tracked().clone();
            tracked.insert(format!("{}.txt", message), blob);
            let commit = Commit::new(*message, ROOT_TIMESTAMP, parent.id(), "master", tracked);
            store.insert_json(&commit).unwrap();
            out.push(commit.clone());
            parent = commit;
        }
        out
    }

    fn rooted_store() -> (InMemoryObjectStore, Commit) {
        let mut store = InMemoryObjectStore::new();
        let root = Commit::root("master");
        store.insert_json(&root).unwrap();
        (store, root)
    }

    #[test]
    fn test_history_walks_to_root() {
        let (mut store, root) = rooted_store();
        let commits = chain(&mut store, &root, &["one", "two", "three"]);
        let log: Vec<Commit> = history(&store, commits[2].id())
            .collect::<Result<_>>()
            .unwrap();
        let messages: Vec<&str> = log.iter().map(|c| c.message()).collect();
        assert_eq!(messages, vec!["three", "two", "one", "initial commit"]);
        assert_eq!(log.last().unwrap().parent(), None);
        for pair in log.windows(2) {
            assert_eq!(pair[0].parent(), Some(pair[1].id()));
        }
    }

    #[test]
    fn test_history_stops_after_missing_commit() {
        let store = InMemoryObjectStore::new();
        let missing = ObjectId::digest([&b"nowhere"[..]]);
        let mut log = history(&store, missing);
        assert!(matches!(
            log.next(),
            Some(Err(Error::MissingObject(ObjectKind::Commit, _)))
        ));
        assert!(log.next().is_none());
    }

    #[test]
    fn test_find_and_global_log() {
        let (mut store, root) = rooted_store();
        chain(&mut store, &root, &["one", "two"]);
        let side = chain(&mut store, &root, &["two"]);
        assert_eq!(all_commits(&store).unwrap().len(), 4);
        let found = find(&store, "two").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&side[0].id()));
        assert!(matches!(find(&store, "zero"), Err(Error::NoMatchingCommit)));
    }

    #[test]
    fn test_lowest_common_ancestor() {
        let (mut store, root) = rooted_store();
        let trunk = chain(&mut store, &root, &["one", "two"]);
        let left = chain(&mut store, &trunk[1], &["left1", "left2"]);
        let right = chain(&mut store, &trunk[1], &["right1"]);

        let split = lowest_common_ancestor(&store, left[1].id(), right[0].id()).unwrap();
        assert_eq!(split.id(), trunk[1].id());
        let split = lowest_common_ancestor(&store, right[0].id(), left[1].id()).unwrap();
        assert_eq!(split.id(), trunk[1].id());

        // One side is an ancestor of the other.
        let split = lowest_common_ancestor(&store, trunk[0].id(), left[1].id()).unwrap();
        assert_eq!(split.id(), trunk[0].id());
        let split = lowest_common_ancestor(&store, left[1].id(), trunk[0].id()).unwrap();
        assert_eq!(split.id(), trunk[0].id());
    }

    #[test]
    fn test_resolve_commit() {
        let (mut store, root) = rooted_store();
        let commits = chain(&mut store, &root, &["one"]);
        let full = commits[0].id().to_string();
        assert_eq!(resolve_commit(&store, &full).unwrap(), commits[0].id());
        assert_eq!(
            resolve_commit(&store, &full[..12].to_uppercase()).unwrap(),
            commits[0].id()
        );
        assert!(matches!(resolve_commit(&store, "xyz"), Err(Error::CommitNotFound)));
        assert!(matches!(resolve_commit(&store, ""), Err(Error::CommitNotFound)));
        let absent = ObjectId::digest([&b"absent"[..]]).to_string();
        assert!(matches!(resolve_commit(&store, &absent), Err(Error::CommitNotFound)));
    }
}
