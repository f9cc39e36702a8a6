use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    commit::Commit,
    error::{Error, Result},
    object_id::ObjectId,
    object_store::Record,
};

/// The branch every repository starts on.
pub const DEFAULT_BRANCH: &str = "master";

/// Everything about a repository that changes between commands: the branch
/// table, which branch is checked out, and what is staged.
///
/// Invariants kept by every method:
/// - `branches[head] == head_commit`
/// - `staged` and `removed` never share a filename
/// - `snapshot` is the head commit's tracked files with `staged` laid over
///   them and `removed` taken out
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryState {
    head: String,
    branches: BTreeMap<String, ObjectId>,
    head_commit: ObjectId,
    staged: BTreeMap<String, ObjectId>,
    removed: BTreeSet<String>,
    snapshot: BTreeMap<String, ObjectId>,
}

impl RepositoryState {
    pub fn new(root: &Commit) -> Self {
        RepositoryState {
            head: DEFAULT_BRANCH.to_owned(),
            branches: [(DEFAULT_BRANCH.to_owned(), root.id())].into(),
            head_commit: root.id(),
            staged: BTreeMap::new(),
            removed: BTreeSet::new(),
            snapshot: root.tracked().clone(),
        }
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn head_commit(&self) -> ObjectId {
        self.head_commit
    }

    pub fn branches(&self) -> &BTreeMap<String, ObjectId> {
        &self.branches
    }

    pub fn branch(&self, name: &str) -> Option<ObjectId> {
        self.branches.get(name).copied()
    }

    pub fn staged(&self) -> &BTreeMap<String, ObjectId> {
        &self.staged
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn snapshot(&self) -> &BTreeMap<String, ObjectId> {
        &self.snapshot
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.staged.is_empty() || !self.removed.is_empty()
    }

    /// Stages `blob` for `filename`, cancelling any pending removal.
    /// Returns the blob that was staged for it before, if any.
    pub fn stage(
        &mut self,
        filename: &str,
        blob: ObjectId,
        head: &Commit,
    ) -> Option<ObjectId> {
        self.removed.remove(filename);
        let previous = self.staged.insert(filename.to_owned(), blob);
        self.refresh_snapshot(head);
        previous
    }

    /// Drops `filename` from the staging index, returning the blob it had staged.
    pub fn unstage(&mut self, filename: &str, head: &Commit) -> Option<ObjectId> {
        let previous = self.staged.remove(filename);
        self.refresh_snapshot(head);
        previous
    }

    /// Marks `filename` for removal in the next commit. Returns the blob that
    /// was staged for it, if any, since a removal replaces a staged addition.
    pub fn mark_removed(&mut self, filename: &str, head: &Commit) -> Option<ObjectId> {
        let previous = self.staged.remove(filename);
        self.removed.insert(filename.to_owned());
        self.refresh_snapshot(head);
        previous
    }

    pub fn unmark_removed(&mut self, filename: &str, head: &Commit) {
        if self.removed.remove(filename) {
            self.refresh_snapshot(head);
        }
    }

    fn refresh_snapshot(&mut self, head: &Commit) {
        let mut snapshot = head.tracked().clone();
        for name in &self.removed {
            snapshot.remove(name);
        }
        snapshot.extend(self.staged.iter().map(|(k, v)| (k.clone(), *v)));
        self.snapshot = snapshot;
    }

    pub fn create_branch(&mut self, name: &str) -> Result<()> {
        if self.branches.contains_key(name) {
            return Err(Error::BranchExists);
        }
        log::info!("creating branch {} at {}", name, self.head_commit);
        self.branches.insert(name.to_owned(), self.head_commit);
        Ok(())
    }

    pub fn remove_branch(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(Error::NoSuchBranch);
        }
        if name == self.head {
            return Err(Error::CannotRemoveCurrentBranch);
        }
        log::info!("removing branch {}", name);
        self.branches.remove(name);
        Ok(())
    }

    /// Points the checked out branch at `commit` and empties the staging index.
    pub fn move_head_to(&mut self, commit: &Commit) {
        log::info!("moving {} to {}", self.head, commit.id());
        self.branches.insert(self.head.clone(), commit.id());
        self.head_commit = commit.id();
        self.staged.clear();
        self.removed.clear();
        self.snapshot = commit.tracked().clone();
    }

    /// Checks out `branch`, whose tip is `commit`, and empties the staging index.
    pub fn switch_branch(&mut self, branch: &str, commit: &Commit) {
        debug_assert_eq!(self.branch(branch), Some(commit.id()));
        log::info!("switching from {} to {}", self.head, branch);
        self.head = branch.to_owned();
        self.move_head_to(commit);
    }

    /// Whether every invariant holds, given the current head commit.
    pub fn is_consistent(&self, head: &Commit) -> bool {
        let mut expected = head.tracked().clone();
        for name in &self.removed {
            expected.remove(name);
        }
        expected.extend(self.staged.iter().map(|(k, v)| (k.clone(), *v)));
        self.branch(&self.head) == Some(self.head_commit)
            && head.id() == self.head_commit
            && self.staged.keys().all(|name| !self.removed.contains(name))
            && self.snapshot == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::ROOT_TIMESTAMP;

    fn blob(name: &str, contents: &str) -> ObjectId {
        ObjectId::digest([name.as_bytes(), contents.as_bytes(), &b"blob"[..]])
    }

    #[test]
    fn test_new_state() {
        let root = Commit::root(DEFAULT_BRANCH);
        let state = RepositoryState::new(&root);
        assert_eq!(state.head(), DEFAULT_BRANCH);
        assert_eq!(state.head_commit(), root.id());
        assert!(!state.has_pending_changes());
        assert!(state.is_consistent(&root));
    }

    #[test]
    fn test_staging_and_removal_stay_disjoint() {
        let root = Commit::root(DEFAULT_BRANCH);
        let head = Commit::new(
            "one",
            ROOT_TIMESTAMP,
            root.id(),
            DEFAULT_BRANCH,
            [("a.txt".to_owned(), blob("a.txt", "x"))].into(),
        );
        let mut state = RepositoryState::new(&root);
        state.move_head_to(&head);

        state.stage("a.txt", blob("a.txt", "y"), &head);
        assert_eq!(state.snapshot().get("a.txt"), Some(&blob("a.txt", "y")));

        let unstaged = state.mark_removed("a.txt", &head);
        assert_eq!(unstaged, Some(blob("a.txt", "y")));
        assert!(state.staged().is_empty());
        assert!(state.snapshot().is_empty());
        assert!(state.is_consistent(&head));

        state.stage("a.txt", blob("a.txt", "z"), &head);
        assert!(state.removed().is_empty());
        assert!(state.is_consistent(&head));

        state.unstage("a.txt", &head);
        assert_eq!(state.snapshot().get("a.txt"), Some(&blob("a.txt", "x")));
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_branch_table() {
        let root = Commit::root(DEFAULT_BRANCH);
        let mut state = RepositoryState::new(&root);
        state.create_branch("feature").unwrap();
        assert!(matches!(state.create_branch("feature"), Err(Error::BranchExists)));
        assert!(matches!(
            state.remove_branch(DEFAULT_BRANCH),
            Err(Error::CannotRemoveCurrentBranch)
        ));
        assert!(matches!(state.remove_branch("nope"), Err(Error::NoSuchBranch)));
        state.remove_branch("feature").unwrap();
        assert_eq!(state.branches().len(), 1);
    }

    #[test]
    fn test_switch_branch_clears_staging() {
        let root = Commit::root(DEFAULT_BRANCH);
        let mut state = RepositoryState::new(&root);
        state.create_branch("feature").unwrap();
        state.stage("a.txt", blob("a.txt", "x"), &root);
        state.switch_branch("feature", &root);
        assert_eq!(state.head(), "feature");
        assert!(!state.has_pending_changes());
        assert!(state.is_consistent(&root));
    }
}
