//! Three-way merge of another branch into the checked out one.
//!
//! Every file is compared across three snapshots: the split point (the
//! branches' lowest common ancestor), the head commit, and the other
//! branch's tip. A side "modified" a file if its blob id, or the file's
//! presence, differs from the split point.
//!
//! | current    | given      | result                               |
//! |------------|------------|--------------------------------------|
//! | unmodified | modified   | take given's version, or delete it   |
//! | modified   | unmodified | keep current                         |
//! | modified   | modified   | conflict, unless both agree          |

use std::collections::BTreeSet;

use crate::{
    commit::Commit,
    error::{Error, Result},
    graph,
    object_id::ObjectId,
    object_store::{ObjectStore, Record},
    repository::Repository,
};

/// What the merge does to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    /// Check out the given branch's blob and stage it.
    Take { filename: String, blob: ObjectId },
    /// Delete the file and stage its removal.
    Remove { filename: String },
    /// Both sides changed the file differently since the split point.
    Conflict {
        filename: String,
        current: Option<ObjectId>,
        given: Option<ObjectId>,
    },
}

/// The result of a merge that got as far as committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub commit: ObjectId,
    /// Files written with conflict markers, in filename order.
    pub conflicts: Vec<String>,
}

impl MergeOutcome {
    pub fn had_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Classifies every file known to any of the three commits, in filename order.
/// Files needing no change are left out.
pub fn plan(split: &Commit, current: &Commit, given: &Commit) -> Vec<MergeAction> {
    let names: BTreeSet<&String> = split
        .tracked()
        .keys()
        .chain(current.tracked().keys())
        .chain(given.tracked().keys())
        .collect();
    names
        .into_iter()
        .filter_map(|name| {
            classify(
                name,
                split.blob_of(name),
                current.blob_of(name),
                given.blob_of(name),
            )
        })
        .collect()
}

fn classify(
    filename: &str,
    split: Option<ObjectId>,
    current: Option<ObjectId>,
    given: Option<ObjectId>,
) -> Option<MergeAction> {
    if current == given {
        return None;
    }
    let current_modified = current != split;
    let given_modified = given != split;
    let action = match (current_modified, given_modified) {
        (false, _) => match given {
            Some(blob) => MergeAction::Take {
                filename: filename.to_owned(),
                blob,
            },
            None => MergeAction::Remove {
                filename: filename.to_owned(),
            },
        },
        (true, false) => return None,
        (true, true) => MergeAction::Conflict {
            filename: filename.to_owned(),
            current,
            given,
        },
    };
    log::debug!("merge: {:?}", action);
    Some(action)
}

/// The file written in place of a conflict.
pub fn conflict_contents(current: &[u8], given: &[u8]) -> Vec<u8> {
    fn section(out: &mut Vec<u8>, contents: &[u8]) {
        out.extend_from_slice(contents);
        if !contents.is_empty() && !contents.ends_with(b"\n") {
            out.push(b'\n');
        }
    }

    let mut out = Vec::with_capacity(current.len() + given.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    section(&mut out, current);
    out.extend_from_slice(b"=======\n");
    section(&mut out, given);
    out.extend_from_slice(b">>>>>>>\n");
    out
}

impl<S> Repository<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    /// Merges `given_branch` into the checked out branch and commits the result.
    ///
    /// Content conflicts do not stop the merge: they are written with markers,
    /// staged, committed, and listed in the [`MergeOutcome`].
    pub fn merge(&mut self, given_branch: &str) -> Result<MergeOutcome> {
        if self.state.has_pending_changes() {
            return Err(Error::UncommittedChanges);
        }
        let given_id = self
            .state
            .branch(given_branch)
            .ok_or(Error::NoSuchBranch)?;
        if given_branch == self.state.head() {
            return Err(Error::SelfMerge);
        }
        let split = graph::lowest_common_ancestor(&self.store, given_id, self.state.head_commit())?;
        if split.id() == given_id {
            return Err(Error::GivenIsAncestor);
        }
        if split.id() == self.state.head_commit() {
            return Err(Error::FastForwarded);
        }

        let current = self.head_commit()?;
        let given = self.commit_by_id(given_id)?;
        self.check_untracked(&given)?;

        let mut writes = Vec::new();
        let mut removals = Vec::new();
        let mut conflicts = Vec::new();
        for action in plan(&split, &current, &given) {
            match action {
                MergeAction::Take { filename, blob } => {
                    let blob = self.blob_by_id(blob)?;
                    writes.push((filename, blob.contents().to_vec()));
                }
                MergeAction::Remove { filename } => removals.push(filename),
                MergeAction::Conflict {
                    filename,
                    current,
                    given,
                } => {
                    let current = self.optional_contents(current)?;
                    let given = self.optional_contents(given)?;
                    writes.push((filename.clone(), conflict_contents(&current, &given)));
                    conflicts.push(filename);
                }
            }
        }

        for (filename, contents) in &writes {
            self.work_tree.write(filename, contents)?;
            self.add(filename)?;
        }
        for filename in &removals {
            self.work_tree.remove(filename)?;
            self.state.mark_removed(filename, &current);
        }
        for filename in &conflicts {
            log::warn!("merge conflict in {}", filename);
        }

        let message = format!("Merged {} into {}.", given_branch, self.state.head());
        let commit = self.commit(&message)?;
        log::info!("merged {} into {} as {}", given_branch, self.state.head(), commit);
        Ok(MergeOutcome { commit, conflicts })
    }

    fn optional_contents(&self, blob: Option<ObjectId>) -> Result<Vec<u8>> {
        match blob {
            Some(id) => Ok(self.blob_by_id(id)?.contents().to_vec()),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob::Blob,
        commit::ROOT_TIMESTAMP,
        repository::tests::{assert_consistent, read, scratch, write},
    };

    fn blob(name: &str, contents: &str) -> Option<ObjectId> {
        Some(Blob::new(name, contents.as_bytes().to_vec()).id())
    }

    fn commit(files: &[(&str, &str)]) -> Commit {
        let root = Commit::root("master");
        let tracked = files
            .iter()
            .map(|(name, contents)| (name.to_string(), Blob::new(*name, contents.as_bytes().to_vec()).id()))
            .collect();
        Commit::new("test", ROOT_TIMESTAMP, root.id(), "master", tracked)
    }

    #[test]
    fn test_classify() {
        let s = blob("f", "base");
        let c = blob("f", "ours");
        let g = blob("f", "theirs");
        let take = |blob| Some(MergeAction::Take { filename: "f".to_owned(), blob });
        let remove = Some(MergeAction::Remove { filename: "f".to_owned() });
        let conflict = |current, given| {
            Some(MergeAction::Conflict {
                filename: "f".to_owned(),
                current,
                given,
            })
        };

        // Already gone on both sides.
        assert_eq!(classify("f", s, None, None), None);
        // Untouched everywhere.
        assert_eq!(classify("f", s, s, s), None);
        // Only the given branch changed it.
        assert_eq!(classify("f", s, s, g), take(g.unwrap()));
        // Only the current branch changed it.
        assert_eq!(classify("f", s, c, s), None);
        // Both changed it differently.
        assert_eq!(classify("f", s, c, g), conflict(c, g));
        // Both changed it the same way.
        assert_eq!(classify("f", s, g, g), None);
        // Given deleted an untouched file.
        assert_eq!(classify("f", s, s, None), remove);
        // Current deleted an untouched file.
        assert_eq!(classify("f", s, None, s), None);
        // One side deleted, the other modified.
        assert_eq!(classify("f", s, None, g), conflict(None, g));
        assert_eq!(classify("f", s, c, None), conflict(c, None));
        // Added only in given, only in current, in both.
        assert_eq!(classify("f", None, None, g), take(g.unwrap()));
        assert_eq!(classify("f", None, c, None), None);
        assert_eq!(classify("f", None, c, g), conflict(c, g));
        assert_eq!(classify("f", None, g, g), None);
    }

    #[test]
    fn test_plan_orders_by_filename() {
        let split = commit(&[("a", "1"), ("b", "1"), ("c", "1")]);
        let current = commit(&[("a", "1"), ("b", "2"), ("c", "1")]);
        let given = commit(&[("a", "3"), ("b", "1"), ("d", "new")]);
        let actions = plan(&split, &current, &given);
        assert_eq!(
            actions,
            vec![
                MergeAction::Take {
                    filename: "a".to_owned(),
                    blob: blob("a", "3").unwrap()
                },
                MergeAction::Remove {
                    filename: "c".to_owned()
                },
                MergeAction::Take {
                    filename: "d".to_owned(),
                    blob: blob("d", "new").unwrap()
                },
            ]
        );
    }

    #[test]
    fn test_conflict_contents() {
        assert_eq!(
            conflict_contents(b"x\n", b"y\n"),
            b"<<<<<<< HEAD\nx\n=======\ny\n>>>>>>>\n".to_vec()
        );
        assert_eq!(
            conflict_contents(b"x", b""),
            b"<<<<<<< HEAD\nx\n=======\n>>>>>>>\n".to_vec()
        );
    }

    #[test]
    fn test_merge_preconditions() {
        let (dir, mut repo) = scratch();
        write(&dir, "a.txt", "x\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();
        repo.branch("feature").unwrap();

        assert!(matches!(repo.merge("nope"), Err(Error::NoSuchBranch)));
        assert!(matches!(repo.merge("master"), Err(Error::SelfMerge)));
        // Same commit on both: the given branch is its own split point.
        assert!(matches!(repo.merge("feature"), Err(Error::GivenIsAncestor)));

        write(&dir, "a.txt", "y\n");
        repo.add("a.txt").unwrap();
        assert!(matches!(repo.merge("feature"), Err(Error::UncommittedChanges)));
        repo.commit("second").unwrap();

        let head = repo.state().head_commit();
        assert!(matches!(repo.merge("feature"), Err(Error::GivenIsAncestor)));
        repo.checkout_branch("feature").unwrap();
        assert!(matches!(repo.merge("master"), Err(Error::FastForwarded)));
        assert_eq!(repo.state().branch("master"), Some(head));
        assert_eq!(repo.global_log().unwrap().len(), 3);
    }

    #[test]
    fn test_merge_takes_given_changes() {
        let (dir, mut repo) = scratch();
        write(&dir, "a.txt", "x\n");
        write(&dir, "gone.txt", "g\n");
        write(&dir, "mine.txt", "m\n");
        for name in ["a.txt", "gone.txt", "mine.txt"] {
            repo.add(name).unwrap();
        }
        repo.commit("base").unwrap();
        repo.branch("feature").unwrap();

        write(&dir, "mine.txt", "m2\n");
        repo.add("mine.txt").unwrap();
        repo.commit("master edit").unwrap();

        repo.checkout_branch("feature").unwrap();
        write(&dir, "a.txt", "y\n");
        write(&dir, "new.txt", "n\n");
        repo.add("a.txt").unwrap();
        repo.add("new.txt").unwrap();
        repo.rm("gone.txt").unwrap();
        repo.commit("feature edit").unwrap();
        repo.checkout_branch("master").unwrap();

        let outcome = repo.merge("feature").unwrap();
        assert!(!outcome.had_conflicts());
        let merged = repo.head_commit().unwrap();
        assert_eq!(merged.id(), outcome.commit);
        assert_eq!(merged.message(), "Merged feature into master.");
        assert_eq!(merged.blob_of("a.txt"), blob("a.txt", "y\n"));
        assert_eq!(merged.blob_of("new.txt"), blob("new.txt", "n\n"));
        assert_eq!(merged.blob_of("mine.txt"), blob("mine.txt", "m2\n"));
        assert_eq!(merged.blob_of("gone.txt"), None);
        assert_eq!(read(&dir, "a.txt").as_deref(), Some("y\n"));
        assert_eq!(read(&dir, "gone.txt"), None);
        assert!(!repo.state().has_pending_changes());
        assert_consistent(&repo);
    }

    #[test]
    fn test_merge_conflict_is_committed() {
        let (dir, mut repo) = scratch();
        write(&dir, "a.txt", "x\n");
        repo.add("a.txt").unwrap();
        repo.commit("base").unwrap();
        repo.branch("feature").unwrap();

        write(&dir, "a.txt", "ours\n");
        repo.add("a.txt").unwrap();
        repo.commit("master edit").unwrap();
        repo.checkout_branch("feature").unwrap();
        write(&dir, "a.txt", "theirs\n");
        repo.add("a.txt").unwrap();
        repo.commit("feature edit").unwrap();
        repo.checkout_branch("master").unwrap();

        let outcome = repo.merge("feature").unwrap();
        assert_eq!(outcome.conflicts, vec!["a.txt".to_owned()]);
        let expected = "<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>>\n";
        assert_eq!(read(&dir, "a.txt").as_deref(), Some(expected));
        let merged = repo.head_commit().unwrap();
        assert_eq!(merged.blob_of("a.txt"), blob("a.txt", expected));
        assert_eq!(merged.parent(), Some(repo.log().nth(1).unwrap().unwrap().id()));
    }

    #[test]
    fn test_merge_refuses_to_clobber_untracked() {
        let (dir, mut repo) = scratch();
        write(&dir, "a.txt", "x\n");
        repo.add("a.txt").unwrap();
        repo.commit("base").unwrap();
        repo.branch("feature").unwrap();
        write(&dir, "a.txt", "y\n");
        repo.add("a.txt").unwrap();
        repo.commit("master edit").unwrap();
        repo.checkout_branch("feature").unwrap();
        write(&dir, "b.txt", "feature\n");
        repo.add("b.txt").unwrap();
        repo.commit("feature add").unwrap();
        repo.checkout_branch("master").unwrap();

        write(&dir, "b.txt", "precious\n");
        let before = repo.state().clone();
        assert!(matches!(repo.merge("feature"), Err(Error::UntrackedFileConflict)));
        assert_eq!(read(&dir, "b.txt").as_deref(), Some("precious\n"));
        assert_eq!(repo.state(), &before);
    }
}
