use std::{collections::BTreeSet, path::Path};

use crate::{
    blob::Blob,
    commit::Commit,
    dot_rev::DotRev,
    error::{Error, Result},
    graph::{self, History},
    object_id::ObjectId,
    object_store::{directory::DirectoryObjectStore, InsertJson, ObjectStore, Record},
    staging::StagingArea,
    state::{RepositoryState, DEFAULT_BRANCH},
    worktree::{validate_filename, WorkTree},
};

/// A working directory together with its `.rev` metadata.
///
/// Every command opens one of these, runs against it, and calls
/// [`Repository::save`] only if it succeeded. Commits and blobs are read from
/// the [`ObjectStore`] on demand; only the [`RepositoryState`] is held in memory.
pub struct Repository<S = DirectoryObjectStore> {
    pub(crate) dot_rev: DotRev,
    pub(crate) work_tree: WorkTree,
    pub(crate) staging: StagingArea,
    pub(crate) store: S,
    pub(crate) state: RepositoryState,
}

impl Repository<DirectoryObjectStore> {
    /// Creates `.rev` in `work_dir` with a root commit on `master`.
    pub fn init(work_dir: &Path) -> Result<Self> {
        let dot_rev = DotRev::locate(work_dir);
        dot_rev.create()?;
        let store = DirectoryObjectStore::new(dot_rev.store_dir())?;
        Self::init_in(dot_rev, work_dir, store)
    }

    pub fn open(work_dir: &Path) -> Result<Self> {
        let dot_rev = DotRev::existing(work_dir)?;
        let store = DirectoryObjectStore::new(dot_rev.store_dir())?;
        Self::open_in(dot_rev, work_dir, store)
    }
}

impl<S> Repository<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    /// Like [`Repository::init`], keeping commits and blobs in `store` instead of under `.rev`.
    pub fn init_with_store(work_dir: &Path, store: S) -> Result<Self> {
        let dot_rev = DotRev::locate(work_dir);
        dot_rev.create()?;
        Self::init_in(dot_rev, work_dir, store)
    }

    /// Like [`Repository::open`], reading commits and blobs from `store`.
    pub fn open_with_store(work_dir: &Path, store: S) -> Result<Self> {
        let dot_rev = DotRev::existing(work_dir)?;
        Self::open_in(dot_rev, work_dir, store)
    }

    fn init_in(dot_rev: DotRev, work_dir: &Path, mut store: S) -> Result<Self> {
        let root = Commit::root(DEFAULT_BRANCH);
        store.insert_json(&root)?;
        let repo = Repository {
            work_tree: WorkTree::new(work_dir.to_path_buf(), dot_rev.ignores()?),
            staging: StagingArea::new(dot_rev.staging_dir())?,
            state: RepositoryState::new(&root),
            dot_rev,
            store,
        };
        repo.save()?;
        log::info!("initialized repository in {:?}", work_dir);
        Ok(repo)
    }

    fn open_in(dot_rev: DotRev, work_dir: &Path, store: S) -> Result<Self> {
        Ok(Repository {
            work_tree: WorkTree::new(work_dir.to_path_buf(), dot_rev.ignores()?),
            staging: StagingArea::new(dot_rev.staging_dir())?,
            state: dot_rev.read_state()?,
            dot_rev,
            store,
        })
    }

    /// Writes the branch table and staging index back to `.rev`, then drops
    /// staged blob files the saved index no longer refers to.
    pub fn save(&self) -> Result<()> {
        self.dot_rev.write_state(&self.state)?;
        let keep: BTreeSet<ObjectId> = self.state.staged().values().copied().collect();
        self.staging.retain(&keep)
    }

    pub fn state(&self) -> &RepositoryState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn work_tree(&self) -> &WorkTree {
        &self.work_tree
    }

    pub fn commit_by_id(&self, id: ObjectId) -> Result<Commit> {
        self.store.read_json(id)
    }

    pub fn head_commit(&self) -> Result<Commit> {
        self.commit_by_id(self.state.head_commit())
    }

    pub fn blob_by_id(&self, id: ObjectId) -> Result<Blob> {
        self.store.read_json(id)
    }

    /// Stages the working copy of `filename`, or unstages it if it matches the head commit.
    pub fn add(&mut self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let contents = self
            .work_tree
            .read(filename)?
            .ok_or(Error::FileNotFound)?;
        let blob = Blob::new(filename, contents);
        let head = self.head_commit()?;
        if head.blob_of(filename) == Some(blob.id()) {
            log::debug!("{} matches {}, nothing to stage", filename, head.id());
            self.state.unstage(filename, &head);
            self.state.unmark_removed(filename, &head);
            return Ok(());
        }
        self.staging.stage(&blob)?;
        self.state.stage(filename, blob.id(), &head);
        log::info!("staged {} as {}", filename, blob.id());
        Ok(())
    }

    /// Unstages `filename`, and if the head commit tracks it, deletes it and
    /// marks it for removal.
    pub fn rm(&mut self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let head = self.head_commit()?;
        let staged = self.state.staged().contains_key(filename);
        let tracked = head.tracked().contains_key(filename);
        if !staged && !tracked {
            return Err(Error::NoReasonToRemove);
        }
        if tracked {
            self.work_tree.remove(filename)?;
            log::info!("marked {} for removal", filename);
            self.state.mark_removed(filename, &head);
        } else {
            self.state.unstage(filename, &head);
        }
        Ok(())
    }

    /// Records the head commit's files, minus removals, plus staged blobs, as a new commit on head.
    pub fn commit(&mut self, message: &str) -> Result<ObjectId> {
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        if !self.state.has_pending_changes() {
            return Err(Error::NothingToCommit);
        }
        let head = self.head_commit()?;
        let mut tracked = head.tracked().clone();
        for name in self.state.removed() {
            tracked.remove(name);
        }
        let mut blobs = Vec::with_capacity(self.state.staged().len());
        for (name, id) in self.state.staged() {
            blobs.push(self.staging.load(*id)?);
            tracked.insert(name.clone(), *id);
        }
        let commit = Commit::new(
            message,
            Commit::timestamp_now(),
            head.id(),
            self.state.head(),
            tracked,
        );
        for blob in &blobs {
            self.store.insert_json(blob)?;
        }
        self.store.insert_json(&commit)?;
        self.state.move_head_to(&commit);
        log::info!("committed {} on {}", commit.id(), self.state.head());
        Ok(commit.id())
    }

    /// History of the checked out branch, newest first.
    pub fn log(&self) -> History<'_, S> {
        graph::history(&self.store, self.state.head_commit())
    }

    pub fn global_log(&self) -> Result<Vec<Commit>> {
        graph::all_commits(&self.store)
    }

    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        graph::find(&self.store, message)
    }

    /// The split point of two branches.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> Result<Commit> {
        let a = self.state.branch(a).ok_or(Error::NoSuchBranch)?;
        let b = self.state.branch(b).ok_or(Error::NoSuchBranch)?;
        graph::lowest_common_ancestor(&self.store, a, b)
    }

    /// Restores `filename` in the working tree from the head commit.
    pub fn checkout_file(&self, filename: &str) -> Result<()> {
        self.restore_file(self.state.head_commit(), filename)
    }

    /// Restores `filename` in the working tree from the commit `reference`
    /// names, which may be a unique prefix of its id.
    pub fn checkout_file_from(&self, reference: &str, filename: &str) -> Result<()> {
        let id = graph::resolve_commit(&self.store, reference)?;
        self.restore_file(id, filename)
    }

    fn restore_file(&self, commit: ObjectId, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let commit = self.commit_by_id(commit)?;
        let blob = commit.blob_of(filename).ok_or(Error::FileNotInCommit)?;
        let blob = self.blob_by_id(blob)?;
        self.work_tree.write(filename, blob.contents())
    }

    pub fn checkout_branch(&mut self, branch: &str) -> Result<()> {
        if branch == self.state.head() {
            return Err(Error::SameBranch);
        }
        let target = self.state.branch(branch).ok_or(Error::NoSuchBranch)?;
        let target = self.commit_by_id(target)?;
        self.replace_work_tree(&target)?;
        self.state.switch_branch(branch, &target);
        Ok(())
    }

    pub fn branch(&mut self, name: &str) -> Result<()> {
        self.state.create_branch(name)
    }

    pub fn rm_branch(&mut self, name: &str) -> Result<()> {
        self.state.remove_branch(name)
    }

    /// Moves the checked out branch to `reference` and makes the working tree match it.
    pub fn reset(&mut self, reference: &str) -> Result<()> {
        let target = graph::resolve_commit(&self.store, reference)?;
        let target = self.commit_by_id(target)?;
        self.replace_work_tree(&target)?;
        self.state.move_head_to(&target);
        Ok(())
    }

    /// Fails if a file the repository does not know about would be overwritten by `target`.
    pub(crate) fn check_untracked(&self, target: &Commit) -> Result<()> {
        for name in self.work_tree.files()? {
            if !self.state.snapshot().contains_key(&name) && target.tracked().contains_key(&name) {
                log::debug!("untracked {} would be overwritten by {}", name, target.id());
                return Err(Error::UntrackedFileConflict);
            }
        }
        Ok(())
    }

    /// Makes the working tree hold exactly `target`'s files in place of the
    /// working snapshot's, staged additions included.
    fn replace_work_tree(&self, target: &Commit) -> Result<()> {
        self.check_untracked(target)?;
        let blobs = target
            .tracked()
            .iter()
            .map(|(name, id)| -> Result<(String, Blob)> { Ok((name.clone(), self.blob_by_id(*id)?)) })
            .collect::<Result<Vec<_>>>()?;
        for name in self.state.snapshot().keys() {
            if !target.tracked().contains_key(name) {
                self.work_tree.remove(name)?;
            }
        }
        for (name, blob) in blobs {
            self.work_tree.write(&name, blob.contents())?;
        }
        Ok(())
    }
}
