use std::{collections::BTreeMap, fmt::Display};

use crate::{
    blob::Blob,
    error::{Error, Result},
    object_store::{ObjectStore, Record},
    repository::Repository,
};

/// How a working file differs from what the next commit would record for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Modified,
    Deleted,
}

impl Display for Modification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modification::Modified => f.write_str("modified"),
            Modification::Deleted => f.write_str("deleted"),
        }
    }
}

/// A summary of branches, the staging index, and the working tree. All lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub head: String,
    pub branches: Vec<String>,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    /// Working files whose changes are not staged.
    pub unstaged: Vec<(String, Modification)>,
    /// Working files that are neither staged nor tracked by the head commit.
    pub untracked: Vec<String>,
}

impl<S> Repository<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    pub fn status(&self) -> Result<Status> {
        let head = self.head_commit()?;
        let staged = self.state.staged();
        let removed = self.state.removed();

        let mut unstaged = BTreeMap::new();
        let expected = head
            .tracked()
            .iter()
            .filter(|(name, _)| !staged.contains_key(*name) && !removed.contains(*name))
            .chain(staged.iter());
        for (name, blob) in expected {
            match self.work_tree.read(name)? {
                None => {
                    unstaged.insert(name.clone(), Modification::Deleted);
                }
                Some(contents) => {
                    if Blob::new(name.as_str(), contents).id() != *blob {
                        unstaged.insert(name.clone(), Modification::Modified);
                    }
                }
            }
        }

        let untracked = self
            .work_tree
            .files()?
            .into_iter()
            .filter(|name| {
                !staged.contains_key(name)
                    && (!head.tracked().contains_key(name) || removed.contains(name))
            })
            .collect();

        Ok(Status {
            head: self.state.head().to_owned(),
            branches: self.state.branches().keys().cloned().collect(),
            staged: staged.keys().cloned().collect(),
            removed: removed.iter().cloned().collect(),
            unstaged: unstaged.into_iter().collect(),
            untracked,
        })
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for branch in &self.branches {
            if *branch == self.head {
                writeln!(f, "*{}", branch)?;
            } else {
                writeln!(f, "{}", branch)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "=== Staged Files ===")?;
        for name in &self.staged {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Removed Files ===")?;
        for name in &self.removed {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Modifications Not Staged For Commit ===")?;
        for (name, modification) in &self.unstaged {
            writeln!(f, "{} ({})", name, modification)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Untracked Files ===")?;
        for name in &self.untracked {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::{scratch, write};

    #[test]
    fn test_status() {
        let (dir, mut repo) = scratch();
        write(&dir, "kept.txt", "k\n");
        write(&dir, "edited.txt", "e\n");
        write(&dir, "vanished.txt", "v\n");
        write(&dir, "dropped.txt", "d\n");
        for name in ["kept.txt", "edited.txt", "vanished.txt", "dropped.txt"] {
            repo.add(name).unwrap();
        }
        repo.commit("first").unwrap();
        repo.branch("other").unwrap();

        write(&dir, "edited.txt", "e2\n");
        std::fs::remove_file(dir.path().join("vanished.txt")).unwrap();
        repo.rm("dropped.txt").unwrap();
        write(&dir, "staged.txt", "s\n");
        repo.add("staged.txt").unwrap();
        write(&dir, "staged.txt", "s2\n");
        write(&dir, "stray.txt", "?\n");

        let status = repo.status().unwrap();
        assert_eq!(status.branches, vec!["master".to_owned(), "other".to_owned()]);
        assert_eq!(status.staged, vec!["staged.txt".to_owned()]);
        assert_eq!(status.removed, vec!["dropped.txt".to_owned()]);
        assert_eq!(
            status.unstaged,
            vec![
                ("edited.txt".to_owned(), Modification::Modified),
                ("staged.txt".to_owned(), Modification::Modified),
                ("vanished.txt".to_owned(), Modification::Deleted),
            ]
        );
        assert_eq!(status.untracked, vec!["stray.txt".to_owned()]);
    }

    #[test]
    fn test_status_skips_files_matching_what_would_be_committed() {
        let (dir, mut repo) = scratch();
        write(&dir, "kept.txt", "k\n");
        repo.add("kept.txt").unwrap();
        repo.commit("first").unwrap();
        write(&dir, "staged.txt", "s\n");
        repo.add("staged.txt").unwrap();

        let status = repo.status().unwrap();
        assert_eq!(status.staged, vec!["staged.txt".to_owned()]);
        assert!(status.unstaged.is_empty());
        assert!(status.untracked.is_empty());
    }

    #[test]
    fn test_status_display() {
        let (_dir, repo) = scratch();
        let text = repo.status().unwrap().to_string();
        assert_eq!(
            text,
            "=== Branches ===\n*master\n\n\
             === Staged Files ===\n\n\
             === Removed Files ===\n\n\
             === Modifications Not Staged For Commit ===\n\n\
             === Untracked Files ===\n\n"
        );
    }
}
