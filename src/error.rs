use std::convert::Infallible;

use derive_more::{Display, From};

use crate::{object_id::ObjectId, object_store::ObjectKind};

/// Every way a repository operation can fail.
///
/// The [`Display`] form is the single line shown to the user.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display(fmt = "{}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "{}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "Missing {} object {}.", _0, _1)]
    MissingObject(ObjectKind, ObjectId),
    #[display(fmt = "Commits {} and {} share no ancestor.", _0, _1)]
    NoCommonAncestor(ObjectId, ObjectId),

    #[display(fmt = "Incorrect operands.")]
    IncorrectOperands,
    #[display(fmt = "Please enter a commit message.")]
    EmptyMessage,
    #[display(fmt = "Invalid file name: {:?}.", _0)]
    InvalidFilename(String),

    #[display(fmt = "File does not exist.")]
    FileNotFound,
    #[display(fmt = "No commit with that id exists.")]
    CommitNotFound,
    #[display(fmt = "File does not exist in that commit.")]
    FileNotInCommit,
    #[display(fmt = "No such branch exists.")]
    NoSuchBranch,
    #[display(fmt = "Found no commit with that message.")]
    NoMatchingCommit,

    #[display(fmt = "No changes added to the commit.")]
    NothingToCommit,
    #[display(fmt = "No reason to remove the file.")]
    NoReasonToRemove,
    #[display(fmt = "You have uncommitted changes.")]
    UncommittedChanges,
    #[display(fmt = "Given branch is an ancestor of the current branch.")]
    GivenIsAncestor,
    #[display(fmt = "Current branch fast-forwarded.")]
    FastForwarded,
    #[display(fmt = "Not in an initialized revlet directory.")]
    NotInitialized,
    #[display(fmt = "A revlet version-control system already exists in the current directory.")]
    AlreadyInitialized,

    #[display(fmt = "There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedFileConflict,

    #[display(fmt = "No need to checkout the current branch.")]
    SameBranch,
    #[display(fmt = "Cannot merge a branch with itself.")]
    SelfMerge,
    #[display(fmt = "Cannot remove the current branch.")]
    CannotRemoveCurrentBranch,
    #[display(fmt = "A branch with that name already exists.")]
    BranchExists,
}

/// Broad categories used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad operand count or content.
    Validation,
    /// A file, commit, or branch that does not exist.
    NotFound,
    /// The repository is not in a state that allows the operation.
    State,
    /// The operation would clobber data the repository does not track.
    Conflict,
    /// The operation breaks a branch rule.
    DomainRule,
    /// Reading or writing the repository's own records failed.
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            IO(_) | Serde(_) | MissingObject(..) | NoCommonAncestor(..) => {
                ErrorKind::Storage
            }
            IncorrectOperands | EmptyMessage | InvalidFilename(_) => ErrorKind::Validation,
            FileNotFound | CommitNotFound | FileNotInCommit | NoSuchBranch | NoMatchingCommit => {
                ErrorKind::NotFound
            }
            NothingToCommit | NoReasonToRemove | UncommittedChanges | GivenIsAncestor
            | FastForwarded | NotInitialized | AlreadyInitialized => ErrorKind::State,
            UntrackedFileConflict => ErrorKind::Conflict,
            SameBranch | SelfMerge | CannotRemoveCurrentBranch | BranchExists => {
                ErrorKind::DomainRule
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_error_kinds() {
    assert_eq!(Error::FileNotFound.kind(), ErrorKind::NotFound);
    assert_eq!(Error::NothingToCommit.kind(), ErrorKind::State);
    assert_eq!(Error::UntrackedFileConflict.kind(), ErrorKind::Conflict);
    assert_eq!(Error::SelfMerge.kind(), ErrorKind::DomainRule);
    assert_eq!(Error::EmptyMessage.kind(), ErrorKind::Validation);
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    assert_eq!(Error::from(io).kind(), ErrorKind::Storage);
}

#[test]
fn test_error_messages() {
    assert_eq!(Error::NoReasonToRemove.to_string(), "No reason to remove the file.");
    assert_eq!(
        Error::GivenIsAncestor.to_string(),
        "Given branch is an ancestor of the current branch."
    );
}
