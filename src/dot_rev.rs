use std::{
    fs::{create_dir, create_dir_all, rename, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{Error, Result},
    state::RepositoryState,
    worktree::Ignores,
};

/// Name of the metadata directory at the top of a working tree.
pub const DOT_REV: &str = ".rev";

/// A wrapper for the path of the .rev directory which has a number of utilities defined on it.
#[derive(Debug, Clone)]
pub struct DotRev {
    root: PathBuf,
}

impl DotRev {
    /// The .rev directory belonging to `work_dir`, whether or not it exists yet.
    pub fn locate(work_dir: &Path) -> Self {
        DotRev {
            root: work_dir.join(DOT_REV),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.root.try_exists()?)
    }

    /// Lays out an empty .rev directory. Fails with [`Error::AlreadyInitialized`]
    /// without touching anything if one is already there.
    pub fn create(&self) -> Result<()> {
        if self.exists()? {
            return Err(Error::AlreadyInitialized);
        }
        log::info!("creating {:?}", self.root);
        create_dir_all(&self.root)?;
        create_dir(self.store_dir())?;
        create_dir(self.staging_dir())?;
        write_json(&Ignores::default(), &self.ignores_path())
    }

    /// Fails with [`Error::NotInitialized`] unless the .rev directory exists.
    pub fn existing(work_dir: &Path) -> Result<Self> {
        let dot_rev = DotRev::locate(work_dir);
        if !dot_rev.exists()? {
            return Err(Error::NotInitialized);
        }
        Ok(dot_rev)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    fn state_path(&self) -> PathBuf {
        self.root.join("state")
    }

    fn ignores_path(&self) -> PathBuf {
        self.root.join("ignores")
    }

    pub fn read_state(&self) -> Result<RepositoryState> {
        read_json(&self.state_path())
    }

    pub fn write_state(&self, state: &RepositoryState) -> Result<()> {
        write_json(state, &self.state_path())
    }

    pub fn ignores(&self) -> Result<Ignores> {
        read_json(&self.ignores_path())
    }
}

pub(crate) fn read_json<A: DeserializeOwned>(path: &Path) -> Result<A> {
    Ok(serde_json::from_reader(
        File::options().read(true).open(path)?,
    )?)
}

/// Writes through a sibling temporary file that is then renamed over `path`.
pub(crate) fn write_json<A: Serialize>(thing: &A, path: &Path) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)?;
    serde_json::to_writer_pretty(&mut file, thing)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    rename(&tmp, path)?;
    Ok(())
}

#[test]
fn test_create_and_reopen() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DotRev::existing(tempdir.path()),
        Err(Error::NotInitialized)
    ));
    let dot_rev = DotRev::locate(tempdir.path());
    dot_rev.create().unwrap();
    assert!(dot_rev.store_dir().is_dir());
    assert!(dot_rev.staging_dir().is_dir());
    assert_eq!(dot_rev.ignores().unwrap(), Ignores::default());
    assert!(matches!(dot_rev.create(), Err(Error::AlreadyInitialized)));
    assert!(DotRev::existing(tempdir.path()).is_ok());
}

#[test]
fn test_write_json_replaces_contents() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("thing");
    write_json(&vec!["a long first value"], &path).unwrap();
    write_json(&vec!["b"], &path).unwrap();
    let back: Vec<String> = read_json(&path).unwrap();
    assert_eq!(back, vec!["b".to_owned()]);
}
