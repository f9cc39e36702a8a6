use std::{
    collections::BTreeSet,
    fs::{read, read_dir, remove_file, write},
    io::ErrorKind,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{
    dot_rev::DOT_REV,
    error::{Error, Result},
};

/// Names in the working directory that are never listed.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ignores {
    set: BTreeSet<String>,
}

impl Ignores {
    pub fn contains(&self, name: &str) -> bool {
        self.set.contains(name)
    }
}

impl FromIterator<String> for Ignores {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Ignores {
            set: iter.into_iter().collect(),
        }
    }
}

/// The plain files at the top level of the user's working directory.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
    ignores: Ignores,
}

/// Fails with [`Error::InvalidFilename`] unless `name` is a single, ordinary path component.
pub fn validate_filename(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.contains(|c: char| c == '/' || c == '\\')
        || name == "."
        || name == ".."
        || name == DOT_REV;
    if bad {
        return Err(Error::InvalidFilename(name.to_owned()));
    }
    Ok(())
}

impl WorkTree {
    pub fn new(root: PathBuf, ignores: Ignores) -> Self {
        WorkTree { root, ignores }
    }

    /// Names of every plain file, skipping directories, ignored names, and
    /// names that are not valid UTF-8.
    pub fn files(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                log::debug!("skipping non utf-8 file name {:?}", entry.file_name());
                continue;
            };
            if name == DOT_REV || self.ignores.contains(&name) {
                continue;
            }
            names.insert(name);
        }
        Ok(names)
    }

    /// The file's bytes, or `None` if it is not there.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(read(path)?))
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> Result<()> {
        log::debug!("writing {} bytes to {}", contents.len(), name);
        Ok(write(self.root.join(name), contents)?)
    }

    /// Deletes the file. A file that is already gone is not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        log::debug!("deleting {}", name);
        match remove_file(self.root.join(name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[test]
fn test_files() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    std::fs::create_dir(root.join(DOT_REV)).unwrap();
    std::fs::create_dir(root.join("nested")).unwrap();
    write(root.join("nested").join("inner.txt"), "x").unwrap();
    write(root.join("a.txt"), "a").unwrap();
    write(root.join("b.txt"), "b").unwrap();
    write(root.join("notes.swp"), "junk").unwrap();
    let ignores: Ignores = vec![String::from("notes.swp")].into_iter().collect();
    let tree = WorkTree::new(root.into(), ignores);
    let files: Vec<String> = tree.files().unwrap().into_iter().collect();
    assert_eq!(files, vec!["a.txt".to_owned(), "b.txt".to_owned()]);
}

#[test]
fn test_read_write_remove() {
    let tempdir = tempfile::tempdir().unwrap();
    let tree = WorkTree::new(tempdir.path().into(), Ignores::default());
    assert_eq!(tree.read("a.txt").unwrap(), None);
    tree.write("a.txt", b"hello").unwrap();
    assert_eq!(tree.read("a.txt").unwrap(), Some(b"hello".to_vec()));
    tree.remove("a.txt").unwrap();
    tree.remove("a.txt").unwrap();
    assert_eq!(tree.read("a.txt").unwrap(), None);
}

#[test]
fn test_validate_filename() {
    assert!(validate_filename("a.txt").is_ok());
    for bad in ["", ".", "..", DOT_REV, "dir/a.txt", "dir\\a.txt"] {
        assert!(matches!(validate_filename(bad), Err(Error::InvalidFilename(_))));
    }
}
