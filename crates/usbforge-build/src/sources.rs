//! Source file set: named payload inputs for a build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key → path map of payload inputs (installer images, EFI folders,
/// answer files, driver packs). Keys are recipe-defined.
#[derive(Debug, Clone, Default)]
pub struct SourceFileSet {
    files: BTreeMap<String, PathBuf>,
}

impl SourceFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(key.into(), path.into());
    }

    pub fn with(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(key, path);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.files.get(key).map(PathBuf::as_path)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for SourceFileSet {
    fn from_iter<T: IntoIterator<Item = (String, PathBuf)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
