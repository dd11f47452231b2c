use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use shared::domain::FileId;

use crate::gateway::UploadFile;

/// A file chosen in the picker, before it is given an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

impl PickedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }
        Ok(Self {
            name: display_name(&path),
            size: metadata.len(),
            path,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Ordered list of the files the user picked.
///
/// Ids come from a counter that is never rewound, so an id is never handed
/// out twice even after `clear`. Names are not deduplicated.
#[derive(Debug)]
pub struct FileRegistry {
    files: Vec<SelectedFile>,
    next_id: u64,
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, file: PickedFile) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.files.push(SelectedFile {
            id,
            name: file.name,
            size: file.size,
            path: file.path,
        });
        id
    }

    /// Removes every entry whose id is in `ids` and returns how many went.
    pub fn remove_where(&mut self, ids: &HashSet<FileId>) -> usize {
        let before = self.files.len();
        self.files.retain(|file| !ids.contains(&file.id));
        before - self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn get(&self, id: FileId) -> Option<&SelectedFile> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.iter().map(|file| file.id)
    }

    pub fn names_for(&self, ids: &HashSet<FileId>) -> HashSet<String> {
        self.files
            .iter()
            .filter(|file| ids.contains(&file.id))
            .map(|file| file.name.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<UploadFile> {
        self.files
            .iter()
            .map(|file| UploadFile {
                name: file.name.clone(),
                path: file.path.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
