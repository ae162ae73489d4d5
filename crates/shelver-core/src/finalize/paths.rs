use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FinalizeError;

/// Join `relative` onto `root`, refusing anything that could leave the root.
pub fn ensure_within_root(root: &Path, relative: &Path) -> Result<PathBuf, FinalizeError> {
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FinalizeError::UnsafePath(relative.to_path_buf()));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(FinalizeError::UnsafePath(relative.to_path_buf()));
    }
    Ok(root.join(clean))
}

/// Regular files of a download: the path itself when it is a file, otherwise
/// every file below it in sorted order (sorting keeps collision suffixes
/// deterministic).
pub fn list_source_files(path: &Path) -> Result<Vec<PathBuf>, FinalizeError> {
    if !path.exists() {
        return Err(FinalizeError::SourceMissing(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let p = e.path().unwrap_or(path).to_path_buf();
            FinalizeError::io(p, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Remove `path` if no regular file is left anywhere below it. Returns
/// whether the tree was removed.
pub fn remove_empty_tree(path: &Path) -> std::io::Result<bool> {
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            return Ok(false);
        }
    }
    std::fs::remove_dir_all(path)?;
    Ok(true)
}
