//! Collision-free destination paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn with_counter(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    path.with_file_name(name)
}

/// Returns `candidate` if it is neither in `taken` nor on disk, otherwise
/// the first free `name (N).ext` with N starting at 2.
pub fn unique_path(candidate: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    let free = |p: &Path| !taken.contains(p) && !p.exists();
    if free(candidate) {
        return candidate.to_path_buf();
    }
    let mut n = 2u32;
    loop {
        let next = with_counter(candidate, n);
        if free(&next) {
            return next;
        }
        n += 1;
    }
}

/// Where one file of a batch goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Nothing is there yet.
    Free(PathBuf),
    /// An existing file the caller accepted as already holding this entry.
    Existing(PathBuf),
}

impl Slot {
    pub fn path(&self) -> &Path {
        match self {
            Slot::Free(p) | Slot::Existing(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Slot::Free(p) | Slot::Existing(p) => p,
        }
    }
}

/// Resolve collisions for a whole batch before anything touches disk.
/// Order is preserved: the first file keeps its name, later duplicates get
/// ` (2)`, ` (3)`, ... Existing files on disk are never reused.
pub fn resolve_batch(targets: &[PathBuf]) -> Vec<PathBuf> {
    resolve_batch_with(targets, |_, _| false)
        .into_iter()
        .map(Slot::into_path)
        .collect()
}

/// Like `resolve_batch`, but an existing file on the candidate chain of
/// entry `i` is handed back as `Slot::Existing` when `accept(i, path)` says
/// it already is that entry. Each path is given out at most once.
pub fn resolve_batch_with<F>(targets: &[PathBuf], mut accept: F) -> Vec<Slot>
where
    F: FnMut(usize, &Path) -> bool,
{
    let mut taken = HashSet::with_capacity(targets.len());
    let mut slots = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        let mut n = 1u32;
        let slot = loop {
            let candidate = if n == 1 {
                target.clone()
            } else {
                with_counter(target, n)
            };
            n += 1;
            if taken.contains(&candidate) {
                continue;
            }
            if !candidate.exists() {
                break Slot::Free(candidate);
            }
            if accept(i, &candidate) {
                break Slot::Existing(candidate);
            }
        };
        taken.insert(slot.path().to_path_buf());
        slots.push(slot);
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_duplicates_get_counters_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Author/Book.mp3");
        let b = dir.path().join("Author/Other.mp3");
        let out = resolve_batch(&[a.clone(), a.clone(), b.clone(), a.clone()]);
        assert_eq!(out[0], a);
        assert_eq!(out[1], dir.path().join("Author/Book (2).mp3"));
        assert_eq!(out[2], b);
        assert_eq!(out[3], dir.path().join("Author/Book (3).mp3"));
    }

    #[test]
    fn existing_file_on_disk_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Book.m4b");
        std::fs::write(&existing, b"x").unwrap();
        let out = unique_path(&existing, &HashSet::new());
        assert_eq!(out, dir.path().join("Book (2).m4b"));
    }

    #[test]
    fn accepted_existing_files_are_reused_in_chain_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Dune.mp3");
        let a2 = dir.path().join("Dune (2).mp3");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&a2, b"second").unwrap();

        // Entry 1 owns "Dune (2).mp3"; entry 0 owns "Dune.mp3".
        let slots = resolve_batch_with(&[a.clone(), a.clone(), a.clone()], |i, p| {
            (i == 0 && p == a) || (i == 1 && p == a2)
        });
        assert_eq!(slots[0], Slot::Existing(a.clone()));
        assert_eq!(slots[1], Slot::Existing(a2.clone()));
        assert_eq!(slots[2], Slot::Free(dir.path().join("Dune (3).mp3")));
    }

    #[test]
    fn counter_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().join("Folder");
        std::fs::create_dir(&d).unwrap();
        assert_eq!(unique_path(&d, &HashSet::new()), dir.path().join("Folder (2)"));
    }
}
