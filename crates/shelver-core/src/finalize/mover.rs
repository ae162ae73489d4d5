//! Atomic rename with a verified copy+delete fallback.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use walkdir::WalkDir;

use crate::control::is_aborted;
use crate::error::FinalizeError;
use crate::retry::{run_with_retry, RetryPolicy};

use super::verify::files_match;

/// Moves and copies files into the library. Never overwrites an existing
/// destination and never deletes a source before its copy is confirmed.
#[derive(Debug, Clone)]
pub struct FileMover {
    pub retry: RetryPolicy,
    /// Hash-compare every fallback copy before removing its source.
    pub verify: bool,
}

impl Default for FileMover {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            verify: true,
        }
    }
}

impl FileMover {
    pub fn new(retry: RetryPolicy, verify: bool) -> Self {
        Self { retry, verify }
    }

    /// Move one file. Tries `rename` (with retry on busy/transient errors)
    /// and falls back to copy, verify, delete when rename is not possible,
    /// e.g. across filesystems.
    pub fn move_file(&self, src: &Path, dst: &Path) -> Result<(), FinalizeError> {
        if !src.is_file() {
            return Err(FinalizeError::SourceMissing(src.to_path_buf()));
        }
        if dst.exists() {
            return Err(FinalizeError::DestinationConflict(dst.to_path_buf()));
        }
        match run_with_retry(&self.retry, "rename", || fs::rename(src, dst)) {
            Ok(()) => {
                tracing::debug!(src = %src.display(), dst = %dst.display(), "renamed");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(src = %src.display(), "rename failed ({e}), falling back to copy");
                self.copy_then_delete(src, dst)
            }
        }
    }

    /// Copy one file, leaving the source in place.
    pub fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FinalizeError> {
        if !src.is_file() {
            return Err(FinalizeError::SourceMissing(src.to_path_buf()));
        }
        if dst.exists() {
            return Err(FinalizeError::DestinationConflict(dst.to_path_buf()));
        }
        self.copy_verified(src, dst)
    }

    pub(crate) fn copy_then_delete(&self, src: &Path, dst: &Path) -> Result<(), FinalizeError> {
        self.copy_verified(src, dst)?;
        fs::remove_file(src).map_err(|e| FinalizeError::io(src, e))
    }

    /// Copy and (optionally) verify. A failed or mismatching copy is removed.
    fn copy_verified(&self, src: &Path, dst: &Path) -> Result<(), FinalizeError> {
        if let Err(e) = run_with_retry(&self.retry, "copy", || fs::copy(src, dst)) {
            let _ = fs::remove_file(dst);
            return Err(FinalizeError::io(dst, e));
        }
        if self.verify {
            match files_match(src, dst) {
                Ok(true) => {}
                Ok(false) => {
                    let _ = fs::remove_file(dst);
                    return Err(FinalizeError::VerifyMismatch(dst.to_path_buf()));
                }
                Err(e) => {
                    let _ = fs::remove_file(dst);
                    return Err(FinalizeError::io(dst, e));
                }
            }
        }
        Ok(())
    }

    /// Move a whole directory.
    ///
    /// A rename is tried first. When the destination already exists (or the
    /// rename fails) the tree is merged by copy: every file is copied and
    /// verified, then the source tree is removed. On any failure or abort the
    /// files copied so far are removed again and the source is left intact.
    /// Files already present at the destination with identical content are
    /// accepted; differing ones are a conflict detected before copying.
    pub fn move_directory(
        &self,
        src: &Path,
        dst: &Path,
        abort: Option<&AtomicBool>,
    ) -> Result<(), FinalizeError> {
        if !src.is_dir() {
            return Err(FinalizeError::SourceMissing(src.to_path_buf()));
        }
        if !dst.exists() {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(|e| FinalizeError::io(parent, e))?;
            }
            match run_with_retry(&self.retry, "rename", || fs::rename(src, dst)) {
                Ok(()) => {
                    tracing::info!(src = %src.display(), dst = %dst.display(), "directory renamed");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(src = %src.display(), "directory rename failed ({e}), copying");
                }
            }
        }

        let plan = plan_tree_copy(src, dst)?;
        let mut undo = Undo::default();
        for (from, to) in &plan {
            if is_aborted(abort) {
                undo.rollback();
                return Err(FinalizeError::Aborted);
            }
            if to.exists() {
                continue;
            }
            if let Some(parent) = to.parent() {
                if let Err(e) = undo.create_dir_all(parent) {
                    undo.rollback();
                    return Err(FinalizeError::io(parent, e));
                }
            }
            if let Err(e) = self.copy_verified(from, to) {
                undo.rollback();
                return Err(e);
            }
            undo.files.push(to.clone());
        }

        fs::remove_dir_all(src).map_err(|e| FinalizeError::io(src, e))?;
        tracing::info!(
            src = %src.display(),
            dst = %dst.display(),
            files = plan.len(),
            "directory merged by copy"
        );
        Ok(())
    }
}

/// Source file -> destination file for every file below `src`. Fails before
/// anything is written if a destination file exists with different content.
fn plan_tree_copy(src: &Path, dst: &Path) -> Result<Vec<(PathBuf, PathBuf)>, FinalizeError> {
    let mut plan = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let p = e.path().unwrap_or(src).to_path_buf();
            FinalizeError::io(p, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| FinalizeError::UnsafePath(entry.path().to_path_buf()))?;
        let to = dst.join(rel);
        if to.exists() {
            let same = files_match(entry.path(), &to).map_err(|e| FinalizeError::io(&to, e))?;
            if !same {
                return Err(FinalizeError::DestinationConflict(to));
            }
        }
        plan.push((entry.into_path(), to));
    }
    Ok(plan)
}

/// Files and directories a merge created, so a failed merge can remove them.
#[derive(Debug, Default)]
struct Undo {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl Undo {
    /// `fs::create_dir_all`, remembering every directory that did not exist.
    fn create_dir_all(&mut self, dir: &Path) -> std::io::Result<()> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        fs::create_dir_all(dir)?;
        self.dirs.extend(missing.into_iter().rev());
        Ok(())
    }

    fn rollback(&self) {
        for path in self.files.iter().rev() {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), "rollback failed: {e}");
            }
        }
        // Deepest first; a directory someone else wrote into stays.
        for dir in self.dirs.iter().rev() {
            if let Err(e) = fs::remove_dir(dir) {
                tracing::debug!(path = %dir.display(), "rollback kept directory: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn mover() -> FileMover {
        FileMover::new(RetryPolicy::immediate(2), true)
    }

    #[test]
    fn move_file_renames_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mp3");
        let dst = dir.path().join("out.mp3");
        fs::write(&src, b"audio").unwrap();
        mover().move_file(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"audio");

        fs::write(&src, b"again").unwrap();
        assert!(matches!(
            mover().move_file(&src, &dst),
            Err(FinalizeError::DestinationConflict(_))
        ));
        assert!(src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"audio");
    }

    #[test]
    fn copy_file_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mp3");
        let dst = dir.path().join("out.mp3");
        fs::write(&src, b"audio").unwrap();
        mover().copy_file(&src, &dst).unwrap();
        assert!(src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"audio");
    }

    #[test]
    fn copy_then_delete_removes_source_after_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mp3");
        let dst = dir.path().join("out.mp3");
        fs::write(&src, b"audio").unwrap();
        mover().copy_then_delete(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"audio");
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = mover()
            .move_file(&dir.path().join("nope"), &dir.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, FinalizeError::SourceMissing(_)));
    }

    #[test]
    fn move_directory_renames_into_new_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dl/Book");
        fs::create_dir_all(src.join("CD1")).unwrap();
        fs::write(src.join("CD1/01.mp3"), b"one").unwrap();
        let dst = dir.path().join("lib/Author/Book");
        mover().move_directory(&src, &dst, None).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("CD1/01.mp3")).unwrap(), b"one");
    }

    #[test]
    fn move_directory_merges_into_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dl/Book");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("01.mp3"), b"one").unwrap();
        fs::write(src.join("02.mp3"), b"two").unwrap();
        let dst = dir.path().join("lib/Book");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("cover.jpg"), b"img").unwrap();
        fs::write(dst.join("01.mp3"), b"one").unwrap();

        mover().move_directory(&src, &dst, None).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("01.mp3")).unwrap(), b"one");
        assert_eq!(fs::read(dst.join("02.mp3")).unwrap(), b"two");
        assert_eq!(fs::read(dst.join("cover.jpg")).unwrap(), b"img");
    }

    #[test]
    fn move_directory_conflict_leaves_both_sides_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dl/Book");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("01.mp3"), b"new").unwrap();
        fs::write(src.join("02.mp3"), b"two").unwrap();
        let dst = dir.path().join("lib/Book");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("01.mp3"), b"old").unwrap();

        let err = mover().move_directory(&src, &dst, None).unwrap_err();
        assert!(matches!(err, FinalizeError::DestinationConflict(_)));
        assert_eq!(fs::read(src.join("01.mp3")).unwrap(), b"new");
        assert!(src.join("02.mp3").exists());
        assert!(!dst.join("02.mp3").exists());
        assert_eq!(fs::read(dst.join("01.mp3")).unwrap(), b"old");
    }

    #[test]
    fn aborted_merge_keeps_source_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dl/Book");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("01.mp3"), b"one").unwrap();
        let dst = dir.path().join("lib/Book");
        fs::create_dir_all(&dst).unwrap();

        let token = AtomicBool::new(false);
        token.store(true, Ordering::Relaxed);
        let err = mover().move_directory(&src, &dst, Some(&token)).unwrap_err();
        assert!(matches!(err, FinalizeError::Aborted));
        assert!(src.join("01.mp3").exists());
        assert!(!dst.join("01.mp3").exists());
    }

    #[test]
    fn failed_merge_removes_directories_it_created() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dl/Book");
        fs::create_dir_all(src.join("CD1/Extra")).unwrap();
        fs::create_dir_all(src.join("CD2")).unwrap();
        fs::write(src.join("CD1/Extra/01.mp3"), b"one").unwrap();
        fs::write(src.join("CD2/02.mp3"), b"two").unwrap();
        let dst = dir.path().join("lib/Book");
        fs::create_dir_all(&dst).unwrap();
        // A plain file where the merge needs a directory.
        fs::write(dst.join("CD2"), b"not a dir").unwrap();

        let err = mover().move_directory(&src, &dst, None).unwrap_err();
        assert!(matches!(err, FinalizeError::Io { .. } | FinalizeError::TransientIo { .. }));
        assert!(!dst.join("CD1").exists());
        assert!(dst.exists());
        assert_eq!(fs::read(dst.join("CD2")).unwrap(), b"not a dir");
        assert!(src.join("CD1/Extra/01.mp3").exists());
        assert!(src.join("CD2/02.mp3").exists());
    }
}
