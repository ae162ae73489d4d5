use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::{CompletedFileAction, NamingConfig, ShelverConfig};
use crate::control::is_aborted;
use crate::error::FinalizeError;
use crate::library_db::Download;
use crate::metadata::{extract_or_default, LoftyExtractor, MetadataExtractor};
use crate::naming::{
    batch_pattern, file_name_pattern, resolve_batch_with, resolve_file_name, NamingVariables, Slot,
};
use crate::retry::RetryPolicy;

use super::mover::FileMover;
use super::paths::ensure_within_root;
use super::verify::files_match;

static DISC_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:cd|dis[ck])\s*[-_]?\s*(\d{1,3})$").expect("disc dir regex"));

/// Outcome for one source file. Failures stay local to the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub success: bool,
    pub error: Option<String>,
}

impl ImportResult {
    fn ok(source: &Path, destination: PathBuf) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: Some(destination),
            success: true,
            error: None,
        }
    }

    fn failed(source: &Path, destination: Option<PathBuf>, err: &FinalizeError) -> Self {
        Self {
            source: source.to_path_buf(),
            destination,
            success: false,
            error: Some(err.to_string()),
        }
    }
}

/// Settings for one import run, usually taken from `ShelverConfig`.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub output_root: Option<PathBuf>,
    pub action: CompletedFileAction,
    pub naming: NamingConfig,
    pub verify_copies: bool,
    pub retry: RetryPolicy,
    /// Library item id -> the folder that item already lives in.
    pub item_roots: BTreeMap<String, PathBuf>,
}

impl ImportSettings {
    pub fn from_config(cfg: &ShelverConfig) -> Self {
        Self {
            output_root: cfg.output_path.clone(),
            action: cfg.completed_file_action,
            naming: cfg.naming.clone(),
            verify_copies: cfg.verify_copies,
            retry: RetryPolicy::from(&cfg.retry_config()),
            item_roots: BTreeMap::new(),
        }
    }

    pub fn with_item_root(mut self, item_id: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        self.item_roots.insert(item_id.into(), base.into());
        self
    }

    fn item_root(&self, item_id: &str) -> Option<&Path> {
        self.item_roots
            .get(item_id)
            .map(PathBuf::as_path)
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Root and pattern for an import. A linked item with a known folder
    /// gets its files there, named by the file-name part of the pattern;
    /// everything else goes under `output_root` with the full pattern.
    fn placement(&self, target_item_id: Option<&str>) -> Result<(&Path, String), FinalizeError> {
        if let Some(base) = target_item_id.and_then(|id| self.item_root(id)) {
            return Ok((base, file_name_pattern(&self.naming.file_pattern).to_string()));
        }
        Ok((self.root()?, self.naming.file_pattern.clone()))
    }

    /// Library root, or a configuration error. Never falls back to a default.
    pub fn root(&self) -> Result<&Path, FinalizeError> {
        match self.output_root.as_deref() {
            Some(root) if !root.as_os_str().is_empty() => Ok(root),
            _ => Err(FinalizeError::MissingOutputRoot),
        }
    }

    fn mover(&self) -> FileMover {
        FileMover::new(self.retry, self.verify_copies)
    }
}

/// Imports the files of a completed download into the library.
#[derive(Clone)]
pub struct FileFinalizer {
    extractor: Arc<dyn MetadataExtractor>,
}

impl Default for FileFinalizer {
    fn default() -> Self {
        Self::new(Arc::new(LoftyExtractor))
    }
}

impl std::fmt::Debug for FileFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFinalizer").finish_non_exhaustive()
    }
}

fn disc_from_parent(source: &Path) -> Option<u32> {
    let dir = source.parent()?.file_name()?.to_str()?;
    DISC_DIR
        .captures(dir.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl FileFinalizer {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Relative library path for one source file of `download`.
    pub fn plan_destination(
        &self,
        download: &Download,
        source: &Path,
        chapter: Option<u32>,
        naming: &NamingConfig,
    ) -> PathBuf {
        let tags = extract_or_default(self.extractor.as_ref(), source);
        let vars = NamingVariables::for_file(download, &tags, naming, disc_from_parent(source), chapter);
        let ext = source.extension().and_then(|e| e.to_str());
        resolve_file_name(&naming.file_pattern, &vars, ext)
    }

    /// Import `sources` for `download`.
    ///
    /// All destinations are computed and de-duplicated before any file is
    /// touched, so collision suffixes depend only on the order of `sources`.
    /// A destination that already holds a byte-identical copy of its source
    /// counts as imported, which makes a rerun after a crash a no-op instead
    /// of a second copy. Only a missing library root fails the whole call;
    /// everything else is reported per file.
    pub fn import_files(
        &self,
        download: &Download,
        target_item_id: Option<&str>,
        sources: &[PathBuf],
        settings: &ImportSettings,
        abort: Option<&AtomicBool>,
    ) -> Result<Vec<ImportResult>, FinalizeError> {
        let (root, pattern) = settings.placement(target_item_id)?;
        let multi = sources.len() > 1;
        let naming = NamingConfig {
            file_pattern: if multi { batch_pattern(&pattern) } else { pattern },
            ..settings.naming.clone()
        };

        let mut planned: Vec<(usize, PathBuf)> = Vec::with_capacity(sources.len());
        let mut results: Vec<Option<ImportResult>> = vec![None; sources.len()];
        for (i, source) in sources.iter().enumerate() {
            let chapter = multi.then(|| i as u32 + 1);
            let rel = self.plan_destination(download, source, chapter, &naming);
            match ensure_within_root(root, &rel) {
                Ok(abs) => planned.push((i, abs)),
                Err(e) => results[i] = Some(ImportResult::failed(source, None, &e)),
            }
        }

        let targets: Vec<PathBuf> = planned.iter().map(|(_, p)| p.clone()).collect();
        let slots = resolve_batch_with(&targets, |k, existing| {
            let source = &sources[planned[k].0];
            source.is_file() && files_match(source, existing).unwrap_or(false)
        });
        let mover = settings.mover();

        for ((i, _), slot) in planned.iter().zip(slots) {
            let source = &sources[*i];
            let outcome = if is_aborted(abort) {
                Err(FinalizeError::Aborted)
            } else {
                match &slot {
                    Slot::Free(dest) => place_file(&mover, settings.action, source, dest),
                    Slot::Existing(dest) => settle_existing(settings.action, source, dest),
                }
            };
            let dest = slot.into_path();
            results[*i] = Some(match outcome {
                Ok(()) => {
                    tracing::info!(
                        download_id = %download.id,
                        item_id = target_item_id.unwrap_or("-"),
                        src = %source.display(),
                        dst = %dest.display(),
                        "imported"
                    );
                    ImportResult::ok(source, dest)
                }
                Err(e) => {
                    tracing::warn!(
                        download_id = %download.id,
                        src = %source.display(),
                        "import failed: {e}"
                    );
                    ImportResult::failed(source, Some(dest), &e)
                }
            });
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Import one file. Configuration errors become a failed result.
    pub fn import_single_file(
        &self,
        download: &Download,
        target_item_id: Option<&str>,
        source: &Path,
        settings: &ImportSettings,
        abort: Option<&AtomicBool>,
    ) -> ImportResult {
        let sources = [source.to_path_buf()];
        match self.import_files(download, target_item_id, &sources, settings, abort) {
            Ok(mut results) if !results.is_empty() => results.swap_remove(0),
            Ok(_) => ImportResult::failed(source, None, &FinalizeError::SourceMissing(source.to_path_buf())),
            Err(e) => ImportResult::failed(source, None, &e),
        }
    }
}

fn place_file(
    mover: &FileMover,
    action: CompletedFileAction,
    source: &Path,
    dest: &Path,
) -> Result<(), FinalizeError> {
    if !source.is_file() {
        return Err(FinalizeError::SourceMissing(source.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FinalizeError::io(parent, e))?;
    }
    match action {
        CompletedFileAction::Copy => mover.copy_file(source, dest),
        CompletedFileAction::Move => mover.move_file(source, dest),
    }
}

/// The library already holds an identical copy of `source`. A move only has
/// the source left to delete.
fn settle_existing(action: CompletedFileAction, source: &Path, dest: &Path) -> Result<(), FinalizeError> {
    tracing::info!(src = %source.display(), dst = %dest.display(), "already in library");
    match action {
        CompletedFileAction::Copy => Ok(()),
        CompletedFileAction::Move => fs::remove_file(source).map_err(|e| FinalizeError::io(source, e)),
    }
}
