//! Tar extraction into a scoped temporary directory.
//!
//! Every extraction happens inside an [`ArchiveExtractionContext`]. Dropping
//! the context deletes the directory and everything extracted into it, so
//! cleanup runs whether the decode that used it succeeded or not.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::capabilities::DecoderCapabilities;
use crate::error::{PngError, PngResult};

const EXTRACTION_PREFIX: &str = "asi-png-";

/// Temporary directory plus the files extracted into it.
#[derive(Debug)]
pub struct ArchiveExtractionContext {
    dir: Option<TempDir>,
    root: PathBuf,
    files: Vec<PathBuf>,
    keep: bool,
}

impl ArchiveExtractionContext {
    /// Create a fresh directory under `parent`, or the system temp dir.
    pub fn new(parent: Option<&Path>) -> PngResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(EXTRACTION_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(Self {
            root: dir.path().to_path_buf(),
            dir: Some(dir),
            files: Vec::new(),
            keep: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Extracted files, sorted by their path inside the archive.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Leave the directory on disk when the context is dropped.
    pub fn keep_files(&mut self, keep: bool) {
        self.keep = keep;
    }

    fn record(&mut self, mut files: Vec<PathBuf>) {
        let root = &self.root;
        files.sort_by_cached_key(|f| member_key(f.strip_prefix(root).unwrap_or(f)));
        self.files = files;
    }
}

impl Drop for ArchiveExtractionContext {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let kept = dir.into_path();
            debug!(dir = %kept.display(), files = self.files.len(), "Keeping extracted files");
            return;
        }
        let root = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!(dir = %root.display(), error = %e, "Failed to remove extraction directory");
        } else {
            debug!(dir = %root.display(), files = self.files.len(), "Removed extracted files");
        }
    }
}

/// How an archive was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Only the lexicographically first member
    FirstMember,
    /// Every member
    Full,
    /// Every member, because single-member extraction is unavailable
    FullFallback,
}

/// Extracts PNG members of tar archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor {
    capabilities: DecoderCapabilities,
}

impl ArchiveExtractor {
    pub fn new(capabilities: DecoderCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> DecoderCapabilities {
        self.capabilities
    }

    /// PNG member paths of `archive`, sorted lexicographically.
    pub fn list_members(archive: &Path) -> PngResult<Vec<String>> {
        let mut tar = open_archive(archive)?;
        let mut names = Vec::new();
        for entry in tar.entries().map_err(|e| corrupt(archive, e))? {
            let entry = entry.map_err(|e| corrupt(archive, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().map_err(|e| corrupt(archive, e))?;
            if is_png(&path) {
                names.push(member_key(&path));
            }
        }
        names.sort();
        Ok(names)
    }

    /// Extract `archive` into `ctx`, either fully or only its first member.
    pub fn extract(
        &self,
        archive: &Path,
        first_only: bool,
        ctx: &mut ArchiveExtractionContext,
    ) -> PngResult<ExtractionMode> {
        let mode = match (first_only, self.capabilities.partial_archive_extraction) {
            (true, true) => {
                self.extract_first(archive, ctx)?;
                ExtractionMode::FirstMember
            }
            (true, false) => {
                warn!(
                    archive = %archive.display(),
                    "Single-member extraction unavailable, unpacking whole archive"
                );
                self.extract_all(archive, ctx)?;
                ExtractionMode::FullFallback
            }
            (false, _) => {
                self.extract_all(archive, ctx)?;
                ExtractionMode::Full
            }
        };

        if ctx.files().is_empty() {
            return Err(PngError::EmptyArchive(archive.to_path_buf()));
        }
        debug!(
            archive = %archive.display(),
            files = ctx.files().len(),
            mode = ?mode,
            "Extracted archive"
        );
        Ok(mode)
    }

    fn extract_first(&self, archive: &Path, ctx: &mut ArchiveExtractionContext) -> PngResult<()> {
        let members = Self::list_members(archive)?;
        let Some(first) = members.first() else {
            return Ok(());
        };

        let mut tar = open_archive(archive)?;
        for entry in tar.entries().map_err(|e| corrupt(archive, e))? {
            let mut entry = entry.map_err(|e| corrupt(archive, e))?;
            let path = entry.path().map_err(|e| corrupt(archive, e))?.into_owned();
            if member_key(&path) != *first {
                continue;
            }
            entry.unpack_in(ctx.path()).map_err(|e| corrupt(archive, e))?;
            ctx.record(vec![ctx.path().join(path)]);
            break;
        }
        Ok(())
    }

    fn extract_all(&self, archive: &Path, ctx: &mut ArchiveExtractionContext) -> PngResult<()> {
        open_archive(archive)?
            .unpack(ctx.path())
            .map_err(|e| corrupt(archive, e))?;

        let files = WalkDir::new(ctx.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && is_png(e.path()))
            .map(|e| e.into_path())
            .collect();
        ctx.record(files);
        Ok(())
    }
}

fn open_archive(path: &Path) -> PngResult<tar::Archive<BufReader<File>>> {
    Ok(tar::Archive::new(BufReader::new(File::open(path)?)))
}

fn corrupt(path: &Path, e: std::io::Error) -> PngError {
    PngError::ArchiveCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Member path with `/` separators and no `.` components.
fn member_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
