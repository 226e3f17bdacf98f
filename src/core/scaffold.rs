//! Writing rendered templates to disk.
//!
//! Generated files are written once. An existing file is left alone unless
//! the caller asks for [`WriteMode::Overwrite`].

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::io;

/// A rendered file, relative to the scaffold root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldFile {
    pub relative_path: PathBuf,
    pub content: String,
}

impl ScaffoldFile {
    pub fn new(relative_path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    SkipExisting,
    Overwrite,
}

impl WriteMode {
    pub fn from_force(force: bool) -> Self {
        if force {
            WriteMode::Overwrite
        } else {
            WriteMode::SkipExisting
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Created,
    Overwritten,
    Unchanged,
    Skipped,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub status: FileStatus,
    /// Whether the file on disk equals the rendered template after the run.
    pub matches_template: bool,
    pub bytes: usize,
}

impl FileOutcome {
    pub fn wrote(&self) -> bool {
        matches!(self.status, FileStatus::Created | FileStatus::Overwritten)
    }
}

/// Write every file under `root`, honoring `mode`. With `dry_run`, nothing is touched.
pub fn write_files(
    root: &Path,
    files: &[ScaffoldFile],
    mode: WriteMode,
    dry_run: bool,
) -> Result<Vec<FileOutcome>> {
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        outcomes.push(write_one(root, file, mode, dry_run)?);
    }

    Ok(outcomes)
}

fn write_one(root: &Path, file: &ScaffoldFile, mode: WriteMode, dry_run: bool) -> Result<FileOutcome> {
    let path = root.join(&file.relative_path);
    let display = file.relative_path.display().to_string();

    let existing = if path.is_file() {
        Some(io::read_bytes(&path, &format!("read {}", display))?)
    } else {
        None
    };

    let expected = file.content.as_bytes();
    let (status, matches_template) = match (&existing, mode) {
        (Some(current), WriteMode::SkipExisting) => (FileStatus::Skipped, current == expected),
        (Some(current), WriteMode::Overwrite) if current == expected => {
            (FileStatus::Unchanged, true)
        }
        (Some(_), WriteMode::Overwrite) if dry_run => (FileStatus::Planned, false),
        (Some(_), WriteMode::Overwrite) => (FileStatus::Overwritten, true),
        (None, _) if dry_run => (FileStatus::Planned, false),
        (None, _) => (FileStatus::Created, true),
    };

    if matches!(status, FileStatus::Created | FileStatus::Overwritten) {
        if let Some(parent) = path.parent() {
            io::ensure_dir(parent, &format!("create directory for {}", display))?;
        }
        io::write_file_atomic(&path, &file.content, &format!("write {}", display))?;
        crate::log_status!("scaffold", "Wrote {}", display);
    } else if status == FileStatus::Skipped {
        crate::log_status!("scaffold", "{} already exists, leaving it untouched", display);
    }

    Ok(FileOutcome {
        path: display,
        status,
        matches_template,
        bytes: file.content.len(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScaffoldSummary {
    pub created: usize,
    pub overwritten: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub planned: usize,
}

pub fn summarize(outcomes: &[FileOutcome]) -> ScaffoldSummary {
    let mut summary = ScaffoldSummary::default();
    for outcome in outcomes {
        match outcome.status {
            FileStatus::Created => summary.created += 1,
            FileStatus::Overwritten => summary.overwritten += 1,
            FileStatus::Unchanged => summary.unchanged += 1,
            FileStatus::Skipped => summary.skipped += 1,
            FileStatus::Planned => summary.planned += 1,
        }
    }
    summary
}
