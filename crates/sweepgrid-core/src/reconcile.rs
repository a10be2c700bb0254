//! Output-set reconciliation: cleanup plus resume.
//!
//! The only persisted state of a sweep is the output directory's file
//! listing. Each run recomputes the expected file set from scratch, deletes
//! stray files that no combination in the current definition would produce,
//! and skips combinations whose output already exists. Cleanup is
//! best-effort: an individual deletion failure is logged and the run
//! continues.

use crate::axis::AxisSet;
use crate::combo::SegmentKey;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Expected output file names for the whole sweep under the current axis
/// definitions. Recomputed every run, never persisted.
pub fn expected_set(set: &AxisSet) -> BTreeSet<String> {
    set.combinations()
        .map(|c| set.segment_key(&c).output_file_name())
        .collect()
}

/// Plain files directly inside `dir` (non-recursive). Missing or unreadable
/// directory yields the empty list; individual entry errors are skipped with
/// a warning.
fn list_files(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not read directory entry");
                continue;
            }
        };
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    names
}

/// Files in `dir` that the current sweep does not expect, sorted.
pub fn stray_files(dir: &Path, expected: &BTreeSet<String>) -> Vec<String> {
    list_files(dir)
        .into_iter()
        .filter(|name| !expected.contains(name))
        .collect()
}

/// Delete every stray file directly inside `dir`. Subdirectories and their
/// contents are never touched; a missing `dir` is a no-op. Returns the names
/// actually removed.
pub fn clean_output_dir(dir: &Path, expected: &BTreeSet<String>) -> Vec<String> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "output dir does not exist; skipping cleanup");
        return Vec::new();
    }
    let mut removed = Vec::new();
    for name in stray_files(dir, expected) {
        match fs::remove_file(dir.join(&name)) {
            Ok(()) => {
                tracing::info!(file = %name, "removed extraneous file");
                removed.push(name);
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "could not remove extraneous file");
            }
        }
    }
    removed
}

/// Path of the output file a combination would produce.
pub fn output_path(dir: &Path, key: &SegmentKey) -> PathBuf {
    dir.join(key.output_file_name())
}

/// Resume check: true iff the combination's output file already exists.
/// Probe failures (other than plain absence) are downgraded to a warning and
/// treated as "not present", so the combination is resubmitted.
pub fn should_skip(dir: &Path, key: &SegmentKey) -> bool {
    let path = output_path(dir, key);
    match fs::metadata(&path) {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "existence check failed; treating as missing");
            false
        }
    }
}

/// Dry-run view of one reconciliation pass: nothing on disk is modified.
#[derive(Debug)]
pub struct SweepPlan {
    /// Total combinations in the sweep.
    pub total: usize,
    /// Expected output file names.
    pub expected: BTreeSet<String>,
    /// Files cleanup would delete.
    pub stray: Vec<String>,
    /// First few expected names, in enumeration order (for reporting).
    pub examples: Vec<String>,
    /// Combinations resume would skip.
    pub already_present: usize,
}

const PLAN_EXAMPLE_COUNT: usize = 5;

pub fn plan(dir: &Path, set: &AxisSet) -> SweepPlan {
    let expected = expected_set(set);
    let stray = stray_files(dir, &expected);
    let examples = set
        .combinations()
        .take(PLAN_EXAMPLE_COUNT)
        .map(|c| set.segment_key(&c).output_file_name())
        .collect();
    let on_disk: BTreeSet<String> = list_files(dir).into_iter().collect();
    let already_present = expected.iter().filter(|n| on_disk.contains(*n)).count();
    SweepPlan {
        total: set.combination_count(),
        expected,
        stray,
        examples,
        already_present,
    }
}

// ============================================================================
// Tests
// ============================================================================
