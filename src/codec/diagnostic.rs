//! Per-document outcomes of a build.
//!
//! A build never uses control flow to skip a document. Every discovered document produces
//! exactly one [`DocumentReport`], tagged published or skipped, and the reports are collected
//! into a [`BuildSummary`] that is returned even when some documents failed.

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::error::DocumentError;

/// Outcome of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Source file, relative to the source directory.
    pub path: PathBuf,
    /// `None` only when the header could not be read far enough to find the number.
    pub number: Option<u32>,
    /// Whether a page was produced for this document.
    pub published: bool,
    /// Sorted and free of duplicates.
    pub errors: Vec<DocumentError>,
}

impl DocumentReport {
    pub fn new(path: PathBuf, number: Option<u32>, mut errors: Vec<DocumentError>) -> Self {
        errors.sort();
        errors.dedup();
        let published = !errors.iter().any(DocumentError::excludes_document);
        DocumentReport {
            path,
            number,
            published,
            errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.number {
            Some(n) => format!("PEP {n}"),
            None => "PEP ?".to_string(),
        };
        let state = if self.published { "published" } else { "skipped" };
        write!(f, "{label} ({}) {state}", self.path.display())?;
        for error in self.errors.iter() {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// How a build that was not aborted ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    Clean,
    Warnings,
}

impl BuildStatus {
    /// Process exit status. Fatal corpus errors exit with `1` and never produce a summary.
    pub fn exit_code(&self) -> u8 {
        match self {
            BuildStatus::Clean => 0,
            BuildStatus::Warnings => 2,
        }
    }
}

/// Everything a finished build reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// One report per discovered document, ordered by number then path.
    pub reports: Vec<DocumentReport>,
    /// Files written to the output directory, including indexes and manifests.
    pub files_written: usize,
    pub redirect_rules: usize,
}

impl BuildSummary {
    pub fn published(&self) -> impl Iterator<Item = &DocumentReport> {
        self.reports.iter().filter(|r| r.published)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &DocumentReport> {
        self.reports.iter().filter(|r| !r.published)
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    pub fn errors_for(&self, number: u32) -> Vec<&DocumentError> {
        self.reports
            .iter()
            .filter(|r| r.number == Some(number))
            .flat_map(|r| r.errors.iter())
            .collect()
    }

    pub fn status(&self) -> BuildStatus {
        if self.warning_count() == 0 {
            BuildStatus::Clean
        } else {
            BuildStatus::Warnings
        }
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} document(s): {} published, {} skipped, {} warning(s); {} file(s) written, {} redirect rule(s)",
            self.reports.len(),
            self.published().count(),
            self.skipped().count(),
            self.warning_count(),
            self.files_written,
            self.redirect_rules
        )?;
        for report in self.reports.iter().filter(|r| !r.is_clean()) {
            writeln!(f, "{report}")?;
        }
        Ok(())
    }
}
