//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(&dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Copy a fixture corpus from `tests/<name>` into a fresh temp dir.
///
/// Returns the temp dir and the corpus directory inside it (`<temp_dir>/peps`).
#[allow(dead_code)]
pub fn fixture_corpus(name: &str) -> io::Result<(TempDir, PathBuf)> {
    let temp_dir = tempdir()?;
    let corpus = temp_dir.path().join("peps");
    let content_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join(name);
    tracing::debug!("Copying fixture corpus from {:?}", content_root);
    copy_dir_all(&content_root, &corpus)?;
    Ok((temp_dir, corpus))
}

/// A minimal, valid source document.
#[allow(dead_code)]
pub fn document(number: u32, title: &str, status: &str, body: &str) -> String {
    format!(
        "PEP: {number}\nTitle: {title}\nAuthor: Test Author <test@example.org>\nStatus: {status}\n\
         Type: Informational\nCreated: 01-Jan-2020\n\n{body}"
    )
}

/// Every file under `root`, keyed by relative path.
#[allow(dead_code)]
pub fn read_tree(root: &Path) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .to_path_buf();
            files.insert(relative, fs::read(entry.path())?);
        }
    }
    Ok(files)
}
