use std::{fmt, io, path::PathBuf};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Top level error for everything that can stop a build or a library call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SiteError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Build aborted by {} corpus error(s)", .0.len())]
    Corpus(Vec<CorpusError>),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Rendering error: {0}")]
    Render(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Worker pool error: {0}")]
    Worker(String),
}

impl SiteError {
    /// The fatal corpus errors carried by this error, if it is a corpus failure.
    pub fn corpus_errors(&self) -> &[CorpusError] {
        match self {
            SiteError::Corpus(errors) => errors,
            _ => &[],
        }
    }
}

/// Corpus-level invariant violations. Any one of these aborts the build before output is
/// written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Error)]
pub enum CorpusError {
    #[error("{}: unreadable document: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("{}: {error}", .path.display())]
    MalformedHeader { path: PathBuf, error: HeaderError },
    #[error("number {number} is declared by {} documents: {}", .paths.len(), display_paths(.paths))]
    DuplicateNumber { number: u32, paths: Vec<PathBuf> },
}

impl CorpusError {
    /// Sort key used to list fatal errors deterministically.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            CorpusError::Unreadable { path, .. } => Some(path),
            CorpusError::MalformedHeader { path, .. } => Some(path),
            CorpusError::DuplicateNumber { paths, .. } => paths.first(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// Failures produced by the header parser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Error)]
pub enum HeaderError {
    #[error("malformed header field '{field}': {reason}")]
    MalformedHeader { field: String, reason: String },
    #[error("invalid value '{value}' for header field '{field}' (expected one of: {expected})")]
    InvalidEnumValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl HeaderError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HeaderError::MalformedHeader {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, HeaderError::MalformedHeader { .. })
    }
}

/// Recoverable, per-document problems. They are accumulated in the build summary; only some
/// of them keep the document out of the output tree (see [DocumentError::excludes_document]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Error)]
pub enum DocumentError {
    #[error("invalid value '{value}' for header field '{field}' (expected one of: {expected})")]
    InvalidEnumValue {
        field: String,
        value: String,
        expected: String,
    },
    #[error("inconsistent header: {0}")]
    InconsistentHeader(String),
    #[error("reference to unknown document {number}")]
    UnresolvedReference { number: u32 },
    #[error("footnote [^{label}] is referenced but never defined")]
    UndefinedFootnote { label: String },
    #[error("image '{src}' cannot be published: {reason}")]
    MissingAsset { src: String, reason: String },
    #[error("markup rendering failed: {0}")]
    Render(String),
}

impl DocumentError {
    /// Whether this error keeps the document out of the output tree.
    pub fn excludes_document(&self) -> bool {
        matches!(
            self,
            DocumentError::InvalidEnumValue { .. } | DocumentError::Render(_)
        )
    }
}

impl From<toml::de::Error> for SiteError {
    fn from(src: toml::de::Error) -> SiteError {
        SiteError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for SiteError {
    fn from(src: toml::ser::Error) -> SiteError {
        SiteError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for SiteError {
    fn from(src: JsonError) -> SiteError {
        SiteError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for SiteError {
    fn from(src: UrlParseError) -> SiteError {
        SiteError::Config(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for SiteError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SiteError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => SiteError::PermissionDenied,
            _ => SiteError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for SiteError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => SiteError::from(io_error),
            None => SiteError::Io("directory walk failed (filesystem loop)".to_string()),
        }
    }
}

impl From<fmt::Error> for SiteError {
    fn from(x: fmt::Error) -> Self {
        SiteError::Render(format!("{x}"))
    }
}

impl From<syntect::Error> for SiteError {
    fn from(x: syntect::Error) -> Self {
        SiteError::Render(format!("Highlighter error: {x}"))
    }
}

impl From<RegexError> for SiteError {
    fn from(x: RegexError) -> Self {
        SiteError::Serialization(format!("Regex parse failed: {x}"))
    }
}

impl From<rayon::ThreadPoolBuildError> for SiteError {
    fn from(x: rayon::ThreadPoolBuildError) -> Self {
        SiteError::Worker(format!("{x}"))
    }
}
