//! # pepsite
//!
//! A deterministic compiler from a corpus of proposal documents to a static HTML site, plus
//! a redirect manifest for the URLs those documents used to live at.
//!
//! ## Overview
//!
//! Each proposal is a plaintext file: an RFC-822 style header block (`PEP: 8`, `Title: ...`,
//! `Status: Final`, ...) followed by a CommonMark body. pepsite reads the whole corpus,
//! validates every header, resolves cross-references between documents, and writes:
//!
//! - one page per document at its canonical location (`pep-0008/index.html`),
//! - listing pages (`index.html`, `index-by-status.html`, `index-by-type.html`,
//!   `index-by-author.html`),
//! - `api/peps.json`, `style.css` and, with a base URL, `sitemap.xml`,
//! - `redirects.json` and `redirects.nginx.conf`, mapping legacy URL shapes to canonical paths.
//!
//! The same corpus always produces byte-identical output, whatever order the files are
//! discovered in. The only wall-clock input is an optional build timestamp
//! ([`config::BuildConfig::build_timestamp`], or `SOURCE_DATE_EPOCH`), shown on index pages.
//!
//! ## Architecture
//!
//! - **[`codec`]**: Header parsing ([`codec::header`]), the [`codec::BodyCodec`] trait and its
//!   Markdown implementation, code highlighting, per-document diagnostics
//! - **[`document`]**: The validated header model (`DocumentHeader`, `Status`, `DocType`)
//! - **[`xref`]**: The frozen corpus-wide `SymbolTable` and reference resolution
//! - **[`index`]**: Listing pages, the JSON listing and the sitemap
//! - **[`redirect`]**: The ordered legacy URL redirect table
//! - **[`compiler`]**: `SiteCompiler`, which drives a build end to end
//! - **[`paths`]**: Canonical slugs and output locations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pepsite::{compiler::SiteCompiler, config::BuildConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let compiler = SiteCompiler::new(BuildConfig::new("./peps", "./build"))?;
//!     let summary = compiler.build().await?;
//!     println!("{summary}");
//!     std::process::exit(summary.status().exit_code().into());
//! }
//! ```
//!
//! ## Errors
//!
//! Problems come in two kinds:
//!
//! - [`CorpusError`]: duplicate document numbers, unreadable files, malformed headers. Any
//!   of these aborts the build before a single file is written; all of them are reported
//!   together as [`SiteError::Corpus`].
//! - [`DocumentError`]: unresolved references, unknown status or type values, rendering
//!   failures and the like. These are recorded per document in the
//!   [`codec::BuildSummary`]; the rest of the corpus is still published.
//!
//! ## Features
//!
//! - **default**: The library
//! - **bin**: The `pepsite` command line tool

pub mod codec;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod html;
pub mod index;
pub mod paths;
pub mod redirect;
#[cfg(test)]
mod tests;
pub mod xref;

pub use error::*;
