//! Per-document parsing and rendering.
//!
//! A source document is a header block followed by a markup body. This module owns both
//! halves of turning one document into publishable HTML:
//!
//! - [`header`] splits the header block and validates it into a
//!   [`DocumentHeader`](crate::document::DocumentHeader).
//! - [`BodyCodec`] renders the body. Implementations receive a [`RenderContext`] carrying the
//!   frozen [`SymbolTable`], so a body can only read the corpus-wide table, never change it.
//! - [`highlight`] turns fenced code into class-based highlighted HTML.
//! - [`diagnostic`] collects per-document outcomes into a [`BuildSummary`].
//!
//! ## Built-in Codecs
//!
//! - **Markdown** (`.md`, `.txt`) - via [`md::MdCodec`]
//!
//! Custom codecs implement [`BodyCodec`]:
//!
//! ```rust
//! use pepsite::codec::{BodyCodec, RenderContext, RenderedBody};
//!
//! #[derive(Default, Clone)]
//! struct PreformattedCodec;
//!
//! impl BodyCodec for PreformattedCodec {
//!     fn render(&self, body: &str, _ctx: &RenderContext<'_>) -> RenderedBody {
//!         RenderedBody {
//!             html: format!("<pre>{}</pre>\n", pepsite::html::escape_html(body)),
//!             ..RenderedBody::default()
//!         }
//!     }
//! }
//! ```

use std::path::PathBuf;

use crate::{error::DocumentError, xref::CrossReference, xref::SymbolTable};

pub mod diagnostic;
pub mod header;
pub mod highlight;
pub mod md;

pub use diagnostic::{BuildStatus, BuildSummary, DocumentReport};
pub use header::{parse_header, peek_number};
pub use md::MdCodec;

/// Read-only inputs shared by every body render of one build.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Number of the document being rendered.
    pub number: u32,
    pub symbols: &'a SymbolTable,
}

/// Output of one body render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedBody {
    pub html: String,
    /// Resolved cross-references, in body order.
    pub references: Vec<CrossReference>,
    /// Local images referenced by the body, relative to the source document's directory.
    pub assets: Vec<PathBuf>,
    pub errors: Vec<DocumentError>,
}

impl RenderedBody {
    /// Whether any recorded error keeps the document out of the output tree.
    pub fn is_excluded(&self) -> bool {
        self.errors.iter().any(DocumentError::excludes_document)
    }
}

/// Converts a document body to an HTML fragment.
///
/// Rendering never fails as a whole: problems are reported through
/// [`RenderedBody::errors`], and the orchestrator decides from them whether the page is
/// published.
pub trait BodyCodec: Send + Sync {
    fn render(&self, body: &str, ctx: &RenderContext<'_>) -> RenderedBody;
}
