//! Corpus-wide listing pages.
//!
//! Indexes are built from parsed headers only, never from rendered bodies, so they can be
//! produced while bodies are still rendering. Every page is a function of the header set:
//! groups come in a fixed order and entries are sorted by number, whatever order the
//! documents were discovered in.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Write};

use crate::{
    document::{DocType, DocumentHeader, Status},
    html::{escape_html, write_page, SiteContext},
    paths::{canonical_path, to_anchor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    Numerical,
    ByStatus,
    ByType,
    ByAuthor,
}

impl IndexKind {
    pub fn all() -> &'static [IndexKind] {
        &[
            IndexKind::Numerical,
            IndexKind::ByStatus,
            IndexKind::ByType,
            IndexKind::ByAuthor,
        ]
    }

    /// Output file, relative to the output directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            IndexKind::Numerical => "index.html",
            IndexKind::ByStatus => "index-by-status.html",
            IndexKind::ByType => "index-by-type.html",
            IndexKind::ByAuthor => "index-by-author.html",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            IndexKind::Numerical => "Numerical Index",
            IndexKind::ByStatus => "Index by Status",
            IndexKind::ByType => "Index by Type",
            IndexKind::ByAuthor => "Index by Author",
        }
    }
}

/// One listed document: (number, title, status) plus its link target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexEntry {
    pub number: u32,
    pub title: String,
    pub status: Status,
    pub path: String,
}

impl IndexEntry {
    fn from_header(header: &DocumentHeader, site_root: &str) -> Self {
        IndexEntry {
            number: header.number,
            title: header.title.clone(),
            status: header.status,
            path: canonical_path(site_root, header.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexGroup {
    pub heading: String,
    /// Sorted by number ascending.
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    pub kind: IndexKind,
    /// Empty groups are omitted.
    pub groups: Vec<IndexGroup>,
}

fn sorted(mut entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    entries.sort();
    entries.dedup_by_key(|e| e.number);
    entries
}

fn grouped<K: Ord, F>(entries: &[(K, IndexEntry)], heading: F) -> Vec<IndexGroup>
where
    F: Fn(&K) -> String,
{
    let mut groups: BTreeMap<&K, Vec<IndexEntry>> = BTreeMap::new();
    for (key, entry) in entries.iter() {
        groups.entry(key).or_default().push(entry.clone());
    }
    groups
        .into_iter()
        .map(|(key, entries)| IndexGroup {
            heading: heading(key),
            entries: sorted(entries),
        })
        .collect()
}

/// Build every listing page for a set of headers.
pub fn build_indexes<'a, I>(headers: I, site_root: &str) -> Vec<IndexPage>
where
    I: IntoIterator<Item = &'a DocumentHeader>,
{
    let headers = headers.into_iter().collect::<Vec<&DocumentHeader>>();
    let entries = headers
        .iter()
        .map(|h| IndexEntry::from_header(h, site_root))
        .collect::<Vec<IndexEntry>>();

    let by_status = headers
        .iter()
        .zip(entries.iter())
        .map(|(h, e)| (h.status, e.clone()))
        .collect::<Vec<(Status, IndexEntry)>>();
    let by_type = headers
        .iter()
        .zip(entries.iter())
        .map(|(h, e)| (h.doc_type, e.clone()))
        .collect::<Vec<(DocType, IndexEntry)>>();
    let by_author = headers
        .iter()
        .zip(entries.iter())
        .flat_map(|(h, e)| h.authors.iter().map(move |a| (a.name.clone(), e.clone())))
        .collect::<Vec<(String, IndexEntry)>>();

    let pages = vec![
        IndexPage {
            kind: IndexKind::Numerical,
            groups: if entries.is_empty() {
                vec![]
            } else {
                vec![IndexGroup {
                    heading: "All documents".to_string(),
                    entries: sorted(entries.clone()),
                }]
            },
        },
        IndexPage {
            kind: IndexKind::ByStatus,
            groups: grouped(&by_status, |s| s.to_string()),
        },
        IndexPage {
            kind: IndexKind::ByType,
            groups: grouped(&by_type, |t| t.to_string()),
        },
        IndexPage {
            kind: IndexKind::ByAuthor,
            groups: grouped(&by_author, |name| name.clone()),
        },
    ];
    tracing::debug!("[Index] built {} listing pages over {} documents", pages.len(), headers.len());
    pages
}

impl IndexPage {
    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }

    /// Complete HTML page. The build timestamp, if any, only appears in the footer.
    pub fn render(&self, ctx: &SiteContext) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        writeln!(body, "<h1>{}</h1>", escape_html(self.kind.title()))?;
        if self.groups.is_empty() {
            writeln!(body, "<p>No documents.</p>")?;
        }
        for group in self.groups.iter() {
            if self.kind != IndexKind::Numerical {
                writeln!(
                    body,
                    "<h2 id=\"{}\">{}</h2>",
                    escape_html(&to_anchor(&group.heading)),
                    escape_html(&group.heading)
                )?;
            }
            writeln!(body, "<table class=\"pep-index\">")?;
            writeln!(
                body,
                "<thead><tr><th>PEP</th><th>Title</th><th>Status</th></tr></thead>"
            )?;
            writeln!(body, "<tbody>")?;
            for entry in group.entries.iter() {
                writeln!(
                    body,
                    "<tr><td><a href=\"{path}\">{number}</a></td><td><a href=\"{path}\">{title}</a></td><td>{status}</td></tr>",
                    path = escape_html(&entry.path),
                    number = entry.number,
                    title = escape_html(&entry.title),
                    status = entry.status,
                )?;
            }
            writeln!(body, "</tbody>")?;
            writeln!(body, "</table>")?;
        }
        let mut out = String::new();
        let canonical = ctx.href(self.file_name());
        write_page(&mut out, ctx, self.kind.title(), Some(&canonical), &body, true)?;
        Ok(out)
    }
}

/// One document in the machine-readable listing (`api/peps.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEntry {
    pub number: u32,
    pub title: String,
    pub authors: Vec<String>,
    pub status: Status,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub created: String,
    pub python_version: Option<String>,
    pub superseded_by: Option<u32>,
    pub url: String,
}

/// The machine-readable listing, keyed by number.
pub fn api_listing<'a, I>(headers: I, ctx: &SiteContext) -> BTreeMap<u32, ApiEntry>
where
    I: IntoIterator<Item = &'a DocumentHeader>,
{
    headers
        .into_iter()
        .map(|h| {
            let path = canonical_path(&ctx.site_root, h.number);
            (
                h.number,
                ApiEntry {
                    number: h.number,
                    title: h.title.clone(),
                    authors: h.authors.iter().map(|a| a.name.clone()).collect(),
                    status: h.status,
                    doc_type: h.doc_type,
                    created: h.created.format("%Y-%m-%d").to_string(),
                    python_version: h.python_version.clone(),
                    superseded_by: h.superseded_by,
                    url: ctx.absolute(&path).unwrap_or(path),
                },
            )
        })
        .collect()
}

/// `sitemap.xml` listing the index pages and every given document. Only available with a
/// base URL, since sitemap locations must be absolute.
pub fn sitemap<I>(numbers: I, ctx: &SiteContext) -> Option<String>
where
    I: IntoIterator<Item = u32>,
{
    ctx.base_url.as_ref()?;
    let mut numbers = numbers.into_iter().collect::<Vec<u32>>();
    numbers.sort_unstable();
    numbers.dedup();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    let locations = IndexKind::all()
        .iter()
        .map(|k| ctx.href(k.file_name()))
        .chain(numbers.iter().map(|n| canonical_path(&ctx.site_root, *n)));
    for path in locations {
        if let Some(url) = ctx.absolute(&path) {
            out.push_str(&format!("  <url><loc>{}</loc></url>\n", escape_html(&url)));
        }
    }
    out.push_str("</urlset>\n");
    Some(out)
}
