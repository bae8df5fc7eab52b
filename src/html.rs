//! HTML page assembly shared by document pages and index pages.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{
    config::BuildConfig,
    document::{Author, DocumentHeader},
    error::DocumentError,
    paths::normalize_site_root,
    xref::SymbolTable,
};

pub const STYLESHEET: &str = "style.css";

const BASE_CSS: &str = "\
body { font-family: system-ui, sans-serif; line-height: 1.5; margin: 0 auto; max-width: 52rem; padding: 0 1rem; }
nav.site-nav { border-bottom: 1px solid #ccc; padding: 0.5rem 0; }
dl.pep-header { display: grid; grid-template-columns: max-content auto; gap: 0.1rem 1rem; }
dl.pep-header dt { font-weight: bold; }
dl.pep-header dd { margin: 0; }
table.pep-index { border-collapse: collapse; width: 100%; }
table.pep-index td, table.pep-index th { border-bottom: 1px solid #eee; padding: 0.2rem 0.5rem; text-align: left; }
pre.code { overflow-x: auto; padding: 0.5rem; }
img.raster, img.vector { max-width: 100%; }
footer { border-top: 1px solid #ccc; color: #666; font-size: 0.9em; margin-top: 2rem; }
";

/// Escape text for use in HTML element content and double-quoted attribute values.
pub fn escape_html(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    for c in src.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Site-wide values every page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteContext {
    pub site_title: String,
    /// Always starts and ends with `/`.
    pub site_root: String,
    /// Absolute origin (no trailing `/`) used for canonical links and the sitemap.
    pub base_url: Option<String>,
    pub build_timestamp: Option<DateTime<Utc>>,
}

impl SiteContext {
    pub fn from_config(config: &BuildConfig) -> SiteContext {
        SiteContext {
            site_title: config.site_title.clone(),
            site_root: normalize_site_root(&config.site_root),
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            build_timestamp: config.build_timestamp,
        }
    }

    /// Absolute URL for a site-relative path, when a base URL is configured.
    pub fn absolute(&self, path: &str) -> Option<String> {
        self.base_url.as_ref().map(|base| format!("{base}{path}"))
    }

    pub fn href(&self, file: &str) -> String {
        format!("{}{}", self.site_root, file)
    }
}

/// Wrap a body fragment in the site layout.
///
/// `stamped` pages carry the build timestamp in their footer; document pages do not, so their
/// bytes only depend on the corpus.
pub fn write_page(
    out: &mut String,
    ctx: &SiteContext,
    title: &str,
    canonical_path: Option<&str>,
    body: &str,
    stamped: bool,
) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(
        out,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
    )?;
    writeln!(
        out,
        "<title>{} | {}</title>",
        escape_html(title),
        escape_html(&ctx.site_title)
    )?;
    writeln!(
        out,
        "<link rel=\"stylesheet\" href=\"{}\">",
        escape_html(&ctx.href(STYLESHEET))
    )?;
    if let Some(url) = canonical_path.and_then(|p| ctx.absolute(p)) {
        writeln!(out, "<link rel=\"canonical\" href=\"{}\">", escape_html(&url))?;
    }
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(
        out,
        "<nav class=\"site-nav\"><a href=\"{root}\">{title}</a> | \
         <a href=\"{root}index-by-status.html\">By status</a> | \
         <a href=\"{root}index-by-type.html\">By type</a> | \
         <a href=\"{root}index-by-author.html\">By author</a></nav>",
        root = escape_html(&ctx.site_root),
        title = escape_html(&ctx.site_title),
    )?;
    writeln!(out, "<main>")?;
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    writeln!(out, "</main>")?;
    if stamped {
        if let Some(ts) = ctx.build_timestamp {
            writeln!(
                out,
                "<footer>Built <time datetime=\"{0}\">{0}</time></footer>",
                ts.format("%Y-%m-%dT%H:%M:%SZ")
            )?;
        }
    }
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(())
}

fn write_author(out: &mut String, author: &Author) -> std::fmt::Result {
    match &author.contact {
        Some(contact) if contact.contains('@') => write!(
            out,
            "<a href=\"mailto:{}\">{}</a>",
            escape_html(contact),
            escape_html(&author.name)
        ),
        Some(contact) if contact.starts_with("http") => write!(
            out,
            "<a href=\"{}\">{}</a>",
            escape_html(contact),
            escape_html(&author.name)
        ),
        _ => write!(out, "{}", escape_html(&author.name)),
    }
}

fn write_row(out: &mut String, name: &str, value_html: &str) -> std::fmt::Result {
    writeln!(out, "<dt>{}</dt><dd>{}</dd>", escape_html(name), value_html)
}

fn linked_numbers(
    out: &mut String,
    source: u32,
    numbers: &[u32],
    table: &SymbolTable,
    errors: &mut Vec<DocumentError>,
) -> std::fmt::Result {
    for (i, number) in numbers.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match table.resolve(source, *number, None) {
            Ok(xref) => {
                let title = table
                    .get(*number)
                    .map(|e| e.title.as_str())
                    .unwrap_or_default();
                write!(
                    out,
                    "<a class=\"pep reference\" href=\"{}\" title=\"{}\">{}</a>",
                    escape_html(&xref.url),
                    escape_html(title),
                    number
                )?;
            }
            Err(e) => {
                errors.push(e);
                write!(out, "{number}")?;
            }
        }
    }
    Ok(())
}

/// Render the metadata block shown at the top of a document page. Back-references that do
/// not resolve are rendered as plain numbers and reported through `errors`.
pub fn header_table(
    header: &DocumentHeader,
    table: &SymbolTable,
    errors: &mut Vec<DocumentError>,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "<dl class=\"pep-header\">")?;
    write_row(&mut out, "PEP", &header.number.to_string())?;
    write_row(&mut out, "Title", &escape_html(&header.title))?;

    let mut authors = String::new();
    for (i, author) in header.authors.iter().enumerate() {
        if i > 0 {
            authors.push_str(", ");
        }
        write_author(&mut authors, author)?;
    }
    write_row(&mut out, "Author", &authors)?;

    for (name, person) in [("Sponsor", &header.sponsor), ("PEP-Delegate", &header.delegate)] {
        if let Some(person) = person {
            let mut value = String::new();
            write_author(&mut value, person)?;
            write_row(&mut out, name, &value)?;
        }
    }
    if let Some(discussions) = &header.discussions_to {
        write_row(&mut out, "Discussions-To", &escape_html(discussions))?;
    }
    write_row(
        &mut out,
        "Status",
        &format!(
            "<abbr class=\"status-{}\">{}</abbr>",
            header.status.to_string().to_lowercase(),
            header.status
        ),
    )?;
    write_row(&mut out, "Type", &escape_html(&header.doc_type.to_string()))?;
    if !header.topics.is_empty() {
        write_row(&mut out, "Topic", &escape_html(&header.topics.join(", ")))?;
    }
    if !header.requires.is_empty() {
        let mut value = String::new();
        linked_numbers(&mut value, header.number, &header.requires, table, errors)?;
        write_row(&mut out, "Requires", &value)?;
    }
    write_row(
        &mut out,
        "Created",
        &header.created.format("%d-%b-%Y").to_string(),
    )?;
    if let Some(version) = &header.python_version {
        write_row(&mut out, "Python-Version", &escape_html(version))?;
    }
    if let Some(history) = &header.post_history {
        write_row(&mut out, "Post-History", &escape_html(history))?;
    }
    if !header.replaces.is_empty() {
        let mut value = String::new();
        linked_numbers(&mut value, header.number, &header.replaces, table, errors)?;
        write_row(&mut out, "Replaces", &value)?;
    }
    if let Some(successor) = header.superseded_by {
        let mut value = String::new();
        linked_numbers(&mut value, header.number, &[successor], table, errors)?;
        write_row(&mut out, "Superseded-By", &value)?;
    }
    if let Some(resolution) = &header.resolution {
        write_row(&mut out, "Resolution", &escape_html(resolution))?;
    }
    for (name, value) in header.extra.iter() {
        write_row(&mut out, name, &escape_html(value))?;
    }
    writeln!(out, "</dl>")?;
    Ok(out)
}

/// The site stylesheet: base layout rules followed by the highlighting theme.
pub fn stylesheet(theme_css: &str) -> String {
    format!("{BASE_CSS}\n/* code highlighting */\n{theme_css}")
}
