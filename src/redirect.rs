//! Legacy URL redirect table.
//!
//! Every document used to be reachable under a handful of historical URL shapes. For each
//! configured [LegacyShape] and each document the table holds one rule mapping the legacy
//! path to the canonical one, plus one catch-all per distinct prefix that sends the bare
//! prefix to the site root.
//!
//! The serving layer applies rules first-match-wins, so the table is totally ordered:
//! specificity (number of literal characters in the pattern) descending, then declaration
//! order. Per-document rules never overlap each other because the document number is
//! anchored on both sides, so for any legacy document URL exactly one rule matches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{cmp::Reverse, fmt::Write};

use crate::{error::SiteError, paths::normalize_site_root, xref::SymbolTable};

/// A historical URL shape. Prefixes are site-absolute paths without a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum LegacyShape {
    /// `<prefix>/pep-<n>/`
    FlatPrefix { prefix: String },
    /// `<prefix>/<YYYY>/pep-<n>/`
    DatedPrefix { prefix: String },
    /// `<prefix>/pep-<n>.html`
    NumericHtml { prefix: String },
}

pub fn default_shapes() -> Vec<LegacyShape> {
    vec![
        LegacyShape::FlatPrefix {
            prefix: "/dev/peps".to_string(),
        },
        LegacyShape::DatedPrefix {
            prefix: "/dev/peps".to_string(),
        },
        LegacyShape::NumericHtml {
            prefix: "/peps".to_string(),
        },
    ]
}

enum Piece<'a> {
    Literal(&'a str),
    Pattern(&'static str),
}

/// Anchored regex plus the number of literal characters it contains.
fn assemble(pieces: &[Piece<'_>]) -> (String, usize) {
    let mut pattern = String::from("^");
    let mut literal = 0;
    for piece in pieces {
        match piece {
            Piece::Literal(text) => {
                pattern.push_str(&regex::escape(text));
                literal += text.chars().count();
            }
            Piece::Pattern(re) => pattern.push_str(re),
        }
    }
    pattern.push('$');
    (pattern, literal)
}

impl LegacyShape {
    pub fn prefix(&self) -> &str {
        let prefix = match self {
            LegacyShape::FlatPrefix { prefix }
            | LegacyShape::DatedPrefix { prefix }
            | LegacyShape::NumericHtml { prefix } => prefix,
        };
        prefix.trim_end_matches('/')
    }

    fn document_pattern(&self, number: u32) -> (String, usize) {
        let prefix = self.prefix();
        let number = number.to_string();
        match self {
            LegacyShape::FlatPrefix { .. } => assemble(&[
                Piece::Literal(prefix),
                Piece::Literal("/pep-"),
                Piece::Pattern("0*"),
                Piece::Literal(&number),
                Piece::Pattern("/?"),
            ]),
            LegacyShape::DatedPrefix { .. } => assemble(&[
                Piece::Literal(prefix),
                Piece::Literal("/"),
                Piece::Pattern(r"\d{4}"),
                Piece::Literal("/pep-"),
                Piece::Pattern("0*"),
                Piece::Literal(&number),
                Piece::Pattern("/?"),
            ]),
            LegacyShape::NumericHtml { .. } => assemble(&[
                Piece::Literal(prefix),
                Piece::Literal("/pep-"),
                Piece::Pattern("0*"),
                Piece::Literal(&number),
                Piece::Literal(".html"),
            ]),
        }
    }

    /// A representative legacy URL for `number` in this shape.
    pub fn legacy_url(&self, number: u32, year: i32) -> String {
        let prefix = self.prefix();
        match self {
            LegacyShape::FlatPrefix { .. } => format!("{prefix}/pep-{number:04}/"),
            LegacyShape::DatedPrefix { .. } => format!("{prefix}/{year:04}/pep-{number:04}/"),
            LegacyShape::NumericHtml { .. } => format!("{prefix}/pep-{number:04}.html"),
        }
    }
}

/// One entry of the redirect manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    /// Anchored regular expression matched against the request path.
    pub pattern: String,
    pub target: String,
    /// Whether a `#fragment` on the legacy URL is appended to the target.
    pub fragment_preserving: bool,
    pub specificity: usize,
    /// Declaration order; the tie-break after specificity.
    pub order: usize,
}

/// The ordered, compiled rule list.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectTable {
    rules: Vec<RedirectRule>,
    #[serde(skip)]
    compiled: Vec<Regex>,
}

impl RedirectTable {
    pub fn build(
        symbols: &SymbolTable,
        shapes: &[LegacyShape],
        site_root: &str,
    ) -> Result<RedirectTable, SiteError> {
        let mut unique_shapes: Vec<&LegacyShape> = Vec::new();
        for shape in shapes {
            if !unique_shapes.contains(&shape) {
                unique_shapes.push(shape);
            }
        }

        let mut rules = Vec::new();
        for shape in unique_shapes.iter() {
            for entry in symbols.entries() {
                let (pattern, specificity) = shape.document_pattern(entry.number);
                rules.push(RedirectRule {
                    pattern,
                    target: entry.path.clone(),
                    fragment_preserving: true,
                    specificity,
                    order: rules.len(),
                });
            }
        }

        let root = normalize_site_root(site_root);
        let mut prefixes: Vec<&str> = Vec::new();
        for shape in unique_shapes.iter() {
            if !prefixes.contains(&shape.prefix()) {
                prefixes.push(shape.prefix());
            }
        }
        for prefix in prefixes {
            let (pattern, specificity) =
                assemble(&[Piece::Literal(prefix), Piece::Pattern("/?")]);
            rules.push(RedirectRule {
                pattern,
                target: root.clone(),
                fragment_preserving: true,
                specificity,
                order: rules.len(),
            });
        }

        rules.sort_by_key(|r| (Reverse(r.specificity), r.order));
        let compiled = rules
            .iter()
            .map(|r| Regex::new(&r.pattern))
            .collect::<Result<Vec<Regex>, regex::Error>>()?;
        // A rule matching its own target would answer the canonical URL with a 301 to itself.
        let (rules, compiled): (Vec<RedirectRule>, Vec<Regex>) = rules
            .into_iter()
            .zip(compiled)
            .filter(|(rule, re)| {
                let loops = re.is_match(&rule.target);
                if loops {
                    tracing::warn!(
                        "[Redirect] dropping rule {} -> {}: it matches its own target",
                        rule.pattern,
                        rule.target
                    );
                }
                !loops
            })
            .unzip();
        tracing::debug!("[Redirect] {} rules over {} shapes", rules.len(), unique_shapes.len());
        Ok(RedirectTable { rules, compiled })
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule whose pattern matches the path part of `url`, in evaluation order.
    pub fn matching_rules(&self, url: &str) -> Vec<&RedirectRule> {
        let path = request_path(url);
        self.rules
            .iter()
            .zip(self.compiled.iter())
            .filter(|(_, re)| re.is_match(path))
            .map(|(rule, _)| rule)
            .collect()
    }

    /// First-match-wins evaluation of a legacy URL, as the serving layer does it.
    pub fn resolve(&self, url: &str) -> Option<String> {
        let path = request_path(url);
        let fragment = url.split_once('#').map(|(_, f)| f);
        let (rule, _) = self
            .rules
            .iter()
            .zip(self.compiled.iter())
            .find(|(_, re)| re.is_match(path))?;
        let mut target = rule.target.clone();
        if let (true, Some(fragment)) = (rule.fragment_preserving, fragment) {
            target.push('#');
            target.push_str(fragment);
        }
        Some(target)
    }

    /// `redirects.json`: the ordered rule list.
    pub fn to_json(&self) -> Result<String, SiteError> {
        let mut out = serde_json::to_string_pretty(&self.rules)?;
        out.push('\n');
        Ok(out)
    }

    /// `redirects.nginx.conf`: one regex `location` per rule, in evaluation order.
    ///
    /// Browsers re-attach the fragment of the original URL to a redirect target that has
    /// none, so fragment-preserving rules need no extra configuration here.
    pub fn to_nginx(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "# Legacy URL redirects. Rules are listed in evaluation order.")?;
        for rule in self.rules.iter() {
            writeln!(
                out,
                "location ~ \"{}\" {{ return 301 {}; }}",
                rule.pattern.replace('"', "\\\""),
                rule.target
            )?;
        }
        Ok(out)
    }
}

fn request_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
