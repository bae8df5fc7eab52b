//! Corpus-wide cross-reference resolution.
//!
//! Resolution is split in two passes. Pass 1 ([SymbolTable::build]) runs once, after every
//! header has been parsed, and records the canonical path of every document number. The table
//! is then frozen: it only exposes `&self` methods and is shared as an `Arc` with every body
//! render (pass 2). Because references resolve to paths through a flat lookup, reference
//! cycles between documents need no special handling.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    document::{DocumentHeader, Status},
    error::DocumentError,
    paths::canonical_path,
};

/// URL scheme used by explicit cross-reference links: `[text](pep:8#section)`.
pub const LINK_SCHEME: &str = "pep:";

/// Bare prose mentions such as `PEP 8`.
static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bPEP\s+(\d{1,6})\b").expect("static regex is valid"));

/// One frozen entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub number: u32,
    pub title: String,
    pub status: Status,
    pub path: String,
}

/// Document number -> canonical path, built once per build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<u32, SymbolEntry>,
}

/// A resolved reference from one document to another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrossReference {
    pub source: u32,
    pub target: u32,
    pub fragment: Option<String>,
    pub url: String,
}

impl SymbolTable {
    /// Pass 1: record the canonical path of every parsed document.
    ///
    /// Callers are expected to have rejected duplicate numbers already; if one slips through,
    /// the last header wins.
    pub fn build<'a, I>(headers: I, site_root: &str) -> SymbolTable
    where
        I: IntoIterator<Item = &'a DocumentHeader>,
    {
        let entries = headers
            .into_iter()
            .map(|h| {
                (
                    h.number,
                    SymbolEntry {
                        number: h.number,
                        title: h.title.clone(),
                        status: h.status,
                        path: canonical_path(site_root, h.number),
                    },
                )
            })
            .collect::<BTreeMap<u32, SymbolEntry>>();
        tracing::debug!("[SymbolTable] froze {} entries", entries.len());
        SymbolTable { entries }
    }

    pub fn get(&self, number: u32) -> Option<&SymbolEntry> {
        self.entries.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.entries.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.values()
    }

    /// Resolve `target` (with an optional in-document fragment) as seen from `source`.
    pub fn resolve(
        &self,
        source: u32,
        target: u32,
        fragment: Option<&str>,
    ) -> Result<CrossReference, DocumentError> {
        let entry = self
            .get(target)
            .ok_or(DocumentError::UnresolvedReference { number: target })?;
        let fragment = fragment
            .map(|f| f.trim_start_matches('#'))
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string());
        let url = match &fragment {
            Some(f) => format!("{}#{}", entry.path, f),
            None => entry.path.clone(),
        };
        Ok(CrossReference {
            source,
            target,
            fragment,
            url,
        })
    }
}

/// A bare mention found in prose: byte range within the scanned text plus the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mention {
    pub start: usize,
    pub end: usize,
    pub number: u32,
}

/// Find every `PEP <n>` mention in a run of prose.
pub fn find_mentions(text: &str) -> Vec<Mention> {
    MENTION
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some(Mention {
                start: whole.start(),
                end: whole.end(),
                number,
            })
        })
        .collect()
}

/// Parse a `pep:<n>[#fragment]` link destination.
pub fn parse_link_target(dest: &str) -> Option<(u32, Option<&str>)> {
    let rest = dest.strip_prefix(LINK_SCHEME)?;
    let (number, fragment) = match rest.split_once('#') {
        Some((n, f)) => (n, Some(f)),
        None => (rest, None),
    };
    let number = number.trim().parse::<u32>().ok()?;
    Some((number, fragment))
}
