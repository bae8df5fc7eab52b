//! Shared test utilities for unit tests

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::document::{Author, DocType, DocumentHeader, Status};

/// Helper function to create a minimal valid header for testing
pub fn header(number: u32, title: &str, status: Status) -> DocumentHeader {
    DocumentHeader {
        number,
        title: title.to_string(),
        authors: vec![Author {
            name: "A. Author".to_string(),
            contact: None,
        }],
        status,
        doc_type: DocType::Informational,
        created: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        python_version: None,
        sponsor: None,
        delegate: None,
        discussions_to: None,
        topics: vec![],
        requires: vec![],
        replaces: vec![],
        superseded_by: None,
        post_history: None,
        resolution: None,
        extra: BTreeMap::new(),
    }
}

/// Helper function to create a header with a specific type and author list
pub fn header_with(
    number: u32,
    title: &str,
    status: Status,
    doc_type: DocType,
    authors: &[&str],
) -> DocumentHeader {
    DocumentHeader {
        doc_type,
        authors: authors
            .iter()
            .map(|a| Author {
                name: a.to_string(),
                contact: None,
            })
            .collect(),
        ..header(number, title, status)
    }
}

/// Render a complete source document from header fields and a body.
pub fn source_text(number: u32, title: &str, status: &str, body: &str) -> String {
    format!(
        "PEP: {number}\nTitle: {title}\nAuthor: A. Author <a@example.org>\nStatus: {status}\n\
         Type: Informational\nCreated: 01-Jan-2020\n\n{body}"
    )
}
