//! RFC-822 style metadata header parsing.
//!
//! A document starts with `Field: value` lines. Lines beginning with whitespace continue the
//! previous field. The first blank line ends the header; everything after it is the body.
//!
//! Parsing is pure: [parse_header] only inspects the text it is handed. Corpus-wide checks
//! (number uniqueness) belong to the compiler.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::{
    document::{Author, DocType, DocumentHeader, Status},
    error::HeaderError,
};

const DATE_FORMATS: &[&str] = &["%d-%b-%Y", "%Y-%m-%d"];

/// The raw `(name, value)` pairs of a header block plus the byte offset where the body starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHeader {
    pub fields: Vec<(String, String)>,
    pub body_offset: usize,
}

impl RawHeader {
    /// Case-insensitive lookup of a field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Split the header block off the document, without interpreting any field.
pub fn split_header(raw: &str) -> Result<RawHeader, HeaderError> {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut offset = 0;
    let mut body_offset = raw.len();

    for line in raw.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\n', '\r']);

        if text.trim().is_empty() {
            body_offset = offset;
            if fields.is_empty() {
                // Leading blank lines before the header are not a header.
                return Err(HeaderError::malformed(
                    "PEP",
                    "document does not start with a header block",
                ));
            }
            break;
        }

        if text.starts_with([' ', '\t']) {
            let Some((_, value)) = fields.last_mut() else {
                return Err(HeaderError::malformed(
                    text.trim(),
                    "continuation line without a preceding field",
                ));
            };
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(text.trim());
            continue;
        }

        let Some((name, value)) = text.split_once(':') else {
            return Err(HeaderError::malformed(
                text.trim(),
                format!("header line at byte {start} has no ':' separator"),
            ));
        };
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(HeaderError::malformed(
                text.trim(),
                "header field name is empty or contains whitespace",
            ));
        }
        if fields
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            return Err(HeaderError::malformed(
                name,
                "field declared more than once",
            ));
        }
        fields.push((name.to_string(), value.trim().to_string()));
    }

    if fields.is_empty() {
        return Err(HeaderError::malformed("PEP", "document has no header block"));
    }

    Ok(RawHeader {
        fields,
        body_offset,
    })
}

/// Best-effort extraction of the document number, used to detect duplicates among
/// documents whose header failed validation for other reasons.
pub fn peek_number(raw: &str) -> Option<u32> {
    let header = split_header(raw).ok()?;
    parse_number("PEP", header.get("PEP")?).ok()
}

/// Parse and validate the header of one document.
///
/// Returns the header and the remaining body text. Structural problems (missing required
/// fields, unparseable numbers or dates) are reported before enumerated-value problems, so a
/// document that is both malformed and has an unknown status is reported as malformed.
pub fn parse_header(raw: &str) -> Result<(DocumentHeader, &str), HeaderError> {
    let header = split_header(raw)?;
    let body = &raw[header.body_offset..];

    let number = parse_number("PEP", required(&header, "PEP")?)?;
    let title = required(&header, "Title")?.to_string();
    let authors = split_list(required(&header, "Author")?)
        .iter()
        .filter_map(|a| Author::parse(a))
        .collect::<Vec<Author>>();
    if authors.is_empty() {
        return Err(HeaderError::malformed("Author", "at least one author is required"));
    }
    let created = parse_date(required(&header, "Created")?)?;
    let requires = parse_number_list("Requires", header.get("Requires"))?;
    let replaces = parse_number_list("Replaces", header.get("Replaces"))?;
    let superseded_by = header
        .get("Superseded-By")
        .filter(|v| !v.is_empty())
        .map(|v| parse_number("Superseded-By", v))
        .transpose()?;
    let status_src = required(&header, "Status")?;
    let type_src = required(&header, "Type")?;

    let status = status_src.parse::<Status>()?;
    let doc_type = type_src.parse::<DocType>()?;

    let mut extra = BTreeMap::new();
    for (name, value) in header.fields.iter() {
        if !is_known_field(name) {
            extra.insert(name.clone(), value.clone());
        }
    }

    let doc = DocumentHeader {
        number,
        title,
        authors,
        status,
        doc_type,
        created,
        python_version: optional(&header, "Python-Version"),
        sponsor: header.get("Sponsor").and_then(Author::parse),
        delegate: header.get("PEP-Delegate").and_then(Author::parse),
        discussions_to: optional(&header, "Discussions-To"),
        topics: header.get("Topic").map(split_list).unwrap_or_default(),
        requires,
        replaces,
        superseded_by,
        post_history: optional(&header, "Post-History"),
        resolution: optional(&header, "Resolution"),
        extra,
    };
    Ok((doc, body))
}

const KNOWN_FIELDS: &[&str] = &[
    "PEP",
    "Title",
    "Author",
    "Sponsor",
    "PEP-Delegate",
    "Discussions-To",
    "Status",
    "Type",
    "Topic",
    "Requires",
    "Created",
    "Python-Version",
    "Post-History",
    "Replaces",
    "Superseded-By",
    "Resolution",
];

fn is_known_field(name: &str) -> bool {
    KNOWN_FIELDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

fn required<'a>(header: &'a RawHeader, field: &str) -> Result<&'a str, HeaderError> {
    match header.get(field) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(HeaderError::malformed(field, "required field is empty")),
        None => Err(HeaderError::malformed(field, "required field is missing")),
    }
}

fn optional(header: &RawHeader, field: &str) -> Option<String> {
    header
        .get(field)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn parse_number(field: &str, value: &str) -> Result<u32, HeaderError> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(HeaderError::malformed(field, "document numbers start at 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(HeaderError::malformed(
            field,
            format!("'{}' is not a document number: {e}", value.trim()),
        )),
    }
}

fn parse_number_list(field: &str, value: Option<&str>) -> Result<Vec<u32>, HeaderError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let mut numbers = split_list(value)
        .iter()
        .map(|n| parse_number(field, n))
        .collect::<Result<Vec<u32>, HeaderError>>()?;
    numbers.sort_unstable();
    numbers.dedup();
    Ok(numbers)
}

fn parse_date(value: &str) -> Result<NaiveDate, HeaderError> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| {
            HeaderError::malformed(
                "Created",
                format!("'{value}' is not a date (expected DD-Mon-YYYY or YYYY-MM-DD)"),
            )
        })
}

/// Split a comma-separated header value, ignoring commas inside `<...>` and `(...)`.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in value.chars() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    items.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "PEP: 8
Title: Style Guide for Python Code
Author: Guido van Rossum <guido@python.org>,
        Barry Warsaw <barry@python.org>
Status: Active
Type: Process
Created: 05-Jul-2001
Post-History: 05-Jul-2001, 01-Aug-2013
Replaces: 7
X-Custom: kept

Introduction
============
";

    #[test]
    fn test_parse_valid_header() {
        let (doc, body) = parse_header(VALID).unwrap();
        assert_eq!(doc.number, 8);
        assert_eq!(doc.title, "Style Guide for Python Code");
        assert_eq!(doc.authors.len(), 2);
        assert_eq!(doc.authors[1].name, "Barry Warsaw");
        assert_eq!(doc.status, Status::Active);
        assert_eq!(doc.doc_type, DocType::Process);
        assert_eq!(doc.created, NaiveDate::from_ymd_opt(2001, 7, 5).unwrap());
        assert_eq!(doc.replaces, vec![7]);
        assert_eq!(doc.post_history.as_deref(), Some("05-Jul-2001, 01-Aug-2013"));
        assert_eq!(doc.extra.get("X-Custom").map(String::as_str), Some("kept"));
        assert!(doc.python_version.is_none());
        assert!(body.starts_with("Introduction"));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        for field in ["PEP", "Title", "Author", "Status", "Type", "Created"] {
            let doc = VALID
                .lines()
                .filter(|l| !l.starts_with(&format!("{field}:")))
                .collect::<Vec<&str>>()
                .join("\n");
            let err = parse_header(&doc).unwrap_err();
            match err {
                HeaderError::MalformedHeader { field: f, .. } => assert_eq!(f, field),
                other => panic!("expected malformed {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_enum_values() {
        let doc = VALID.replace("Status: Active", "Status: Pending");
        assert!(matches!(
            parse_header(&doc),
            Err(HeaderError::InvalidEnumValue { ref field, .. }) if field == "Status"
        ));
        let doc = VALID.replace("Type: Process", "Type: Tutorial");
        assert!(matches!(
            parse_header(&doc),
            Err(HeaderError::InvalidEnumValue { ref field, .. }) if field == "Type"
        ));
    }

    #[test]
    fn test_malformed_wins_over_invalid_enum() {
        let doc = VALID
            .replace("Status: Active", "Status: Pending")
            .replace("Created: 05-Jul-2001", "Created: someday");
        assert!(parse_header(&doc).unwrap_err().is_malformed());
    }

    #[test]
    fn test_number_must_be_positive_integer() {
        assert!(parse_header(&VALID.replace("PEP: 8", "PEP: 0"))
            .unwrap_err()
            .is_malformed());
        assert!(parse_header(&VALID.replace("PEP: 8", "PEP: eight"))
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_iso_dates_accepted() {
        let doc = VALID.replace("05-Jul-2001", "2001-07-05");
        let (header, _) = parse_header(&doc).unwrap();
        assert_eq!(header.created, NaiveDate::from_ymd_opt(2001, 7, 5).unwrap());
    }

    #[test]
    fn test_duplicate_field_is_malformed() {
        let doc = VALID.replace("Type: Process", "Type: Process\nTitle: Again");
        assert!(parse_header(&doc).unwrap_err().is_malformed());
    }

    #[test]
    fn test_no_header_block() {
        assert!(parse_header("\nJust a body\n").unwrap_err().is_malformed());
        assert!(parse_header("").unwrap_err().is_malformed());
        assert!(parse_header("not a header line\n\nbody").unwrap_err().is_malformed());
    }

    #[test]
    fn test_header_without_body() {
        let doc = VALID.split("\n\n").next().unwrap();
        let (_, body) = parse_header(doc).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_peek_number_survives_invalid_enum() {
        let doc = VALID.replace("Status: Active", "Status: Pending");
        assert_eq!(peek_number(&doc), Some(8));
        assert_eq!(peek_number("garbage"), None);
    }

    #[test]
    fn test_split_list_respects_brackets() {
        assert_eq!(
            split_list("A <a@x.org>, b@x.org (B, Jr.), C"),
            vec!["A <a@x.org>", "b@x.org (B, Jr.)", "C"]
        );
        assert_eq!(split_list(" , "), Vec::<String>::new());
    }
}
