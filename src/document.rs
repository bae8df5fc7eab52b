//! Document metadata model: the validated header of one proposal document.
//!
//! A [DocumentHeader] is the product of [crate::codec::header::parse_header]. It is immutable
//! once parsed; every later stage of the build receives it by shared reference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::HeaderError;

/// Lifecycle state of a document.
///
/// Declaration order is the order status groups appear on the by-status index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    Active,
    Accepted,
    Deferred,
    Rejected,
    Withdrawn,
    Final,
    Superseded,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[
            Status::Draft,
            Status::Active,
            Status::Accepted,
            Status::Deferred,
            Status::Rejected,
            Status::Withdrawn,
            Status::Final,
            Status::Superseded,
        ]
    }

    /// Statuses directly reachable from this one.
    pub fn legal_transitions(&self) -> &'static [Status] {
        match self {
            Status::Draft => &[
                Status::Accepted,
                Status::Rejected,
                Status::Withdrawn,
                Status::Deferred,
                Status::Active,
                Status::Final,
            ],
            Status::Deferred => &[Status::Draft],
            Status::Accepted => &[Status::Final, Status::Rejected, Status::Superseded],
            Status::Active => &[Status::Withdrawn, Status::Superseded],
            Status::Final => &[Status::Superseded],
            Status::Rejected | Status::Withdrawn | Status::Superseded => &[],
        }
    }

    pub fn can_transition_to(&self, next: Status) -> bool {
        self.legal_transitions().contains(&next)
    }

    /// Whether `target` is reachable from this status through any sequence of legal
    /// transitions (including the empty sequence).
    pub fn can_reach(&self, target: Status) -> bool {
        let mut seen = vec![*self];
        let mut frontier = vec![*self];
        while let Some(current) = frontier.pop() {
            if current == target {
                return true;
            }
            for next in current.legal_transitions() {
                if !seen.contains(next) {
                    seen.push(*next);
                    frontier.push(*next);
                }
            }
        }
        false
    }

    pub fn is_terminal(&self) -> bool {
        self.legal_transitions().is_empty()
    }

    fn expected() -> String {
        Status::all()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<String>>()
            .join(", ")
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Status {
    type Err = HeaderError;

    fn from_str(src: &str) -> Result<Status, HeaderError> {
        Status::all()
            .iter()
            .find(|s| s.to_string() == src.trim())
            .copied()
            .ok_or_else(|| HeaderError::InvalidEnumValue {
                field: "Status".to_string(),
                value: src.trim().to_string(),
                expected: Status::expected(),
            })
    }
}

/// Document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "Standards Track")]
    StandardsTrack,
    Informational,
    Process,
}

impl DocType {
    pub fn all() -> &'static [DocType] {
        &[
            DocType::StandardsTrack,
            DocType::Informational,
            DocType::Process,
        ]
    }
}

impl Display for DocType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            DocType::StandardsTrack => write!(f, "Standards Track"),
            DocType::Informational => write!(f, "Informational"),
            DocType::Process => write!(f, "Process"),
        }
    }
}

impl FromStr for DocType {
    type Err = HeaderError;

    fn from_str(src: &str) -> Result<DocType, HeaderError> {
        match src.trim() {
            "Standards Track" | "Standards-Track" => Ok(DocType::StandardsTrack),
            "Informational" => Ok(DocType::Informational),
            "Process" => Ok(DocType::Process),
            other => Err(HeaderError::InvalidEnumValue {
                field: "Type".to_string(),
                value: other.to_string(),
                expected: "Standards Track, Informational, Process".to_string(),
            }),
        }
    }
}

/// One entry of the `Author` header.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub contact: Option<String>,
}

impl Author {
    /// Parse `Name <email>`, the legacy `email (Name)` form, or a bare name.
    pub fn parse(src: &str) -> Option<Author> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        if let (Some(open), true) = (src.find('<'), src.ends_with('>')) {
            let name = src[..open].trim();
            let contact = src[open + 1..src.len() - 1].trim();
            return Some(Author {
                name: if name.is_empty() { contact } else { name }.to_string(),
                contact: (!contact.is_empty()).then(|| contact.to_string()),
            });
        }
        if let (Some(open), true) = (src.find('('), src.ends_with(')')) {
            let contact = src[..open].trim();
            let name = src[open + 1..src.len() - 1].trim();
            if contact.contains('@') && !name.is_empty() {
                return Some(Author {
                    name: name.to_string(),
                    contact: Some(contact.to_string()),
                });
            }
        }
        Some(Author {
            name: src.to_string(),
            contact: None,
        })
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match &self.contact {
            Some(contact) => write!(f, "{} <{}>", self.name, contact),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The validated metadata block of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub number: u32,
    pub title: String,
    pub authors: Vec<Author>,
    pub status: Status,
    pub doc_type: DocType,
    pub created: NaiveDate,
    pub python_version: Option<String>,
    pub sponsor: Option<Author>,
    pub delegate: Option<Author>,
    pub discussions_to: Option<String>,
    pub topics: Vec<String>,
    pub requires: Vec<u32>,
    pub replaces: Vec<u32>,
    pub superseded_by: Option<u32>,
    pub post_history: Option<String>,
    pub resolution: Option<String>,
    /// Fields this parser does not interpret, keyed by field name.
    pub extra: BTreeMap<String, String>,
}

impl DocumentHeader {
    /// Every document number this header points at.
    pub fn referenced_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.requires
            .iter()
            .chain(self.replaces.iter())
            .chain(self.superseded_by.iter())
            .copied()
    }

    /// Non-fatal consistency problems between status, type and back-references.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.superseded_by.is_some() && !self.status.can_reach(Status::Superseded) {
            warnings.push(format!(
                "Superseded-By is set but status {} can never become Superseded",
                self.status
            ));
        }
        if self.status == Status::Active && self.doc_type == DocType::StandardsTrack {
            warnings.push(
                "Active status is reserved for Informational and Process documents".to_string(),
            );
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::header;

    #[test]
    fn test_status_parse_is_closed() {
        assert_eq!("Final".parse::<Status>().unwrap(), Status::Final);
        assert_eq!(" Draft ".parse::<Status>().unwrap(), Status::Draft);
        let err = "Provisional".parse::<Status>().unwrap_err();
        assert!(!err.is_malformed());
        assert!("final".parse::<Status>().is_err());
    }

    #[test]
    fn test_doc_type_accepts_both_spellings() {
        assert_eq!(
            "Standards-Track".parse::<DocType>().unwrap(),
            DocType::StandardsTrack
        );
        assert_eq!(
            "Standards Track".parse::<DocType>().unwrap(),
            DocType::StandardsTrack
        );
        assert!("Standards".parse::<DocType>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(Status::Draft.can_transition_to(Status::Accepted));
        assert!(!Status::Draft.can_transition_to(Status::Superseded));
        assert!(Status::Draft.can_reach(Status::Superseded));
        assert!(!Status::Rejected.can_reach(Status::Superseded));
        assert!(Status::Withdrawn.is_terminal());
        assert!(Status::Deferred.can_reach(Status::Final));
    }

    #[test]
    fn test_author_forms() {
        assert_eq!(
            Author::parse("Guido van Rossum <guido@python.org>"),
            Some(Author {
                name: "Guido van Rossum".to_string(),
                contact: Some("guido@python.org".to_string())
            })
        );
        assert_eq!(
            Author::parse("barry@python.org (Barry Warsaw)"),
            Some(Author {
                name: "Barry Warsaw".to_string(),
                contact: Some("barry@python.org".to_string())
            })
        );
        assert_eq!(
            Author::parse("Nick Coghlan"),
            Some(Author {
                name: "Nick Coghlan".to_string(),
                contact: None
            })
        );
        assert_eq!(Author::parse("  "), None);
    }

    #[test]
    fn test_superseded_by_needs_a_status_that_can_become_superseded() {
        for status in [Status::Rejected, Status::Withdrawn] {
            let doc = DocumentHeader {
                superseded_by: Some(8),
                ..header(1, "Gone", status)
            };
            let warnings = doc.consistency_warnings();
            assert_eq!(warnings.len(), 1, "{status}");
            assert!(warnings[0].contains("Superseded-By"));
        }
        for status in [Status::Superseded, Status::Draft, Status::Final, Status::Active] {
            let doc = DocumentHeader {
                superseded_by: Some(8),
                ..header(1, "Replaced", status)
            };
            assert!(doc.consistency_warnings().is_empty(), "{status}");
        }
        assert!(header(1, "Plain", Status::Rejected)
            .consistency_warnings()
            .is_empty());
    }

    #[test]
    fn test_active_is_not_for_standards_track() {
        let doc = DocumentHeader {
            doc_type: DocType::StandardsTrack,
            ..header(1, "Feature", Status::Active)
        };
        let warnings = doc.consistency_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Active"));

        assert!(header(1, "Guide", Status::Active)
            .consistency_warnings()
            .is_empty());
        let process = DocumentHeader {
            doc_type: DocType::Process,
            ..header(1, "Workflow", Status::Active)
        };
        assert!(process.consistency_warnings().is_empty());
        let final_feature = DocumentHeader {
            doc_type: DocType::StandardsTrack,
            ..header(1, "Feature", Status::Final)
        };
        assert!(final_feature.consistency_warnings().is_empty());
    }
}
