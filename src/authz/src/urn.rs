//! Resource URN parsing and formatting
//!
//! Resources are addressed as `urn:resource:<teamId>:<projectId>:<docId>`
//! where every id matches `[A-Za-z0-9]+`. Anything else is a validation
//! failure, never a not-found.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const URN_SCHEME: &str = "urn";
const URN_NAMESPACE: &str = "resource";

/// Error returned when a resource URN does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resourceId '{0}': expected urn:resource:<teamId>:<projectId>:<docId>")]
pub struct UrnParseError(String);

/// Parsed `urn:resource:<teamId>:<projectId>:<docId>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUrn {
    team_id: String,
    project_id: String,
    doc_id: String,
}

impl ResourceUrn {
    /// Assemble a URN from raw ids, validating each segment.
    pub fn new(
        team_id: impl Into<String>,
        project_id: impl Into<String>,
        doc_id: impl Into<String>,
    ) -> Result<Self, UrnParseError> {
        let urn = Self {
            team_id: team_id.into(),
            project_id: project_id.into(),
            doc_id: doc_id.into(),
        };
        for segment in [&urn.team_id, &urn.project_id, &urn.doc_id] {
            if !is_valid_id(segment) {
                return Err(UrnParseError(urn.to_string()));
            }
        }
        Ok(urn)
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }
}

impl FromStr for ResourceUrn {
    type Err = UrnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || UrnParseError(s.to_string());
        let mut parts = s.split(':');

        if parts.next() != Some(URN_SCHEME) || parts.next() != Some(URN_NAMESPACE) {
            return Err(err());
        }

        let team_id = parts.next().filter(|id| is_valid_id(id)).ok_or_else(err)?;
        let project_id = parts.next().filter(|id| is_valid_id(id)).ok_or_else(err)?;
        let doc_id = parts.next().filter(|id| is_valid_id(id)).ok_or_else(err)?;

        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self {
            team_id: team_id.to_string(),
            project_id: project_id.to_string(),
            doc_id: doc_id.to_string(),
        })
    }
}

impl fmt::Display for ResourceUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{URN_SCHEME}:{URN_NAMESPACE}:{}:{}:{}",
            self.team_id, self.project_id, self.doc_id
        )
    }
}

fn is_valid_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric())
}
