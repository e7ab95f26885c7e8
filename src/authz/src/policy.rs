//! Policy document model and schema validation
//!
//! Policy documents are the unit of storage: one per resource (keyed by its
//! URN) and optionally one per user. Parsing is strict — unknown fields are
//! rejected so a misspelled filter cannot be silently ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthzError, Result};
use crate::types::{Effect, Permission};
use crate::urn::ResourceUrn;

/// Comparison operators understood by the filter DSL.
///
/// The wire strings are the literal punctuation (`==`, `<>`, ...). An
/// operator outside this set fails document parsing with a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    /// `<>` — the property resolves to a non-null value
    #[serde(rename = "<>")]
    NotNull,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "has")]
    Has,
    #[serde(rename = "has not")]
    HasNot,
}

/// A single predicate evaluated against the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// Dot-separated property path (e.g. `user.id`, `document.creatorId`)
    pub prop: String,
    pub op: FilterOperator,
    /// Literal to compare against, or a property reference string
    pub value: Value,
}

impl Filter {
    pub fn new(prop: impl Into<String>, op: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            prop: prop.into(),
            op,
            value: value.into(),
        }
    }
}

/// Resource identification carried inside a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceInfo {
    /// Resource URN (`urn:resource:<teamId>:<projectId>:<docId>`)
    pub resource_id: String,
    pub creator_id: String,
}

/// A single policy: an optional filter guarding a set of permissions with
/// an allow/deny effect. An absent or empty filter matches unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<Filter>>,
    pub permissions: Vec<Permission>,
    pub effect: Effect,
}

/// Policy attached to a resource document.
pub type ResourcePolicy = Policy;

/// Policy attached to a user document. Same shape as [`ResourcePolicy`];
/// the two differ only in which document carries them.
pub type UserPolicy = Policy;

impl Policy {
    fn validate(&self, source: &str, idx: usize) -> Result<()> {
        if self.permissions.is_empty() {
            return Err(AuthzError::Validation(format!(
                "{source} policy {idx} declares no permissions"
            )));
        }

        if let Some(filters) = &self.filter {
            for (filter_idx, filter) in filters.iter().enumerate() {
                if filter.prop.trim().is_empty() {
                    return Err(AuthzError::Validation(format!(
                        "{source} policy {idx}, filter {filter_idx}: empty prop"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Complete policy document for a resource, keyed by
/// `resource.resourceId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcePolicyDocument {
    pub resource: ResourceInfo,
    pub policies: Vec<ResourcePolicy>,
}

impl ResourcePolicyDocument {
    /// Schema checks applied on ingest. A failing document is rejected
    /// whole; no partial write occurs.
    pub fn validate(&self) -> Result<()> {
        self.resource
            .resource_id
            .parse::<ResourceUrn>()
            .map_err(|e| AuthzError::Validation(e.to_string()))?;

        for (idx, policy) in self.policies.iter().enumerate() {
            policy.validate("resource", idx)?;
        }

        Ok(())
    }
}

/// Complete policy document for a user, keyed by the user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPolicyDocument {
    pub policies: Vec<UserPolicy>,
}

impl UserPolicyDocument {
    pub fn validate(&self) -> Result<()> {
        for (idx, policy) in self.policies.iter().enumerate() {
            policy.validate("user", idx)?;
        }
        Ok(())
    }
}
