//! Evaluation context assembly
//!
//! The context is the nested attribute map filter properties resolve
//! against. Top-level keys are `user` and `document` (always present) plus
//! `team`, `project`, `teamMembership` and `projectMembership` when the
//! caller supplied those entities. A missing entity leaves its key absent —
//! not present-with-null — so property resolution yields null for it.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{Document, Project, ProjectMembership, Team, TeamMembership, User};

/// Context containing the entity attributes visible to filter evaluation.
///
/// Attribute names inside each entry are exactly the entities' JSON names
/// (`creatorId`, `publicLinkEnabled`, ...), since entities are converted
/// through their serde representation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    vars: Map<String, Value>,
}

impl EvalContext {
    /// Create a context from the two always-present entities.
    pub fn new(user: &User, document: &Document) -> Self {
        let mut vars = Map::new();
        vars.insert("user".to_string(), to_attributes(user));
        vars.insert("document".to_string(), to_attributes(document));
        Self { vars }
    }

    /// Add the owning team; no-op when absent.
    pub fn with_team(mut self, team: Option<&Team>) -> Self {
        if let Some(team) = team {
            self.vars.insert("team".to_string(), to_attributes(team));
        }
        self
    }

    /// Add the owning project; no-op when absent.
    pub fn with_project(mut self, project: Option<&Project>) -> Self {
        if let Some(project) = project {
            self.vars.insert("project".to_string(), to_attributes(project));
        }
        self
    }

    /// Add the user's team membership; no-op when absent.
    pub fn with_team_membership(mut self, membership: Option<&TeamMembership>) -> Self {
        if let Some(membership) = membership {
            self.vars
                .insert("teamMembership".to_string(), to_attributes(membership));
        }
        self
    }

    /// Add the user's project membership; no-op when absent.
    pub fn with_project_membership(mut self, membership: Option<&ProjectMembership>) -> Self {
        if let Some(membership) = membership {
            self.vars
                .insert("projectMembership".to_string(), to_attributes(membership));
        }
        self
    }

    /// Assemble a context from raw top-level entries. Useful for callers
    /// that already hold JSON attribute maps.
    pub fn from_map(vars: Map<String, Value>) -> Self {
        Self { vars }
    }

    /// Top-level entries, keyed by context name.
    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Whether `key` names a top-level context entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }
}

fn to_attributes<T: Serialize>(entity: &T) -> Value {
    serde_json::to_value(entity).unwrap_or(Value::Null)
}
