//! Domain entities and shared enums
//!
//! Wire-level names are bit-exact: enum values are the literal lowercase
//! strings and entity attributes keep their camelCase JSON names. Entities
//! are read-only facts supplied by the store; the core never mutates them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthzError;

/// Permissions that can be granted or denied on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanView,
    CanEdit,
    CanDelete,
    CanShare,
}

impl Permission {
    /// All four permissions, in declaration order.
    pub const ALL: [Permission; 4] = [
        Permission::CanView,
        Permission::CanEdit,
        Permission::CanDelete,
        Permission::CanShare,
    ];

    /// The wire-level name (`can_view`, `can_edit`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanView => "can_view",
            Permission::CanEdit => "can_edit",
            Permission::CanDelete => "can_delete",
            Permission::CanShare => "can_share",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_view" => Ok(Permission::CanView),
            "can_edit" => Ok(Permission::CanEdit),
            "can_delete" => Ok(Permission::CanDelete),
            "can_share" => Ok(Permission::CanShare),
            other => Err(AuthzError::Validation(format!("unknown action: {other}"))),
        }
    }
}

/// Whether a policy grants or denies its permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// User roles within a team or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(AuthzError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Project visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

impl FromStr for Visibility {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(AuthzError::Validation(format!("unknown visibility: {other}"))),
        }
    }
}

/// Subscription plan of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Pro,
    Enterprise,
}

impl FromStr for PlanType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanType::Free),
            "pro" => Ok(PlanType::Pro),
            "enterprise" => Ok(PlanType::Enterprise),
            other => Err(AuthzError::Validation(format!("unknown plan: {other}"))),
        }
    }
}

/// A user of the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// A team owning projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub plan: PlanType,
}

/// A project within a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub visibility: Visibility,
}

/// A document within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub project_id: String,
    pub creator_id: String,
    /// Soft-delete marker; a non-null value denies every permission.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public_link_enabled: bool,
}

impl Document {
    /// Whether the document has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A user's membership in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMembership {
    pub user_id: String,
    pub team_id: String,
    pub role: Role,
}

/// A user's membership in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMembership {
    pub user_id: String,
    pub project_id: String,
    pub role: Role,
}
