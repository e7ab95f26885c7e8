//! # Permission Control Service
//!
//! Attribute-based access control for documents organized into projects
//! and teams. Given a `(user, resource, action)` triple, the engine
//! returns an allow/deny decision by interpreting JSON policy documents
//! attached to resources (and optionally to users) against a context
//! assembled from the domain entities.
//!
//! The crate is built around four pieces:
//!
//! - [`context::EvalContext`] — assembles the nested attribute map filters
//!   resolve against.
//! - [`filter::FilterEngine`] — interprets `{prop, op, value}` predicates.
//! - [`evaluator::Evaluator`] — combines policies with deny-wins
//!   precedence and a soft-delete gate.
//! - [`builder::Builder`] / [`engine::PermissionEngine`] — validate and
//!   upconvert policy documents and drive decisions against a [`Store`].
//!
//! ## Example
//!
//! ```rust
//! use permctl_authz::{
//!     Builder, Document, Evaluator, Permission, PermissionRequest, User,
//! };
//!
//! let user = User {
//!     id: "creator1".to_string(),
//!     email: "creator1@example.com".to_string(),
//!     name: "Creator".to_string(),
//! };
//! let document = Document {
//!     id: "doc1".to_string(),
//!     title: "Launch plan".to_string(),
//!     project_id: "proj1".to_string(),
//!     creator_id: "creator1".to_string(),
//!     deleted_at: None,
//!     public_link_enabled: false,
//! };
//! let policy = Builder::new()
//!     .create_creator_policy("urn:resource:team1:proj1:doc1", "creator1");
//!
//! let result = Evaluator::new().evaluate_permission(&PermissionRequest {
//!     user: &user,
//!     document: &document,
//!     permission: Permission::CanEdit,
//!     resource_policy: Some(&policy),
//!     user_policy: None,
//!     team: None,
//!     project: None,
//!     team_membership: None,
//!     project_membership: None,
//! });
//!
//! assert!(result.allowed);
//! ```

pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod policy;
pub mod store;
pub mod types;
pub mod urn;

// Re-export commonly used types
pub use builder::{Builder, PolicyInput, PolicyOptions};
pub use context::EvalContext;
pub use engine::{CheckOutcome, PermissionEngine};
pub use error::{AuthzError, Result};
pub use evaluator::{EvaluationResult, Evaluator, PermissionRequest};
pub use filter::FilterEngine;
pub use policy::{
    Filter, FilterOperator, Policy, ResourceInfo, ResourcePolicy, ResourcePolicyDocument,
    UserPolicy, UserPolicyDocument,
};
pub use store::{MemoryStore, Store};
#[cfg(feature = "postgres")]
pub use store::PostgresStore;
pub use types::{
    Document, Effect, Permission, PlanType, Project, ProjectMembership, Role, Team,
    TeamMembership, User, Visibility,
};
pub use urn::{ResourceUrn, UrnParseError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
