//! Decision and ingest orchestration
//!
//! Wires the store, builder and evaluator together. The engine fetches
//! everything a decision needs before handing off to the pure evaluator;
//! the only suspension points are store lookups, so cancelling a request
//! aborts at the store boundary.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::builder::{Builder, PolicyInput};
use crate::error::{AuthzError, Result};
use crate::evaluator::{Evaluator, PermissionRequest};
use crate::policy::ResourcePolicyDocument;
use crate::store::Store;
use crate::types::Permission;
use crate::urn::ResourceUrn;

/// Decision returned by [`PermissionEngine::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub allowed: bool,
    pub message: String,
    pub matched_policies: Vec<String>,
    pub evaluation_time_ms: u64,
}

/// Orchestrates permission checks and policy ingest against a store.
pub struct PermissionEngine {
    store: Arc<dyn Store>,
    evaluator: Evaluator,
    builder: Builder,
}

impl PermissionEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            evaluator: Evaluator::new(),
            builder: Builder::new(),
        }
    }

    /// Decide whether `user_id` holds `action` on the document named by
    /// `resource_id`.
    ///
    /// The user, document and resource policy are required: a missing one
    /// is a [`AuthzError::NotFound`] naming the absent entity. The user
    /// policy, team, project and memberships are optional context; when
    /// the store lacks them, policies filtering on them simply fail to
    /// match.
    pub async fn check(
        &self,
        resource_id: &str,
        user_id: &str,
        action: Permission,
    ) -> Result<CheckOutcome> {
        let start = Instant::now();

        let urn: ResourceUrn = resource_id
            .parse()
            .map_err(|e: crate::urn::UrnParseError| AuthzError::Validation(e.to_string()))?;

        debug!(resource_id, user_id, action = %action, "permission check");

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;

        let document = self
            .store
            .get_document(urn.doc_id())
            .await?
            .ok_or_else(|| AuthzError::NotFound {
                entity: "document",
                id: resource_id.to_string(),
            })?;

        let resource_policy = self
            .store
            .get_resource_policy(resource_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound {
                entity: "resource policy",
                id: resource_id.to_string(),
            })?;

        let user_policy = self.store.get_user_policy(user_id).await?;

        let team = self.store.get_team(urn.team_id()).await?;
        let project = self.store.get_project(urn.project_id()).await?;

        let team_membership = match &team {
            Some(team) => self.store.get_team_membership(user_id, &team.id).await?,
            None => None,
        };
        let project_membership = match &project {
            Some(project) => {
                self.store
                    .get_project_membership(user_id, &project.id)
                    .await?
            }
            None => None,
        };

        let result = self.evaluator.evaluate_permission(&PermissionRequest {
            user: &user,
            document: &document,
            permission: action,
            resource_policy: Some(&resource_policy),
            user_policy: user_policy.as_ref(),
            team: team.as_ref(),
            project: project.as_ref(),
            team_membership: team_membership.as_ref(),
            project_membership: project_membership.as_ref(),
        });

        let evaluation_time_ms = start.elapsed().as_millis() as u64;

        info!(
            resource_id,
            user_id,
            action = %action,
            allowed = result.allowed,
            evaluation_time_ms,
            "permission decision"
        );

        Ok(CheckOutcome {
            allowed: result.allowed,
            message: result.message,
            matched_policies: result.matched_policies,
            evaluation_time_ms,
        })
    }

    /// Create or replace the policy document for a resource.
    ///
    /// Accepts either a full document or the simple grant form; the stored
    /// document fully replaces any previous one under the same URN.
    pub async fn put_resource_policy(
        &self,
        input: PolicyInput,
        creator_id: Option<&str>,
    ) -> Result<ResourcePolicyDocument> {
        let document = self.builder.build_policy_document(input, creator_id)?;
        self.store.save_resource_policy(&document).await?;

        info!(
            resource_id = %document.resource.resource_id,
            policies = document.policies.len(),
            "resource policy saved"
        );

        Ok(document)
    }

    /// Fetch the stored policy document for a resource.
    pub async fn get_resource_policy(&self, resource_id: &str) -> Result<ResourcePolicyDocument> {
        resource_id
            .parse::<ResourceUrn>()
            .map_err(|e| AuthzError::Validation(e.to_string()))?;

        self.store
            .get_resource_policy(resource_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound {
                entity: "resource policy",
                id: resource_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PolicyOptions;
    use crate::store::MemoryStore;
    use crate::types::{Document, Effect, User};

    const URN: &str = "urn:resource:team1:proj1:doc1";

    async fn seeded_engine() -> PermissionEngine {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                id: "creator1".to_string(),
                email: "creator1@example.com".to_string(),
                name: "Creator".to_string(),
            })
            .await;
        store
            .insert_document(Document {
                id: "doc1".to_string(),
                title: "Doc".to_string(),
                project_id: "proj1".to_string(),
                creator_id: "creator1".to_string(),
                deleted_at: None,
                public_link_enabled: false,
            })
            .await;

        let document = Builder::new().create_creator_policy(URN, "creator1");
        store.save_resource_policy(&document).await.unwrap();

        PermissionEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_check_allows_creator() {
        let engine = seeded_engine().await;
        let outcome = engine
            .check(URN, "creator1", Permission::CanEdit)
            .await
            .unwrap();
        assert!(outcome.allowed);
        assert_eq!(outcome.matched_policies, vec!["Creator has full access"]);
    }

    #[tokio::test]
    async fn test_check_rejects_malformed_urn() {
        let engine = seeded_engine().await;
        let err = engine
            .check("urn:resource:team1:doc1", "creator1", Permission::CanView)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Validation(_)));
    }

    #[tokio::test]
    async fn test_check_reports_missing_user() {
        let engine = seeded_engine().await;
        let err = engine
            .check(URN, "ghost", Permission::CanView)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn test_check_reports_missing_resource_policy() {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                id: "creator1".to_string(),
                email: "creator1@example.com".to_string(),
                name: "Creator".to_string(),
            })
            .await;
        store
            .insert_document(Document {
                id: "doc1".to_string(),
                title: "Doc".to_string(),
                project_id: "proj1".to_string(),
                creator_id: "creator1".to_string(),
                deleted_at: None,
                public_link_enabled: false,
            })
            .await;

        let engine = PermissionEngine::new(Arc::new(store));
        let err = engine
            .check(URN, "creator1", Permission::CanView)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::NotFound {
                entity: "resource policy",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_put_resource_policy_replaces() {
        let engine = seeded_engine().await;

        let options = PolicyOptions {
            resource_id: URN.to_string(),
            action: Permission::CanView,
            target: "viewer9".to_string(),
            effect: Effect::Allow,
        };
        engine
            .put_resource_policy(PolicyInput::Options(options), Some("creator1"))
            .await
            .unwrap();

        let stored = engine.get_resource_policy(URN).await.unwrap();
        assert_eq!(stored.policies.len(), 1);
        assert_eq!(
            stored.policies[0].description.as_deref(),
            Some("Grant can_view permission to user viewer9")
        );

        // The creator policy was replaced, so the creator falls back to
        // default deny.
        let outcome = engine
            .check(URN, "creator1", Permission::CanEdit)
            .await
            .unwrap();
        assert!(!outcome.allowed);
        assert_eq!(outcome.message, "Deny: No matching policy found");
    }

    #[tokio::test]
    async fn test_get_resource_policy_not_found() {
        let engine = PermissionEngine::new(Arc::new(MemoryStore::new()));
        let err = engine.get_resource_policy(URN).await.unwrap_err();
        assert!(matches!(err, AuthzError::NotFound { .. }));
    }
}
