//! Store capability and in-memory implementation
//!
//! The engine reaches persistent state only through the [`Store`] trait.
//! Reads return `Ok(None)` for "absent"; transport failures surface as
//! [`crate::error::AuthzError::Store`]. Saves are per-key atomic upserts:
//! an existing document under the same key is replaced in full.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::policy::{ResourcePolicyDocument, UserPolicyDocument};
use crate::types::{Document, Project, ProjectMembership, Team, TeamMembership, User};

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Read/write capability backing the permission engine.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>>;

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    async fn get_team_membership(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamMembership>>;

    async fn get_project_membership(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectMembership>>;

    /// Fetch the policy document keyed by the resource URN.
    async fn get_resource_policy(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourcePolicyDocument>>;

    /// Upsert: replaces any document stored under the same resource URN.
    async fn save_resource_policy(&self, document: &ResourcePolicyDocument) -> Result<()>;

    /// Fetch the policy document keyed by the user id.
    async fn get_user_policy(&self, user_id: &str) -> Result<Option<UserPolicyDocument>>;

    /// Upsert: replaces any document stored under the same user id.
    async fn save_user_policy(&self, user_id: &str, document: &UserPolicyDocument) -> Result<()>;
}

/// In-memory store backed by `RwLock`-guarded maps.
///
/// Used by tests and the demo server; entities are seeded through the
/// `insert_*` methods.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<String, User>,
    teams: HashMap<String, Team>,
    projects: HashMap<String, Project>,
    documents: HashMap<String, Document>,
    team_memberships: HashMap<(String, String), TeamMembership>,
    project_memberships: HashMap<(String, String), ProjectMembership>,
    resource_policies: HashMap<String, ResourcePolicyDocument>,
    user_policies: HashMap<String, UserPolicyDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_team(&self, team: Team) {
        self.inner.write().await.teams.insert(team.id.clone(), team);
    }

    pub async fn insert_project(&self, project: Project) {
        self.inner
            .write()
            .await
            .projects
            .insert(project.id.clone(), project);
    }

    pub async fn insert_document(&self, document: Document) {
        self.inner
            .write()
            .await
            .documents
            .insert(document.id.clone(), document);
    }

    pub async fn insert_team_membership(&self, membership: TeamMembership) {
        self.inner.write().await.team_memberships.insert(
            (membership.user_id.clone(), membership.team_id.clone()),
            membership,
        );
    }

    pub async fn insert_project_membership(&self, membership: ProjectMembership) {
        self.inner.write().await.project_memberships.insert(
            (membership.user_id.clone(), membership.project_id.clone()),
            membership,
        );
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        Ok(self.inner.read().await.teams.get(team_id).cloned())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.inner.read().await.projects.get(project_id).cloned())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.inner.read().await.documents.get(document_id).cloned())
    }

    async fn get_team_membership(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamMembership>> {
        let key = (user_id.to_string(), team_id.to_string());
        Ok(self.inner.read().await.team_memberships.get(&key).cloned())
    }

    async fn get_project_membership(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectMembership>> {
        let key = (user_id.to_string(), project_id.to_string());
        Ok(self
            .inner
            .read()
            .await
            .project_memberships
            .get(&key)
            .cloned())
    }

    async fn get_resource_policy(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourcePolicyDocument>> {
        Ok(self
            .inner
            .read()
            .await
            .resource_policies
            .get(resource_id)
            .cloned())
    }

    async fn save_resource_policy(&self, document: &ResourcePolicyDocument) -> Result<()> {
        self.inner
            .write()
            .await
            .resource_policies
            .insert(document.resource.resource_id.clone(), document.clone());
        Ok(())
    }

    async fn get_user_policy(&self, user_id: &str) -> Result<Option<UserPolicyDocument>> {
        Ok(self.inner.read().await.user_policies.get(user_id).cloned())
    }

    async fn save_user_policy(&self, user_id: &str, document: &UserPolicyDocument) -> Result<()> {
        self.inner
            .write()
            .await
            .user_policies
            .insert(user_id.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    #[tokio::test]
    async fn test_entity_reads_return_none_when_absent() {
        let store = MemoryStore::new();
        assert!(store.get_user("missing").await.unwrap().is_none());
        assert!(store.get_document("missing").await.unwrap().is_none());
        assert!(store
            .get_team_membership("user1", "team1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resource_policy_upsert_replaces() {
        let store = MemoryStore::new();
        let builder = Builder::new();
        let urn = "urn:resource:team1:proj1:doc1";

        let first = builder.create_creator_policy(urn, "creator1");
        store.save_resource_policy(&first).await.unwrap();
        assert_eq!(
            store.get_resource_policy(urn).await.unwrap().unwrap(),
            first
        );

        let second = builder.create_public_view_policy(urn, "creator1");
        store.save_resource_policy(&second).await.unwrap();

        let stored = store.get_resource_policy(urn).await.unwrap().unwrap();
        assert_eq!(stored, second);
        assert_eq!(stored.policies.len(), 1);
    }

    #[tokio::test]
    async fn test_user_policy_keyed_by_user_id() {
        let store = MemoryStore::new();
        let document = UserPolicyDocument { policies: vec![] };

        store.save_user_policy("user1", &document).await.unwrap();
        assert!(store.get_user_policy("user1").await.unwrap().is_some());
        assert!(store.get_user_policy("user2").await.unwrap().is_none());
    }
}
