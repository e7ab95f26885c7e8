//! PostgreSQL store implementation
//!
//! Policy documents are stored as JSONB blobs keyed by resource URN or
//! user id; `created_at`/`updated_at` are assigned by the database. Saves
//! are single-statement `INSERT ... ON CONFLICT ... DO UPDATE` upserts, so
//! replacement is atomic per key and decisions never observe a torn
//! document.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::error::{AuthzError, Result};
use crate::policy::{ResourcePolicyDocument, UserPolicyDocument};
use crate::store::Store;
use crate::types::{Document, Project, ProjectMembership, Team, TeamMembership, User};

/// PostgreSQL-backed store with connection pooling.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database and build a pooled store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AuthzError::Store(format!("failed to connect to database: {e}")))?;

        Ok(Self { pool })
    }

    /// Run schema migrations from the crate's `migrations/` directory.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AuthzError::Store(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Database pool for advanced queries.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn column<'r, T>(row: &'r sqlx::postgres::PgRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| AuthzError::Store(format!("failed to read column {name}: {e}")))
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthzError::Store(format!("failed to get user: {e}")))?;

        row.map(|row| {
            Ok(User {
                id: column(&row, "id")?,
                email: column(&row, "email")?,
                name: column(&row, "name")?,
            })
        })
        .transpose()
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        let row = sqlx::query("SELECT id, name, plan FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthzError::Store(format!("failed to get team: {e}")))?;

        row.map(|row| {
            let plan: String = column(&row, "plan")?;
            Ok(Team {
                id: column(&row, "id")?,
                name: column(&row, "name")?,
                plan: plan
                    .parse()
                    .map_err(|e: AuthzError| AuthzError::Store(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let row =
            sqlx::query("SELECT id, name, team_id, visibility FROM projects WHERE id = $1")
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthzError::Store(format!("failed to get project: {e}")))?;

        row.map(|row| {
            let visibility: String = column(&row, "visibility")?;
            Ok(Project {
                id: column(&row, "id")?,
                name: column(&row, "name")?,
                team_id: column(&row, "team_id")?,
                visibility: visibility
                    .parse()
                    .map_err(|e: AuthzError| AuthzError::Store(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, title, project_id, creator_id, deleted_at, public_link_enabled \
             FROM documents WHERE id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to get document: {e}")))?;

        row.map(|row| {
            let deleted_at: Option<DateTime<Utc>> = column(&row, "deleted_at")?;
            Ok(Document {
                id: column(&row, "id")?,
                title: column(&row, "title")?,
                project_id: column(&row, "project_id")?,
                creator_id: column(&row, "creator_id")?,
                deleted_at,
                public_link_enabled: column(&row, "public_link_enabled")?,
            })
        })
        .transpose()
    }

    async fn get_team_membership(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamMembership>> {
        let row = sqlx::query(
            "SELECT user_id, team_id, role FROM team_memberships \
             WHERE user_id = $1 AND team_id = $2",
        )
        .bind(user_id)
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to get team membership: {e}")))?;

        row.map(|row| {
            let role: String = column(&row, "role")?;
            Ok(TeamMembership {
                user_id: column(&row, "user_id")?,
                team_id: column(&row, "team_id")?,
                role: role
                    .parse()
                    .map_err(|e: AuthzError| AuthzError::Store(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn get_project_membership(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectMembership>> {
        let row = sqlx::query(
            "SELECT user_id, project_id, role FROM project_memberships \
             WHERE user_id = $1 AND project_id = $2",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to get project membership: {e}")))?;

        row.map(|row| {
            let role: String = column(&row, "role")?;
            Ok(ProjectMembership {
                user_id: column(&row, "user_id")?,
                project_id: column(&row, "project_id")?,
                role: role
                    .parse()
                    .map_err(|e: AuthzError| AuthzError::Store(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn get_resource_policy(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourcePolicyDocument>> {
        let row = sqlx::query(
            "SELECT policy_document FROM resource_policies WHERE resource_id = $1",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to get resource policy: {e}")))?;

        row.map(|row| {
            let document: serde_json::Value = column(&row, "policy_document")?;
            serde_json::from_value(document)
                .map_err(|e| AuthzError::Store(format!("failed to decode resource policy: {e}")))
        })
        .transpose()
    }

    async fn save_resource_policy(&self, document: &ResourcePolicyDocument) -> Result<()> {
        let encoded = serde_json::to_value(document)
            .map_err(|e| AuthzError::Internal(format!("failed to encode resource policy: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO resource_policies (resource_id, policy_document, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (resource_id)
            DO UPDATE SET
                policy_document = EXCLUDED.policy_document,
                updated_at = NOW()
            "#,
        )
        .bind(&document.resource.resource_id)
        .bind(&encoded)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to save resource policy: {e}")))?;

        Ok(())
    }

    async fn get_user_policy(&self, user_id: &str) -> Result<Option<UserPolicyDocument>> {
        let row = sqlx::query("SELECT policy_document FROM user_policies WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthzError::Store(format!("failed to get user policy: {e}")))?;

        row.map(|row| {
            let document: serde_json::Value = column(&row, "policy_document")?;
            serde_json::from_value(document)
                .map_err(|e| AuthzError::Store(format!("failed to decode user policy: {e}")))
        })
        .transpose()
    }

    async fn save_user_policy(&self, user_id: &str, document: &UserPolicyDocument) -> Result<()> {
        let encoded = serde_json::to_value(document)
            .map_err(|e| AuthzError::Internal(format!("failed to encode user policy: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_policies (user_id, policy_document, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                policy_document = EXCLUDED.policy_document,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&encoded)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthzError::Store(format!("failed to save user policy: {e}")))?;

        Ok(())
    }
}
