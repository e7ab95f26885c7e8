//! Permission evaluation
//!
//! Combines the policies from a resource document and an optional user
//! document into a single allow/deny decision for one permission.
//! Evaluation is pure and CPU-only; all entities are fetched by the caller
//! beforehand.

use serde::Serialize;
use tracing::debug;

use crate::context::EvalContext;
use crate::filter::FilterEngine;
use crate::policy::{Policy, ResourcePolicyDocument, UserPolicyDocument};
use crate::types::{Document, Effect, Permission, Project, ProjectMembership, Team, TeamMembership, User};

/// Inputs to a single permission evaluation.
///
/// Mirrors what the decision endpoint can fetch: user and document are
/// mandatory; everything else is present only when the store had it.
/// Missing optional entities simply keep their context key absent, which
/// makes filters over them resolve to null.
#[derive(Debug, Clone, Copy)]
pub struct PermissionRequest<'a> {
    pub user: &'a User,
    pub document: &'a Document,
    pub permission: Permission,
    pub resource_policy: Option<&'a ResourcePolicyDocument>,
    pub user_policy: Option<&'a UserPolicyDocument>,
    pub team: Option<&'a Team>,
    pub project: Option<&'a Project>,
    pub team_membership: Option<&'a TeamMembership>,
    pub project_membership: Option<&'a ProjectMembership>,
}

/// Outcome of a permission evaluation.
///
/// `matched_policies` lists the display names of every policy that matched:
/// the policy's `description` when set, otherwise a positional
/// `<source>_policy_<index>` name, so auditors can identify unnamed
/// policies. Filter contents are never disclosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub allowed: bool,
    pub message: String,
    pub matched_policies: Vec<String>,
}

impl EvaluationResult {
    fn allowed(message: impl Into<String>, matched_policies: Vec<String>) -> Self {
        Self {
            allowed: true,
            message: message.into(),
            matched_policies,
        }
    }

    fn denied(message: impl Into<String>, matched_policies: Vec<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
            matched_policies,
        }
    }
}

/// Evaluates permissions against policy documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    filter_engine: FilterEngine,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            filter_engine: FilterEngine::new(),
        }
    }

    /// Decide whether `request.user` holds `request.permission` on
    /// `request.document`.
    ///
    /// Precedence, highest first:
    /// 1. Soft-delete gate: a deleted document denies unconditionally.
    /// 2. Any matching DENY policy denies, regardless of matching allows.
    /// 3. Any matching ALLOW policy allows.
    /// 4. Default deny.
    pub fn evaluate_permission(&self, request: &PermissionRequest<'_>) -> EvaluationResult {
        if request.document.is_deleted() {
            return EvaluationResult::denied("Deny: Document is deleted", Vec::new());
        }

        let context = EvalContext::new(request.user, request.document)
            .with_team(request.team)
            .with_project(request.project)
            .with_team_membership(request.team_membership)
            .with_project_membership(request.project_membership);

        let mut deny_matches = Vec::new();
        let mut allow_matches = Vec::new();

        if let Some(doc) = request.resource_policy {
            self.collect_matches(
                &doc.policies,
                "resource",
                request.permission,
                &context,
                &mut deny_matches,
                &mut allow_matches,
            );
        }
        if let Some(doc) = request.user_policy {
            self.collect_matches(
                &doc.policies,
                "user",
                request.permission,
                &context,
                &mut deny_matches,
                &mut allow_matches,
            );
        }

        if !deny_matches.is_empty() {
            debug!(
                user_id = %request.user.id,
                document_id = %request.document.id,
                permission = %request.permission,
                policies = ?deny_matches,
                "explicit deny"
            );
            return EvaluationResult::denied("Deny", deny_matches);
        }

        if !allow_matches.is_empty() {
            debug!(
                user_id = %request.user.id,
                document_id = %request.document.id,
                permission = %request.permission,
                policies = ?allow_matches,
                "allow"
            );
            return EvaluationResult::allowed("Allow", allow_matches);
        }

        EvaluationResult::denied("Deny: No matching policy found", Vec::new())
    }

    fn collect_matches(
        &self,
        policies: &[Policy],
        source: &str,
        permission: Permission,
        context: &EvalContext,
        deny_matches: &mut Vec<String>,
        allow_matches: &mut Vec<String>,
    ) {
        for (idx, policy) in policies.iter().enumerate() {
            if !policy.permissions.contains(&permission) {
                continue;
            }

            if let Some(filters) = &policy.filter {
                if !self.filter_engine.evaluate_all(filters, context) {
                    continue;
                }
            }

            let name = policy
                .description
                .clone()
                .unwrap_or_else(|| format!("{source}_policy_{idx}"));

            match policy.effect {
                Effect::Deny => deny_matches.push(name),
                Effect::Allow => allow_matches.push(name),
            }
        }
    }
}
