//! Policy document construction
//!
//! The builder turns ingest input into validated [`ResourcePolicyDocument`]s:
//! full documents pass through validation unchanged, the simple grant form
//! is upconverted into a single-policy document. It also provides the
//! canned policy shapes higher layers use to seed sensible defaults, and a
//! merge helper for callers that want append rather than replace semantics.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::policy::{
    Filter, FilterOperator, Policy, ResourceInfo, ResourcePolicyDocument,
};
use crate::types::{Effect, Permission};

/// Simplified ingest format: grant (or deny) one permission to one user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyOptions {
    /// Resource URN (`urn:resource:<teamId>:<projectId>:<docId>`)
    pub resource_id: String,
    /// Permission to grant or deny
    pub action: Permission,
    /// Target user id the policy applies to
    pub target: String,
    /// Defaults to allow when omitted
    #[serde(default)]
    pub effect: Effect,
}

/// Body accepted by the policy ingest endpoint: either a complete document
/// or the simple grant form, discriminated structurally.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolicyInput {
    Document(ResourcePolicyDocument),
    Options(PolicyOptions),
}

/// Builds policy documents from ingest input or canned shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Builder;

impl Builder {
    pub fn new() -> Self {
        Self
    }

    /// Build a validated document from either ingest form.
    ///
    /// `creator_id` is the caller identity for the simple form; without it
    /// the document records `"unknown"` as the creator.
    pub fn build_policy_document(
        &self,
        input: PolicyInput,
        creator_id: Option<&str>,
    ) -> Result<ResourcePolicyDocument> {
        let document = match input {
            PolicyInput::Document(document) => document,
            PolicyInput::Options(options) => self.build_from_options(options, creator_id),
        };

        document.validate()?;
        Ok(document)
    }

    fn build_from_options(
        &self,
        options: PolicyOptions,
        creator_id: Option<&str>,
    ) -> ResourcePolicyDocument {
        let creator_id = match creator_id {
            Some(id) => id.to_string(),
            None => {
                warn!(
                    resource_id = %options.resource_id,
                    "simple-form policy ingested without caller identity; recording creator as \"unknown\""
                );
                "unknown".to_string()
            }
        };

        let policy = Policy {
            description: Some(format!(
                "Grant {} permission to user {}",
                options.action, options.target
            )),
            filter: Some(vec![Filter::new(
                "user.id",
                FilterOperator::Eq,
                Value::String(options.target),
            )]),
            permissions: vec![options.action],
            effect: options.effect,
        };

        ResourcePolicyDocument {
            resource: ResourceInfo {
                resource_id: options.resource_id,
                creator_id,
            },
            policies: vec![policy],
        }
    }

    /// Append `new_document`'s policies to `existing`, keeping the existing
    /// resource info. Duplicates are preserved — an auditor may want to see
    /// repeated entries — and callers decide between merge and replace.
    pub fn merge_policies(
        &self,
        existing: Option<ResourcePolicyDocument>,
        new_document: ResourcePolicyDocument,
    ) -> ResourcePolicyDocument {
        match existing {
            None => new_document,
            Some(mut existing) => {
                existing.policies.extend(new_document.policies);
                existing
            }
        }
    }

    /// Grants the document creator all four permissions.
    pub fn create_creator_policy(
        &self,
        resource_id: &str,
        creator_id: &str,
    ) -> ResourcePolicyDocument {
        self.canned_document(
            resource_id,
            creator_id,
            Policy {
                description: Some("Creator has full access".to_string()),
                filter: Some(vec![Filter::new(
                    "document.creatorId",
                    FilterOperator::Eq,
                    "user.id",
                )]),
                permissions: Permission::ALL.to_vec(),
                effect: Effect::Allow,
            },
        )
    }

    /// Grants team admins all four permissions.
    pub fn create_team_admin_policy(
        &self,
        resource_id: &str,
        creator_id: &str,
    ) -> ResourcePolicyDocument {
        self.canned_document(
            resource_id,
            creator_id,
            Policy {
                description: Some("Team admins have full access".to_string()),
                filter: Some(vec![Filter::new(
                    "teamMembership.role",
                    FilterOperator::Eq,
                    "admin",
                )]),
                permissions: Permission::ALL.to_vec(),
                effect: Effect::Allow,
            },
        )
    }

    /// Grants view access to anyone while the document's public link is on.
    pub fn create_public_view_policy(
        &self,
        resource_id: &str,
        creator_id: &str,
    ) -> ResourcePolicyDocument {
        self.canned_document(
            resource_id,
            creator_id,
            Policy {
                description: Some("Public view access when link is enabled".to_string()),
                filter: Some(vec![Filter::new(
                    "document.publicLinkEnabled",
                    FilterOperator::Eq,
                    true,
                )]),
                permissions: vec![Permission::CanView],
                effect: Effect::Allow,
            },
        )
    }

    fn canned_document(
        &self,
        resource_id: &str,
        creator_id: &str,
        policy: Policy,
    ) -> ResourcePolicyDocument {
        ResourcePolicyDocument {
            resource: ResourceInfo {
                resource_id: resource_id.to_string(),
                creator_id: creator_id.to_string(),
            },
            policies: vec![policy],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URN: &str = "urn:resource:team1:proj1:doc1";

    #[test]
    fn test_build_from_options() {
        let options = PolicyOptions {
            resource_id: URN.to_string(),
            action: Permission::CanEdit,
            target: "user123".to_string(),
            effect: Effect::Allow,
        };

        let document = Builder::new()
            .build_policy_document(PolicyInput::Options(options), Some("creator1"))
            .unwrap();

        assert_eq!(document.resource.resource_id, URN);
        assert_eq!(document.resource.creator_id, "creator1");
        assert_eq!(document.policies.len(), 1);

        let policy = &document.policies[0];
        assert_eq!(
            policy.description.as_deref(),
            Some("Grant can_edit permission to user user123")
        );
        assert_eq!(policy.permissions, vec![Permission::CanEdit]);
        assert_eq!(policy.effect, Effect::Allow);
        assert_eq!(
            policy.filter.as_deref(),
            Some(&[Filter::new("user.id", FilterOperator::Eq, "user123")][..])
        );
    }

    #[test]
    fn test_build_from_options_without_creator_falls_back_to_unknown() {
        let options = PolicyOptions {
            resource_id: URN.to_string(),
            action: Permission::CanView,
            target: "user123".to_string(),
            effect: Effect::Allow,
        };

        let document = Builder::new()
            .build_policy_document(PolicyInput::Options(options), None)
            .unwrap();
        assert_eq!(document.resource.creator_id, "unknown");
    }

    #[test]
    fn test_full_document_passes_through_validation() {
        let document = Builder::new().create_creator_policy(URN, "creator1");
        let built = Builder::new()
            .build_policy_document(PolicyInput::Document(document.clone()), None)
            .unwrap();
        assert_eq!(built, document);
    }

    #[test]
    fn test_invalid_urn_rejected() {
        let options = PolicyOptions {
            resource_id: "urn:resource:bad".to_string(),
            action: Permission::CanView,
            target: "user123".to_string(),
            effect: Effect::Allow,
        };

        assert!(Builder::new()
            .build_policy_document(PolicyInput::Options(options), None)
            .is_err());
    }

    #[test]
    fn test_policy_input_discriminates_structurally() {
        let simple = json!({
            "resourceId": URN,
            "action": "can_edit",
            "target": "user123"
        });
        let input: PolicyInput = serde_json::from_value(simple).unwrap();
        let PolicyInput::Options(options) = input else {
            panic!("expected simple options");
        };
        assert_eq!(options.effect, Effect::Allow);

        let full = json!({
            "resource": {"resourceId": URN, "creatorId": "creator1"},
            "policies": [{
                "permissions": ["can_view"],
                "effect": "allow"
            }]
        });
        let input: PolicyInput = serde_json::from_value(full).unwrap();
        assert!(matches!(input, PolicyInput::Document(_)));
    }

    #[test]
    fn test_merge_appends_without_dedup() {
        let builder = Builder::new();
        let existing = builder.create_creator_policy(URN, "creator1");
        let incoming = builder.create_creator_policy(URN, "someone-else");

        let merged = builder.merge_policies(Some(existing.clone()), incoming.clone());
        assert_eq!(merged.resource, existing.resource);
        assert_eq!(merged.policies.len(), 2);
        assert_eq!(merged.policies[0], existing.policies[0]);
        assert_eq!(merged.policies[1], incoming.policies[0]);

        let unmerged = builder.merge_policies(None, incoming.clone());
        assert_eq!(unmerged, incoming);
    }

    #[test]
    fn test_canned_policies() {
        let builder = Builder::new();

        let creator = builder.create_creator_policy(URN, "creator1");
        assert_eq!(creator.policies[0].permissions.len(), 4);

        let admin = builder.create_team_admin_policy(URN, "creator1");
        assert_eq!(
            admin.policies[0].filter.as_ref().unwrap()[0].prop,
            "teamMembership.role"
        );

        let public = builder.create_public_view_policy(URN, "creator1");
        assert_eq!(public.policies[0].permissions, vec![Permission::CanView]);
        assert_eq!(
            public.policies[0].filter.as_ref().unwrap()[0].value,
            json!(true)
        );
        assert!(public.validate().is_ok());
    }
}
