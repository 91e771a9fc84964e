//! Data models and wire types for the policy control plane

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The principal (user/service) on whose behalf access is requested
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// Unique identifier of the principal; an omitted or empty id fails
    /// validation with the field named
    #[serde(default)]
    pub id: String,
    /// Free-form principal attributes consumed by policy rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    /// Roles held by the principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Explicit permissions held by the principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// The resource being accessed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    /// Unique identifier of the resource
    #[serde(default)]
    pub id: String,
    /// Resource type (e.g. "api", "document")
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Free-form resource attributes consumed by policy rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    /// Owning principal id, when the resource has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// The action the principal wants to perform on the resource
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionSpec {
    /// Action name (e.g. "read", "delete")
    #[serde(default)]
    pub name: String,
    /// Free-form action attributes consumed by policy rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A single authorization request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationRequest {
    pub user: Principal,
    pub resource: Resource,
    pub action: ActionSpec,
    /// Caller-supplied evaluation context, merged into the input document as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The verdict for one authorization request.
///
/// Produced exactly once per request and never mutated afterwards; a repeated
/// evaluation produces a new value rather than updating an old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationDecision {
    /// Whether the request is allowed
    pub allow: bool,
    /// Human-readable reason backing the verdict
    pub reason: String,
    /// Identifier of the policy that produced the verdict, when the engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl AuthorizationDecision {
    /// Deny verdict used when evaluation of a single batch item fails after
    /// validation; the batch itself still succeeds.
    pub fn internal_error() -> Self {
        Self {
            allow: false,
            reason: "internal error".to_string(),
            policy_id: None,
        }
    }
}

/// Lifecycle state of a policy, encoded physically by the directory the
/// policy file lives in inside the version-controlled store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PolicyState {
    Draft,
    Enabled,
    Disabled,
}

impl PolicyState {
    /// Directory name encoding this state inside the policy repository
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "draft" => Some(Self::Draft),
            "enabled" => Some(Self::Enabled),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.dir_name()
    }
}

impl std::fmt::Display for PolicyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One policy as stored in the version-controlled repository
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolicyRecord {
    /// Policy identifier (the file stem inside the repository)
    pub id: String,
    /// Display name; defaults to the identifier
    pub name: String,
    /// Rego source of the policy
    pub rego_source: String,
    pub state: PolicyState,
    /// Deployment environment this policy belongs to
    pub environment: String,
    /// Commit timestamp of the last change touching this policy file
    pub last_modified: DateTime<Utc>,
}

/// Sync freshness of one enforcement point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Seen polling but no confirmed sync yet
    Unknown,
    /// Confirmed up to date within the heartbeat window
    Synced,
    /// Missed heartbeats beyond the threshold; still serving its last-known-good bundle
    Stale,
}

/// One enforcement point tracked by the sync coordinator.
///
/// Updated only by successful sync confirmations from the target itself;
/// a stale target is flagged for alerting, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncTarget {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub state: SyncState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_minimal_fields() {
        let body = serde_json::json!({
            "user": {"id": "u1"},
            "resource": {"id": "r1", "type": "api"},
            "action": {"name": "read"}
        });
        let req: AuthorizationRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.user.id, "u1");
        assert_eq!(req.resource.resource_type, "api");
        assert_eq!(req.action.name, "read");
        assert!(req.context.is_none());
    }

    #[test]
    fn policy_state_round_trips_through_dir_name() {
        for state in [PolicyState::Draft, PolicyState::Enabled, PolicyState::Disabled] {
            assert_eq!(PolicyState::from_dir_name(state.dir_name()), Some(state));
        }
        assert_eq!(PolicyState::from_dir_name("archived"), None);
    }

    #[test]
    fn decision_omits_absent_policy_id() {
        let decision = AuthorizationDecision {
            allow: true,
            reason: "ok".into(),
            policy_id: None,
        };
        let v = serde_json::to_value(&decision).unwrap();
        assert!(v.get("policy_id").is_none());
    }
}
