//! Push payload adapters.
//!
//! Each git host reports pushes with its own JSON shape; an adapter turns
//! the raw request body into the provider-independent [`PushEvent`] the
//! orchestrator consumes. Adapters are selected per provider at run
//! construction time.

use serde_json::Value;

use crate::error::{DeployError, Result};

/// Classification of one pushed ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Branch,
    Other,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Branch => "branch",
            ChangeKind::Other => "other",
        }
    }
}

/// One ref update reported in a push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub ref_name: String,
    pub kind: ChangeKind,
}

impl Change {
    pub fn is_branch(&self) -> bool {
        self.kind == ChangeKind::Branch
    }
}

/// Provider-independent view of a push notification
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub repository: String,
    pub changes: Vec<Change>,
}

/// Extracts a [`PushEvent`] from a provider's raw webhook body.
///
/// A malformed or incomplete body is a fatal [`DeployError::Payload`]; no
/// deployment is attempted for it.
pub trait ProviderAdapter: Send + Sync {
    fn extract(&self, raw: &[u8]) -> Result<PushEvent>;
}

fn parse_json(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw)
        .map_err(|e| DeployError::Payload(format!("body is not valid JSON: {}", e)))
}

/// Bitbucket push events: repository identity at `repository.name`, the
/// change list at `push.changes`, each change describing its new (or, for
/// deletions, old) ref under a `type`/`name` pair.
pub struct BitbucketAdapter;

impl ProviderAdapter for BitbucketAdapter {
    fn extract(&self, raw: &[u8]) -> Result<PushEvent> {
        let payload = parse_json(raw)?;

        let repository = payload
            .get("repository")
            .and_then(|r| r.get("name"))
            .and_then(|n| n.as_str())
            .ok_or_else(|| DeployError::Payload("missing repository.name".to_string()))?
            .to_string();

        let raw_changes = payload
            .get("push")
            .and_then(|p| p.get("changes"))
            .and_then(|c| c.as_array())
            .ok_or_else(|| DeployError::Payload("missing push.changes".to_string()))?;

        let changes = raw_changes.iter().map(bitbucket_change).collect();

        Ok(PushEvent {
            repository,
            changes,
        })
    }
}

fn bitbucket_change(raw: &Value) -> Change {
    // A deleted ref has `new: null`; fall back to `old` so the change
    // still carries a name for the skip warning.
    let state = raw
        .get("new")
        .filter(|v| !v.is_null())
        .or_else(|| raw.get("old"))
        .filter(|v| !v.is_null());

    let ref_name = state
        .and_then(|s| s.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_string();

    let kind = match state.and_then(|s| s.get("type")).and_then(|t| t.as_str()) {
        Some("branch") => ChangeKind::Branch,
        _ => ChangeKind::Other,
    };

    Change { ref_name, kind }
}

/// GitHub push events carry a single ref: `ref` plus `repository.name`.
/// Only `refs/heads/*` refs count as branches.
pub struct GithubAdapter;

impl ProviderAdapter for GithubAdapter {
    fn extract(&self, raw: &[u8]) -> Result<PushEvent> {
        let payload = parse_json(raw)?;

        let repository = payload
            .get("repository")
            .and_then(|r| r.get("name"))
            .and_then(|n| n.as_str())
            .ok_or_else(|| DeployError::Payload("missing repository.name".to_string()))?
            .to_string();

        let full_ref = payload
            .get("ref")
            .and_then(|r| r.as_str())
            .ok_or_else(|| DeployError::Payload("missing ref".to_string()))?;

        let change = match full_ref.strip_prefix("refs/heads/") {
            Some(branch) => Change {
                ref_name: branch.to_string(),
                kind: ChangeKind::Branch,
            },
            None => Change {
                // Tags and other refs keep their full form; they are
                // reported but never deployed.
                ref_name: full_ref.to_string(),
                kind: ChangeKind::Other,
            },
        };

        Ok(PushEvent {
            repository,
            changes: vec![change],
        })
    }
}
