//! Audit trail types: AuditRecord, AuditAction, AuditQuery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Actor recorded when no identity can be resolved.
pub const ANONYMOUS_ACTOR: &str = "-";

/// Kind of auditable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Register,
    Search,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Register => "REGISTER",
            AuditAction::Search => "SEARCH",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit fact: who did what, when. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record; a blank actor is stored as [`ANONYMOUS_ACTOR`].
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        details: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let actor = actor.into();
        let actor = if actor.trim().is_empty() {
            ANONYMOUS_ACTOR.to_string()
        } else {
            actor
        };
        Self {
            id: Uuid::new_v4(),
            actor,
            action,
            details: details.into(),
            timestamp,
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.timestamp.to_rfc3339(),
            self.actor,
            self.action,
            self.details
        )
    }
}

/// Options for listing audit records (filter + pagination). Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn by_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Self::default()
        }
    }

    /// Apply filters, order newest first, then offset/limit (default limit 100).
    pub fn apply(&self, records: &mut Vec<AuditRecord>) {
        if let Some(ref actor) = self.actor {
            records.retain(|r| &r.actor == actor);
        }
        if let Some(action) = self.action {
            records.retain(|r| r.action == action);
        }
        records.reverse();
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(100);
        let taken: Vec<AuditRecord> = std::mem::take(records)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();
        *records = taken;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(actor: &str, action: AuditAction) -> AuditRecord {
        AuditRecord::new(actor, action, "method=x", Utc::now())
    }

    #[test]
    fn blank_actor_becomes_anonymous() {
        assert_eq!(record("  ", AuditAction::Create).actor, ANONYMOUS_ACTOR);
        assert_eq!(record("alice", AuditAction::Create).actor, "alice");
    }

    #[test]
    fn query_filters_and_orders_newest_first() {
        let mut all = vec![
            record("alice", AuditAction::Create),
            record("bob", AuditAction::Delete),
            record("alice", AuditAction::Update),
            record("alice", AuditAction::Delete),
        ];
        let q = AuditQuery {
            actor: Some("alice".to_string()),
            limit: Some(2),
            ..AuditQuery::default()
        };
        q.apply(&mut all);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, AuditAction::Delete);
        assert_eq!(all[1].action, AuditAction::Update);
    }

    #[test]
    fn action_serializes_upper_case() {
        let json = serde_json::to_string(&AuditAction::Logout).unwrap();
        assert_eq!(json, "\"LOGOUT\"");
    }
}
