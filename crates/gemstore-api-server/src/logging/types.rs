use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Admin actions recorded to the audit table.
#[derive(Debug, Clone)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Registered,
    LoggedIn,
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
            Self::Registered => "registered",
            Self::LoggedIn => "logged_in",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuditStatus {
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<String>,
    pub status: AuditStatus,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(action: AuditAction, entity: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            action,
            entity: entity.into(),
            entity_id: None,
            status: AuditStatus::Success,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn failed(mut self, detail: impl Into<String>) -> Self {
        self.status = AuditStatus::Error;
        self.detail = Some(detail.into());
        self
    }
}
