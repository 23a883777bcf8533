//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! give the common shapes a schema.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Actor, LeadStatus, Trigger};

/// Detail for `AuditAction::StatusChanged` and `AuditAction::StatusOverridden`.
///
/// `trigger` is `None` for overrides.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TransitionDetail {
    pub from: LeadStatus,
    pub to: LeadStatus,
    pub trigger: Option<Trigger>,
    pub actor: Actor,
    pub reason: Option<String>,
}

/// Detail for `AuditAction::Updated`: names of the fields that changed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdatedDetail {
    pub fields: Vec<String>,
}

/// Detail for `AuditAction::Imported`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ImportedDetail {
    pub file_name: Option<String>,
    pub row: usize,
}
