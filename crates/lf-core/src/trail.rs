//! JSONL trail operation envelope.
//!
//! When a trail directory is configured, every mutation is also written as a
//! `TrailOperation` line to `{trail_dir}/{YYYY-MM-DD}.jsonl`, giving an
//! append-only record that survives database resets.
//!
//! The `v` field supports schema versioning: lines without a `v` field
//! deserialize with `v == 1` via `#[serde(default)]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Actor, EntityType, TrailOp};

const fn default_trail_version() -> u32 {
    1
}

/// A single operation recorded in the JSONL trail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TrailOperation {
    /// Schema version. Defaults to 1 for lines without this field.
    #[serde(default = "default_trail_version")]
    pub v: u32,

    /// ISO 8601 timestamp of the operation.
    pub ts: String,

    /// Who caused the mutation.
    pub actor: Actor,

    pub op: TrailOp,

    pub entity: EntityType,

    /// ID of the affected entity.
    pub id: String,

    /// Full entity for `Create`, changed fields for `Update`, the transition
    /// detail for `Transition` and `Override`.
    pub data: serde_json::Value,
}
