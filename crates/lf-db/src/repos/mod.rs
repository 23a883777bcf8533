//! Repository modules implementing persistence for all Leadflow entities.
//!
//! Each module adds methods to `LeadService` via `impl LeadService` blocks.

pub mod audit;
pub mod call_log;
pub mod data_entry_log;
pub mod lead;
pub mod lifecycle;
pub mod settings;
pub mod stats;
