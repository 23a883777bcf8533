//! Entity structs for Leadflow domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `lf-db`'s
//! `001_initial.sql`). All structs derive `Serialize`, `Deserialize`, and
//! `JsonSchema` for JSON roundtrip and schema validation.

mod audit;
mod call_log;
mod data_entry_log;
mod lead;
mod settings;

pub use audit::AuditEntry;
pub use call_log::CallLog;
pub use data_entry_log::DataEntryLog;
pub use lead::{AgentErrorRecord, Lead, NewLead};
pub use settings::CallAttemptSettings;
