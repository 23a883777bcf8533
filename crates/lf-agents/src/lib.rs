//! # lf-agents
//!
//! Background agents that move leads through their lifecycle:
//!
//! - [`voice::VoiceAgent`] claims callable leads and dials them through a
//!   [`dialer::Dialer`].
//! - [`entry::DataEntryAgent`] claims confirmed leads and submits them through
//!   a [`portal::PortalClient`].
//! - [`supervisor::AgentSupervisor`] starts and stops both loops.
//!
//! Agents never write status directly; every change goes through
//! `lf_db::service::LeadService`, so a lead moved by an operator mid-tick is
//! skipped rather than overwritten.

pub mod agent;
pub mod dialer;
pub mod entry;
pub mod error;
mod http;
pub mod portal;
pub mod supervisor;
pub mod voice;

pub use error::AgentError;
pub use supervisor::AgentSupervisor;
