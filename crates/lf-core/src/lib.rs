//! # lf-core
//!
//! Core types, lead lifecycle state machine, and error types for Leadflow.
//!
//! This crate provides the foundational types shared across all Leadflow crates:
//! - Entity structs for leads and their append-only call / data-entry logs
//! - The `LeadStatus` enum and the pure transition function in [`lifecycle`]
//! - Cross-cutting error types
//! - Trail operation envelope for JSONL persistence
//! - API response types
//! - CSV import parsing and contact formatting

pub mod audit_detail;
pub mod contact;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod import;
pub mod lifecycle;
pub mod responses;
pub mod trail;
