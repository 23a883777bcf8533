//! JSONL trail of every mutation, written next to the database.

pub mod writer;
