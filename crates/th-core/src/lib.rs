//! # th-core
//!
//! Core types and pure derivations for Trust Hub.
//!
//! This crate provides the foundational types shared across all Trust Hub crates:
//! - Entity structs for catalog, audit, snapshot, and ledger records
//! - Status enums with the audit state machine
//! - ID prefix constants for generated identifiers
//! - The error kind taxonomy that outer surfaces map to exit codes
//! - Freshness, review health, and coverage classification
//! - Listing rows, detail views, and dashboard responses
//! - Typed activity detail payloads

pub mod activity_detail;
pub mod coverage;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod freshness;
pub mod ids;
pub mod responses;
