//! Repository modules implementing Trust Hub operations.
//!
//! Each module adds methods to `TrustHubService` via `impl TrustHubService` blocks.

pub mod activity;
pub mod audit;
pub mod catalog;
pub mod comment;
pub mod coverage;
pub mod evidence;
pub mod policy;
pub mod request;
pub mod snapshot;

pub(crate) mod filter;
