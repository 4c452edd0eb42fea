//! Entity structs for all Trust Hub records.
//!
//! Each entity maps to a table in the libSQL database. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON output and schema
//! generation.

mod activity;
mod audit;
mod comment;
mod control;
mod criterion;
mod evidence;
mod policy;
mod request;
mod snapshot;

pub use activity::ActivityEntry;
pub use audit::Audit;
pub use comment::Comment;
pub use control::Control;
pub use criterion::Criterion;
pub use evidence::Evidence;
pub use policy::{Policy, PolicyControl};
pub use request::Request;
pub use snapshot::ControlSnapshot;
