pub mod audit;
pub mod comment;
pub mod control;
pub mod criteria;
pub mod evidence;
pub mod policy;
pub mod request;

pub use audit::AuditCommands;
pub use comment::CommentCommands;
pub use control::ControlCommands;
pub use criteria::CriteriaCommands;
pub use evidence::EvidenceCommands;
pub use policy::PolicyCommands;
pub use request::RequestCommands;
