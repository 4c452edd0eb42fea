pub mod activity;
pub mod audit;
pub mod comment;
pub mod control;
pub mod criteria;
pub mod dashboard;
pub mod dispatch;
pub mod evidence;
pub mod policy;
pub mod request;
pub mod shared;
