pub mod audit;
pub mod parse;
