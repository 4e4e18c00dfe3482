pub mod identity;
pub mod query;
