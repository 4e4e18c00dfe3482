pub mod error;
pub mod user_access_repo;

pub use user_access_repo::{PgUserAccessStore, UserAccessSession, UserAccessStore};
