pub mod health;
pub mod identity;
pub mod map_key;
