pub mod access;

pub use access::Gate;
