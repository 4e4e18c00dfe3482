pub mod permissions;

pub use permissions::{OperationLookup, OperationMaskPolicy, PermissionPolicy, access_bits};
