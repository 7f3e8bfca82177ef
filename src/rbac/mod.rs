// Role-based access control

pub mod models;
pub mod store;

pub use models::{Permission, Role};
pub use store::{DbRbacStore, MemoryRbacStore, RbacStore};
