// Authentication: strategies, identifiers, middleware

pub mod audit_logger;
pub mod authenticator;
pub mod bearer;
pub mod cookie;
pub mod form;
pub mod identifier;
pub mod manager;
pub mod middleware;
pub mod request;
pub mod token;
pub mod user_store;

pub use authenticator::{Authenticator, StrategyKind, StrategySettings};
pub use identifier::Identifier;
pub use manager::{AuthManager, Authenticated};
pub use request::AuthRequest;
