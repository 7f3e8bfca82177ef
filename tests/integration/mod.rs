#[path = "../common/mod.rs"]
mod common;

mod test_auth_flow;
mod test_rbac_api;
