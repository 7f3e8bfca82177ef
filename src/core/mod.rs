// Core domain types: errors, models, crypto helpers

pub mod crypto;
pub mod errors;
pub mod models;
