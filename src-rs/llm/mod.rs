pub mod agents;
pub mod chain;
pub mod fallback;
pub mod models;
pub mod sanitize;
pub mod utils;

// Re-export config from crate root
pub use crate::config;
