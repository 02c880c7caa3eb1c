//! Thai lottery ticket collection backed by SQLite: draw results, personal
//! ticket collections, and prize checking that keeps the two consistent.

pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod mcp_handler;
pub mod notify;
pub mod prize;
pub mod recompute;
pub mod summary;
pub mod types;
pub mod use_cases;
pub mod utils;

pub use error::ServiceError;
pub use prize::evaluate_ticket;
pub use recompute::{cascade_reset_on_delete, recompute_on_save};
pub use types::*;
