//! Route handlers.

pub mod analyze;
pub mod health;
pub mod history;
pub mod jobs;
pub mod users;
