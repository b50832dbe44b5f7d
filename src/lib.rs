//! Reconstructs a day of engineering work from the code-hosting service and local repositories
//! and suggests time-log entries for it, without repeating what is already logged.
//!

pub mod activity;
pub mod cli;
pub mod ledger;
pub mod source;
pub mod tracker;
pub mod utils;
