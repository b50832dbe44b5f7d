//! Reconstructs a day of engineering activity.
//!  - [discovery] finds repositories on the hosting service and on disk.
//!  - [commits] and [pulls] collect the user's work from each repository through [fan_out].
//!  - [aggregate] groups the work by project and [suggest] turns every project into a proposed
//!    time-log entry.
//!  - [run::ActivityEngine] drives a whole run.

pub mod aggregate;
pub mod commits;
pub mod discovery;
pub mod entities;
pub mod error;
pub mod fan_out;
pub mod pulls;
pub mod run;
pub mod suggest;
