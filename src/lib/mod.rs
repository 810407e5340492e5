//! The daily task machinery.
//!
//! - [catalog] picks tasks and images.
//! - [collector] turns button presses into recorded responses.
//! - [summary] builds the end-of-cycle report.
//! - [scheduler] and [jobs] post both at fixed times of day.
//! - [gateway] is how jobs talk to discord.

pub mod catalog;
pub mod collector;
pub mod events;
pub mod gateway;
pub mod jobs;
pub mod scheduler;
pub mod summary;
