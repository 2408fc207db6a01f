//! # TaskMaster
//!
//! A personal task manager built on the task reducer and store.
//!
//! - [`config`]: settings read from `TASKMASTER_*` environment variables
//! - [`app`]: the composition root owning the store; validates input and
//!   dispatches actions
//! - [`samples`]: the tasks written on first run

#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod samples;

pub use app::{AppError, Bootstrap, TaskMaster};
pub use config::Config;
