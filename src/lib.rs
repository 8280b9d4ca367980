//! Priority render scheduling for Soffio documents.
//!
//! The [`application::queue`] module holds the scheduler; everything else is
//! the configuration, telemetry and markdown plumbing around it.

pub mod application;
pub mod config;
pub mod infra;
