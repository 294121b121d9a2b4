//! Bdscan - Blu-ray disc structure analyzer
//!
//! This library crate exposes the CLI building blocks for integration testing.

pub mod config;
pub mod report;
