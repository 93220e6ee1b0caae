//! Command tests for db-backup-manager
//!
//! These tests drive whole backup runs through the manager with mocked
//! dependencies.

mod run;
mod setup;
