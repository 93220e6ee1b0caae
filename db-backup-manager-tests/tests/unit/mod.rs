//! Unit tests for db-backup-manager building blocks

mod config;
mod naming;
mod packager;
mod provisioner;
