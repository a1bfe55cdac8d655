//! reclaimd: a background storage reclamation daemon.
//!
//! The service periodically deletes data that has aged past its per-project
//! retention window and keeps three independently-owned stores consistent:
//! the relational store (Postgres), the analyzer/search indexes, and blob
//! storage. Cleanup jobs run on every instance of a cluster; a database
//! backed lease guarantees at most one instance executes a given job per
//! cycle, and every delete is idempotent so a crashed run can simply be
//! re-triggered.

pub mod batch;
pub mod clients;
pub mod config;
pub mod db;
pub mod events;
pub mod ingest;
pub mod jobs;
pub mod lease;
pub mod models;
pub mod observability;
pub mod retention;
