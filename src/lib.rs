//! # Wavecap Store
//!
//! Schema evolution and bootstrap layer for the wavecap call-recording
//! application.
//!
//! The store backs a radio call ingestion pipeline and may live in an
//! embedded SQLite file or a MySQL/MariaDB server. This crate owns the part
//! of startup that nothing else may race with: bringing the database from
//! any prior schema generation to the current one, exactly once per pending
//! migration, and seeding mandatory reference data.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────┐
//! │ connect  │──▶│ bootstrap │──▶│ migrations │──▶│ seed │
//! │ (dialect)│   │ (meta tbl)│   │ (registry) │   │      │
//! └──────────┘   └───────────┘   └─────┬──────┘   └──────┘
//!                                      │
//!                              ┌───────┴────────┐
//!                              │   transform    │
//!                              │ (legacy JSON → │
//!                              │  normalized)   │
//!                              └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing for the `[db]` section |
//! | [`dialect`] | Per-engine DDL statement sets and datetime formats |
//! | [`migrations`] | Ordered migration registry, bootstrap, and runner |
//! | [`transform`] | Legacy JSON column normalization |
//! | [`seed`] | Default reference data (groups, tags) |
//! | [`db`] | Connection setup and datetime helpers |

pub mod config;
pub mod db;
pub mod dialect;
pub mod migrations;
pub mod seed;
pub mod transform;
