//! # Manuals Index
//!
//! A local full-text index over a tree of markdown device documentation.
//!
//! Each markdown file may open with a YAML frontmatter block describing a
//! hardware part, software component, or protocol. Files are parsed into
//! devices with normalized metadata, GPIO pinout rows lifted from pipe
//! tables, and flattened specifications, then stored in SQLite with an
//! FTS5 index for ranked search.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ docs/**/*.md│──▶│   Parser     │──▶│  SQLite   │
//! │ frontmatter │   │ meta+pinouts │   │ rows+FTS5 │
//! └─────────────┘   └──────────────┘   └─────┬─────┘
//!                                            │
//!                                            ▼
//!                                      ┌──────────┐
//!                                      │   CLI    │
//!                                      │(manuals) │
//!                                      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! manuals init                          # create database
//! manuals index --docs ./docs           # destructive reindex
//! manuals search "temperature sensor"   # ranked search
//! manuals search raspberry-pi-4         # model numbers match exactly
//! manuals pinouts boards-raspberry-pi-4 --interface i2c
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed indexing and storage errors |
//! | [`frontmatter`] | YAML frontmatter split and normalization |
//! | [`classify`] | Domain/type classification and device IDs |
//! | [`pinout`] | Pinout table extraction |
//! | [`parser`] | Markdown file to parsed document |
//! | [`ingest`] | Directory walk and indexing pass |
//! | [`store`] | Storage trait and SQLite backend |
//! | [`search`] | FTS5 query construction and search |
//! | [`get`] | Device, pinout, and listing retrieval |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`logging`] | Diagnostic log setup |

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod frontmatter;
pub mod get;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod pinout;
pub mod search;
pub mod stats;
pub mod store;
