//! # altnav
//!
//! A tolerant structured-literal extractor and in-memory search index for
//! hand-authored catalogs of alternative services.
//!
//! Catalog sources are loosely formatted object-literal lists: quoting
//! varies, key names drift between historical variants, and values nest
//! arbitrarily. altnav recovers a flat list of typed [`models::Record`]s from
//! them and answers substring queries over those records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌────────┐   ┌───────────┐   ┌─────────┐
//! │ Sources  │──▶│ Scanner │──▶│ Blocks │──▶│  Fields   │──▶│Normalize│
//! │ HTTP/FS  │   └─────────┘   └────────┘   └───────────┘   └────┬────┘
//! └──────────┘                                                    ▼
//!                   ┌──────────┐      ┌──────────┐         ┌───────────┐
//!                   │   CLI    │◀─────│ Catalog  │◀────────│SearchIndex│
//!                   │ (altnav) │      │ snapshot │         └───────────┘
//!                   └──────────┘      └────┬─────┘
//!                                          ▼
//!                                     ┌──────────┐
//!                                     │   HTTP   │
//!                                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! altnav sources                 # list configured documents
//! altnav ingest                  # fetch, parse and report
//! altnav search "mail"           # query the catalog
//! altnav parse ./data/email.ts   # debug one local file
//! altnav serve                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`scanner`] | String-aware brace/bracket scanner |
//! | [`blocks`] | Top-level literal block extraction |
//! | [`table`] | Markdown table rows |
//! | [`fields`] | Declarative field extraction |
//! | [`normalize`] | Canonical records, defaults, dedup |
//! | [`index`] | Immutable search index |
//! | [`ingest`] | Pipeline and live catalog |
//! | [`cache`] | Freshness-bounded text cache |
//! | [`sources`] | Byte sources (HTTP, file, memory) |
//! | [`discovery`] | Remote tree and local directory listing |
//! | [`config`] | TOML configuration |
//! | [`server`] | JSON HTTP API |

pub mod blocks;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fields;
pub mod index;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod scanner;
pub mod search;
pub mod server;
pub mod sources;
pub mod stats;
pub mod table;
