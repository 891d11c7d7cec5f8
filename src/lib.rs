//! # Bug Triage
//!
//! A heuristic bug triage service. A supervisor sends a batch of bug reports
//! and a team roster; each bug comes back classified, prioritized, assigned,
//! and paired with a suggested fix.
//!
//! The triage logic itself lives in the runtime-agnostic
//! [`bug_triage_core`] crate. This crate supplies the SQLite store, the
//! HTTP server, metrics, configuration, and the `triage` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ Supervisor  │──▶│  TriageService   │──▶│  SQLite   │
//! │ HTTP / file │   │ (bug-triage-core)│   │  store    │
//! └─────────────┘   └────────┬─────────┘   └──────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Metrics   │
//!                     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! triage init                              # create database, seed default rules
//! triage seed config/seed.example.json     # import team and routing data
//! triage run demos/two_bugs.json           # triage a request file
//! triage serve                             # start HTTP server
//! triage supervisor --scenario security    # post a sample request
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations and default rules |
//! | [`sqlite_store`] | SQLite implementation of the store trait |
//! | [`seed`] | JSON import of team data and rules |
//! | [`metrics`] | Request and health-check counters |
//! | [`server`] | HTTP server |
//! | [`run`] | One-shot triage of a request file |
//! | [`supervisor`] | Mock supervisor client |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod db;
pub mod logging;
pub mod metrics;
pub mod migrate;
pub mod run;
pub mod seed;
pub mod server;
pub mod sqlite_store;
pub mod supervisor;
