//! # Bug Triage Core
//!
//! Runtime-agnostic logic for the bug triage service: data models, the four
//! heuristic engines, path inference, profile enrichment, request validation,
//! the store abstraction, and the batch orchestrator.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the [`store::Store`] trait, and every engine is a
//! pure function of its explicit arguments plus prefetched [`lookup::Lookup`]
//! results.
//!
//! ## Pipeline
//!
//! ```text
//! request ─▶ validate ─▶ per bug: infer ─▶ classify ─▶ prioritize ─▶ assign ─▶ suggest_fix ─▶ record
//!                │                                                                               │
//!                └──────────────────────▶ failed response            completed response ◀────────┘
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Bug reports, team profiles, triage results |
//! | [`handshake`] | Supervisor envelope: request and response messages |
//! | [`classify`] | Category, type, root cause, and confidence |
//! | [`priority`] | Severity-rule overrides and tiered priority heuristics |
//! | [`assign`] | Routing-rule overrides and candidate scoring |
//! | [`fix`] | Remediation approach and effort band |
//! | [`paths`] | Language, file type, and module inference from paths |
//! | [`profiles`] | Enrichment of request profiles with persisted ones |
//! | [`validate`] | Envelope and field validation |
//! | [`lookup`] | Tri-state result of an advisory store read |
//! | [`store`] | Store trait, persisted records, in-memory store |
//! | [`triage`] | The orchestrator |

pub mod assign;
pub mod classify;
pub mod fix;
pub mod handshake;
pub mod lookup;
pub mod models;
pub mod paths;
pub mod priority;
pub mod profiles;
pub mod store;
pub mod triage;
pub mod validate;

pub use classify::Classifier;
pub use handshake::{HandshakeMessage, HandshakeResponse, ResponseStatus};
pub use lookup::Lookup;
pub use models::{BugReport, TeamProfile, TriageResult};
pub use triage::{TriageObserver, TriageService};
