//! `stmtbook-recon`: brokerage statement reconciliation and journal engine.
//!
//! Pure engine crate: receives one period's pre-loaded statement records and
//! returns balanced journal entries, a reconciliation result and a period
//! report. CSV loaders live in [`load`]; the crate never touches paths on its
//! own beyond [`load::read_input`].

pub mod accounts;
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod journal;
pub mod load;
pub mod model;
pub mod report;
pub mod validate;
pub mod valuation;

pub use accounts::{AccountLookup, ChartOfAccounts};
pub use config::BooksConfig;
pub use engine::run;
pub use error::{InputKind, ReconError};
pub use model::{EntryBlock, JournalEntry, JournalRun, RecordSet, StatementInput, StatementPeriod};
