//! # Suppressions
//!
//! Persisted overrides, the ledger that applies them, and the usage records
//! that prove they are still needed.

pub mod config;
pub mod ledger;
pub mod usage;

pub use config::{ContentModuleSuppression, PluginSuppression, SuppressionConfig};
pub use ledger::{LedgerInput, LedgerOutcome, SuppressionLedger};
pub use usage::{SuppressionType, SuppressionUsage};
