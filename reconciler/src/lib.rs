//! Payment Reconciler
//!
//! Confirms pending bank-transfer payments against the transaction history
//! exposed by each monitored bank account, and credits the seller's wallet
//! exactly once per confirmed payment.
//!
//! # Architecture
//!
//! A reconciliation pass runs in four steps:
//!
//! 1. **Collection**: Load pending, unexpired payments from the store
//! 2. **Fetching**: Pull transaction history once per bank account and
//!    normalize it into canonical [`Transaction`]s
//! 3. **Matching**: Find the incoming transaction carrying the expected
//!    amount and transfer reference for each payment
//! 4. **Settlement**: Credit the wallet and complete the payment in one
//!    storage unit, then purge expired payments
//!
//! # Example
//!
//! ```no_run
//! use payment_reconciler::{BankClient, InMemoryStore, ReconcilerConfig, ReconciliationEngine};
//!
//! #[tokio::main]
//! async fn main() -> payment_reconciler::Result<()> {
//!     let config = ReconcilerConfig::default();
//!     let source = BankClient::new(&config)?;
//!     let engine = ReconciliationEngine::new(InMemoryStore::new(), source, config);
//!
//!     let summary = engine.run_pass().await;
//!     println!("checked {}, completed {}, purged {}",
//!              summary.checked, summary.updated, summary.deleted);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod formats;
pub mod matcher;
pub mod metrics;
pub mod store;
pub mod types;

// Re-exports
pub use config::{MatchPolicy, ReconcilerConfig};
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use fetcher::{BankClient, FetchError, FetchOutcome, TransactionSource};
pub use formats::UpstreamFormat;
pub use matcher::Matcher;
pub use store::{CompletionOutcome, CompletionRequest, InMemoryStore, PaymentStore};
pub use types::*;
