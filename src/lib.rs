//! # Ledger Engine
//!
//! Voucher posting and financial reporting over a double-entry ledger.
//!
//! ## Features
//!
//! - **Chart of accounts**: hierarchical, business-scoped accounts typed as Asset, Liability,
//!   Equity, Income or Expense, each with a normal debit or credit balance
//! - **Vouchers**: editable drafts whose totals are always recomputed from their lines
//! - **Posting**: atomic conversion of a balanced draft into append-only ledger entries,
//!   with exactly-once semantics under concurrent posts
//! - **Statements and reports**: account statements with running balances, trial balance,
//!   profit and loss, and balance sheet
//! - **Reconciliation**: per-voucher balance audit of posted data and entry reconciliation flags
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_engine::{patterns, Ledger, MemoryStorage};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use uuid::Uuid;
//!
//! # async fn run() -> ledger_engine::LedgerResult<()> {
//! let storage = MemoryStorage::new();
//! let business = Uuid::new_v4();
//! let user = Uuid::new_v4();
//! storage.register_business(business)?;
//!
//! let ledger = Ledger::new(storage);
//! let chart = ledger.setup_standard_chart_of_accounts(business).await?;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
//! let draft = patterns::receipt(
//!     date,
//!     "Counter sale",
//!     chart["cash"].id,
//!     chart["sales_revenue"].id,
//!     BigDecimal::from(1000),
//! )?;
//! let voucher = ledger.create_voucher(business, user, draft).await?;
//! ledger.post_voucher(business, voucher.id, user).await?;
//!
//! let trial_balance = ledger.get_trial_balance(business, Some(date), Some(date)).await?;
//! assert!(trial_balance.is_balanced);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use self::config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::*;

// Re-export voucher patterns for convenience
pub use ledger::voucher::patterns;
