//! Ledger module: chart of accounts, vouchers, posting and statements

pub mod account;
pub mod core;
pub mod posting;
pub mod statement;
pub mod voucher;

pub use account::*;
pub use self::core::*;
pub use posting::*;
pub use statement::*;
pub use voucher::*;
