//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::DateRange;
use crate::types::*;

/// Per-account sums returned by [`LedgerStorage::aggregate_account_activity`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account_id: Uuid,
    /// Entries dated strictly before the range
    pub opening: DebitCredit,
    /// Entries dated within the range
    pub period: DebitCredit,
}

/// Per-voucher sums returned by [`LedgerStorage::aggregate_voucher_totals`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherTotals {
    pub voucher_id: Uuid,
    pub entry_count: usize,
    pub totals: DebitCredit,
}

/// Everything a successful post writes, committed as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct PostingCommit {
    /// The voucher in its posted state
    pub voucher: Voucher,
    /// Version the voucher had when it was loaded for posting
    pub expected_version: u64,
    pub entries: Vec<LedgerEntry>,
}

/// Storage abstraction for the ledger system
///
/// This trait allows the engine to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// Methods take `&self` so a single handle can serve concurrent requests;
/// implementations provide their own synchronization.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Whether the business is known to the identity collaborator
    async fn business_exists(&self, business_id: Uuid) -> LedgerResult<bool>;

    /// Save a new account
    async fn insert_account(&self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>>;

    /// Find an account by its business-unique code
    async fn find_account_by_code(
        &self,
        business_id: Uuid,
        code: &str,
    ) -> LedgerResult<Option<Account>>;

    /// List a business's accounts, optionally filtered by type, ordered by code
    async fn list_accounts(
        &self,
        business_id: Uuid,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>>;

    /// Replace a stored account
    async fn update_account(&self, account: &Account) -> LedgerResult<()>;

    /// Delete an account; fails with `Conflict` if ledger entries reference it
    async fn delete_account(&self, account_id: Uuid) -> LedgerResult<()>;

    /// Next value of the business's voucher number sequence, starting at 1
    async fn next_voucher_sequence(&self, business_id: Uuid) -> LedgerResult<u64>;

    /// Save a new voucher with its lines
    async fn insert_voucher(&self, voucher: &Voucher) -> LedgerResult<()>;

    /// Get a voucher with its lines
    async fn get_voucher(&self, voucher_id: Uuid) -> LedgerResult<Option<Voucher>>;

    /// List a business's vouchers, ordered by date then voucher number
    async fn list_vouchers(
        &self,
        business_id: Uuid,
        filter: &VoucherFilter,
    ) -> LedgerResult<Vec<Voucher>>;

    /// Replace a draft voucher.
    ///
    /// Fails with `InvalidState` if the stored voucher is no longer a draft and
    /// with `Conflict` if its version differs from `expected_version`.
    async fn update_voucher(&self, voucher: &Voucher, expected_version: u64) -> LedgerResult<()>;

    /// Delete a draft voucher under the same checks as [`LedgerStorage::update_voucher`]
    async fn delete_voucher(&self, voucher_id: Uuid, expected_version: u64) -> LedgerResult<()>;

    /// Atomically append the entries and store the posted voucher.
    ///
    /// Re-checks that the stored voucher is still a draft at `expected_version`.
    /// Either everything is written or nothing is. Returns the ids of the
    /// appended entries in order.
    async fn commit_posting(&self, commit: PostingCommit) -> LedgerResult<Vec<Uuid>>;

    /// Append entries outside the posting path (imports, migrations)
    async fn append_entries(&self, entries: Vec<LedgerEntry>) -> LedgerResult<Vec<Uuid>>;

    /// Whether any ledger entry was created from the voucher
    async fn voucher_has_entries(&self, voucher_id: Uuid) -> LedgerResult<bool>;

    /// Whether any ledger entry references the account
    async fn account_has_entries(&self, account_id: Uuid) -> LedgerResult<bool>;

    /// Entries created from a voucher, in creation order
    async fn entries_for_voucher(&self, voucher_id: Uuid) -> LedgerResult<Vec<LedgerEntry>>;

    /// Entries for an account within the range, ordered by date then creation order
    async fn entries_for_account(
        &self,
        account_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<LedgerEntry>>;

    /// Base-currency sums of an account's entries dated strictly before `date`
    async fn account_totals_before(
        &self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> LedgerResult<DebitCredit>;

    /// Opening and period sums for every account of the business with any
    /// entry dated on or before `range.to`
    async fn aggregate_account_activity(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<AccountActivity>>;

    /// Sums per voucher of the entries dated within the range
    async fn aggregate_voucher_totals(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<VoucherTotals>>;

    /// Set the reconciliation fields of the given entries of a business;
    /// returns how many changed
    async fn set_reconciliation(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
        status: ReconciliationStatus,
        by: Option<Uuid>,
        at: Option<NaiveDateTime>,
    ) -> LedgerResult<usize>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate header and lines before a draft is stored
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default voucher validator: at least one line, every line one-sided
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()> {
        if draft.header.voucher_type.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "Voucher type cannot be empty".to_string(),
            ));
        }

        if let Some(rate) = &draft.header.exchange_rate {
            if *rate <= BigDecimal::from(0) {
                return Err(LedgerError::InvalidArgument(
                    "Exchange rate must be positive".to_string(),
                ));
            }
        }

        if draft.lines.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "Voucher must have at least one line".to_string(),
            ));
        }

        let zero = BigDecimal::from(0);
        for (index, line) in draft.lines.iter().enumerate() {
            let line_number = index + 1;
            if line.debit_amount < zero || line.credit_amount < zero {
                return Err(LedgerError::InvalidArgument(format!(
                    "Line {}: amounts cannot be negative",
                    line_number
                )));
            }
            match (line.debit_amount > zero, line.credit_amount > zero) {
                (true, true) => {
                    return Err(LedgerError::InvalidArgument(format!(
                        "Line {}: debit and credit cannot both be set",
                        line_number
                    )))
                }
                (false, false) => {
                    return Err(LedgerError::InvalidArgument(format!(
                        "Line {}: either debit or credit must be set",
                        line_number
                    )))
                }
                _ => {}
            }
            for (label, amount) in [
                ("discount", &line.discount_amount),
                ("tax", &line.tax_amount),
            ] {
                if amount.as_ref().is_some_and(|a| *a < zero) {
                    return Err(LedgerError::InvalidArgument(format!(
                        "Line {}: {} amount cannot be negative",
                        line_number, label
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Duplicate (account, side) pairs within a draft
pub(crate) fn duplicate_line_accounts(draft: &VoucherDraft) -> Option<Uuid> {
    let zero = BigDecimal::from(0);
    let mut seen = HashSet::new();
    draft
        .lines
        .iter()
        .find(|line| !seen.insert((line.account_id, line.debit_amount > zero)))
        .map(|line| line.account_id)
}
