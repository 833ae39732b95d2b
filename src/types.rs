//! Core types and data structures for the posting engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Inventory, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business (Capital, Retained Earnings, etc.)
    Equity,
    /// Income/Revenue - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance type for this account type
    /// Assets and Expenses normally have debit balances
    /// Liabilities, Equity, and Income normally have credit balances
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => EntryType::Credit,
        }
    }

    /// Display name of the account type
    pub fn name(&self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        }
    }

    /// Whether balances of this type flow into the profit and loss statement
    pub fn is_profit_and_loss(&self) -> bool {
        matches!(self, AccountType::Income | AccountType::Expense)
    }
}

/// Sides of a double-entry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit entry - increases Assets and Expenses, decreases Liabilities, Equity, and Income
    Debit,
    /// Credit entry - increases Liabilities, Equity, and Income, decreases Assets and Expenses
    Credit,
}

impl EntryType {
    /// The opposite side
    pub fn opposite(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }

    /// Short label used on statements
    pub fn label(&self) -> &'static str {
        match self {
            EntryType::Debit => "Dr",
            EntryType::Credit => "Cr",
        }
    }
}

/// Account in a business's chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: Uuid,
    /// Owning business
    pub business_id: Uuid,
    /// Account code, unique within the business
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Optional parent account for hierarchical chart of accounts
    pub parent_id: Option<Uuid>,
    /// Inactive accounts cannot receive postings
    pub is_active: bool,
    /// System accounts cannot be edited or deleted
    pub is_system_account: bool,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active, non-system account
    pub fn new(
        business_id: Uuid,
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<Uuid>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            business_id,
            code,
            name,
            description: None,
            account_type,
            parent_id,
            is_active: true,
            is_system_account: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Normal balance side of this account
    pub fn normal_balance(&self) -> EntryType {
        self.account_type.normal_balance()
    }
}

/// Input for creating an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub is_system_account: bool,
}

impl NewAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            account_type,
            parent_id: None,
            is_system_account: false,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Editable account fields. Code and type are fixed once the account exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Lifecycle of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Editable document, not yet in the ledger
    Draft,
    /// Converted into ledger entries; immutable
    Posted,
    /// Abandoned draft; immutable
    Cancelled,
}

impl VoucherStatus {
    pub fn is_draft(&self) -> bool {
        *self == VoucherStatus::Draft
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VoucherStatus::Draft => "draft",
            VoucherStatus::Posted => "posted",
            VoucherStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Source accounting document with one or more lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub business_id: Uuid,
    /// Business-unique number assigned at creation
    pub voucher_number: String,
    /// Free-form type: Payment, Receipt, Journal, Sales, Purchase, ...
    pub voucher_type: String,
    pub date: NaiveDate,
    pub party_name: Option<String>,
    pub reference: Option<String>,
    pub narration: Option<String>,
    /// Sum of line debits
    pub total_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    /// Header-only adjustment; never posted on its own
    pub round_off_amount: BigDecimal,
    /// `total_amount + round_off_amount`, informational
    pub net_amount: BigDecimal,
    pub currency: String,
    pub exchange_rate: BigDecimal,
    pub status: VoucherStatus,
    pub posted_at: Option<NaiveDateTime>,
    pub posted_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Incremented on every stored change; used for optimistic concurrency
    pub version: u64,
    pub lines: Vec<VoucherLine>,
}

impl Voucher {
    /// Calculate total debits across lines
    pub fn total_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit_amount).sum()
    }

    /// Calculate total credits across lines
    pub fn total_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit_amount).sum()
    }
}

/// One line of a voucher. Exactly one of debit/credit is non-zero once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLine {
    pub id: Uuid,
    pub voucher_id: Uuid,
    /// 1-based position within the voucher
    pub line_number: u32,
    pub account_id: Uuid,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub narration: Option<String>,
    pub item: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub discount_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub cost_center: Option<String>,
    pub project: Option<String>,
    pub warehouse: Option<String>,
}

impl VoucherLine {
    /// Side and amount of a one-sided line
    pub fn side(&self) -> Option<(EntryType, &BigDecimal)> {
        let zero = BigDecimal::from(0);
        match (self.debit_amount > zero, self.credit_amount > zero) {
            (true, false) => Some((EntryType::Debit, &self.debit_amount)),
            (false, true) => Some((EntryType::Credit, &self.credit_amount)),
            _ => None,
        }
    }
}

/// Voucher header as supplied by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherHeader {
    pub voucher_type: String,
    pub date: NaiveDate,
    pub party_name: Option<String>,
    pub reference: Option<String>,
    pub narration: Option<String>,
    /// Defaults to the configured base currency
    pub currency: Option<String>,
    /// Defaults to 1
    pub exchange_rate: Option<BigDecimal>,
    /// Defaults to 0
    pub round_off_amount: Option<BigDecimal>,
}

impl VoucherHeader {
    pub fn new(voucher_type: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            voucher_type: voucher_type.into(),
            date,
            party_name: None,
            reference: None,
            narration: None,
            currency: None,
            exchange_rate: None,
            round_off_amount: None,
        }
    }
}

/// Voucher line as supplied by a client. Both amounts are accepted here and
/// checked by the voucher validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLineInput {
    pub account_id: Uuid,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub narration: Option<String>,
    pub item: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub tax_amount: Option<BigDecimal>,
    pub cost_center: Option<String>,
    pub project: Option<String>,
    pub warehouse: Option<String>,
}

impl VoucherLineInput {
    fn blank(account_id: Uuid) -> Self {
        Self {
            account_id,
            debit_amount: BigDecimal::from(0),
            credit_amount: BigDecimal::from(0),
            narration: None,
            item: None,
            quantity: None,
            unit_price: None,
            discount_amount: None,
            tax_amount: None,
            cost_center: None,
            project: None,
            warehouse: None,
        }
    }

    /// Create a debit line
    pub fn debit(account_id: Uuid, amount: BigDecimal, narration: Option<String>) -> Self {
        Self {
            debit_amount: amount,
            narration,
            ..Self::blank(account_id)
        }
    }

    /// Create a credit line
    pub fn credit(account_id: Uuid, amount: BigDecimal, narration: Option<String>) -> Self {
        Self {
            credit_amount: amount,
            narration,
            ..Self::blank(account_id)
        }
    }
}

/// A complete draft request: header plus lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub header: VoucherHeader,
    pub lines: Vec<VoucherLineInput>,
}

/// Filters for listing vouchers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoucherFilter {
    pub status: Option<VoucherStatus>,
    pub voucher_type: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl VoucherFilter {
    pub fn matches(&self, voucher: &Voucher) -> bool {
        self.status.is_none_or(|s| voucher.status == s)
            && self
                .voucher_type
                .as_deref()
                .is_none_or(|t| voucher.voucher_type.eq_ignore_ascii_case(t))
            && self.from_date.is_none_or(|d| voucher.date >= d)
            && self.to_date.is_none_or(|d| voucher.date <= d)
    }
}

/// Reconciliation state of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    Unreconciled,
    Reconciled,
}

/// Immutable posted debit or credit against one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub business_id: Uuid,
    pub voucher_id: Uuid,
    pub voucher_line_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub account_id: Uuid,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub currency: String,
    pub exchange_rate: BigDecimal,
    /// `debit_amount * exchange_rate`
    pub base_debit_amount: BigDecimal,
    /// `credit_amount * exchange_rate`
    pub base_credit_amount: BigDecimal,
    pub cost_center: Option<String>,
    pub project: Option<String>,
    pub narration: Option<String>,
    pub is_opening_balance: bool,
    pub reconciliation_status: ReconciliationStatus,
    pub reconciled_by: Option<Uuid>,
    pub reconciled_at: Option<NaiveDateTime>,
    /// Creation order, assigned by the store on append
    pub sequence: u64,
    pub created_at: NaiveDateTime,
}

impl LedgerEntry {
    /// Create an unreconciled entry on one side of an account
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        business_id: Uuid,
        voucher_id: Uuid,
        entry_date: NaiveDate,
        account_id: Uuid,
        entry_type: EntryType,
        amount: BigDecimal,
        currency: String,
        exchange_rate: BigDecimal,
    ) -> Self {
        let zero = BigDecimal::from(0);
        let base = &amount * &exchange_rate;
        let (debit_amount, credit_amount, base_debit_amount, base_credit_amount) = match entry_type {
            EntryType::Debit => (amount, zero.clone(), base, zero),
            EntryType::Credit => (zero.clone(), amount, zero, base),
        };
        Self {
            id: Uuid::new_v4(),
            business_id,
            voucher_id,
            voucher_line_id: None,
            entry_date,
            account_id,
            debit_amount,
            credit_amount,
            currency,
            exchange_rate,
            base_debit_amount,
            base_credit_amount,
            cost_center: None,
            project: None,
            narration: None,
            is_opening_balance: false,
            reconciliation_status: ReconciliationStatus::Unreconciled,
            reconciled_by: None,
            reconciled_at: None,
            sequence: 0,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Debit and credit column sums
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebitCredit {
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

impl DebitCredit {
    pub fn new(debit: BigDecimal, credit: BigDecimal) -> Self {
        Self { debit, credit }
    }

    /// Add an entry's base-currency amounts
    pub fn add_entry(&mut self, entry: &LedgerEntry) {
        self.debit += &entry.base_debit_amount;
        self.credit += &entry.base_credit_amount;
    }

    /// Net amount signed by the given normal side: positive when the normal side dominates
    pub fn net_for(&self, normal: EntryType) -> BigDecimal {
        match normal {
            EntryType::Debit => &self.debit - &self.credit,
            EntryType::Credit => &self.credit - &self.debit,
        }
    }

    pub fn is_zero(&self) -> bool {
        let zero = BigDecimal::from(0);
        self.debit == zero && self.credit == zero
    }
}

impl std::ops::Add<&DebitCredit> for &DebitCredit {
    type Output = DebitCredit;

    fn add(self, rhs: &DebitCredit) -> DebitCredit {
        DebitCredit {
            debit: &self.debit + &rhs.debit,
            credit: &self.credit + &rhs.credit,
        }
    }
}

/// Absolute balance with its Dr/Cr side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBalance {
    pub amount: BigDecimal,
    pub side: EntryType,
}

impl SignedBalance {
    /// Interpret a net amount signed by `normal`: non-negative stays on the
    /// normal side, negative flips to the other side.
    pub fn from_net(net: &BigDecimal, normal: EntryType) -> Self {
        if *net >= BigDecimal::from(0) {
            Self {
                amount: net.clone(),
                side: normal,
            }
        } else {
            Self {
                amount: net.abs(),
                side: normal.opposite(),
            }
        }
    }

    /// Back to a net amount signed by `normal`
    pub fn to_net(&self, normal: EntryType) -> BigDecimal {
        if self.side == normal {
            self.amount.clone()
        } else {
            -self.amount.clone()
        }
    }

    /// Split into (debit column, credit column)
    pub fn columns(&self) -> (BigDecimal, BigDecimal) {
        match self.side {
            EntryType::Debit => (self.amount.clone(), BigDecimal::from(0)),
            EntryType::Credit => (BigDecimal::from(0), self.amount.clone()),
        }
    }
}

impl fmt::Display for SignedBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.side.label())
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Voucher is not balanced: debits = {debit}, credits = {credit}, difference = {difference}")]
    Unbalanced {
        debit: BigDecimal,
        credit: BigDecimal,
        difference: BigDecimal,
    },
    #[error("Invalid account {account_id}: {reason}")]
    InvalidAccount { account_id: Uuid, reason: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub(crate) fn account_not_found(account_id: Uuid) -> Self {
        LedgerError::NotFound(format!("account {}", account_id))
    }

    pub(crate) fn voucher_not_found(voucher_id: Uuid) -> Self {
        LedgerError::NotFound(format!("voucher {}", voucher_id))
    }

    pub(crate) fn business_not_found(business_id: Uuid) -> Self {
        LedgerError::NotFound(format!("business {}", business_id))
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_balance_follows_normal_side() {
        let debit_normal = SignedBalance::from_net(&BigDecimal::from(-40), EntryType::Debit);
        assert_eq!(debit_normal.side, EntryType::Credit);
        assert_eq!(debit_normal.amount, BigDecimal::from(40));
        assert_eq!(debit_normal.to_string(), "40 Cr");
        assert_eq!(debit_normal.to_net(EntryType::Debit), BigDecimal::from(-40));

        let credit_normal = SignedBalance::from_net(&BigDecimal::from(0), EntryType::Credit);
        assert_eq!(credit_normal.side, EntryType::Credit);
        assert_eq!(credit_normal.columns(), (BigDecimal::from(0), BigDecimal::from(0)));
    }

    #[test]
    fn ledger_entry_converts_to_base_currency() {
        let entry = LedgerEntry::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            Uuid::new_v4(),
            EntryType::Credit,
            BigDecimal::from(10),
            "USD".to_string(),
            "83.5".parse().unwrap(),
        );
        assert_eq!(entry.debit_amount, BigDecimal::from(0));
        assert_eq!(entry.base_credit_amount, BigDecimal::from(835));
    }

    #[test]
    fn voucher_line_side_rejects_two_sided_lines() {
        let mut line = VoucherLine {
            id: Uuid::new_v4(),
            voucher_id: Uuid::new_v4(),
            line_number: 1,
            account_id: Uuid::new_v4(),
            debit_amount: BigDecimal::from(5),
            credit_amount: BigDecimal::from(0),
            narration: None,
            item: None,
            quantity: None,
            unit_price: None,
            discount_amount: BigDecimal::from(0),
            tax_amount: BigDecimal::from(0),
            cost_center: None,
            project: None,
            warehouse: None,
        };
        assert_eq!(line.side().map(|(s, _)| s), Some(EntryType::Debit));
        line.credit_amount = BigDecimal::from(5);
        assert!(line.side().is_none());
    }
}
