//! Account statements over the append-only ledger

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DateRange;
use crate::traits::*;
use crate::types::*;

/// One entry on a statement with the balance after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub entry_id: Uuid,
    pub voucher_id: Uuid,
    pub entry_date: NaiveDate,
    pub narration: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub running_balance: SignedBalance,
    pub is_opening_balance: bool,
    pub reconciliation_status: ReconciliationStatus,
}

/// Movements of one account over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatement {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Net of all entries strictly before `from_date`
    pub opening_balance: SignedBalance,
    pub lines: Vec<StatementLine>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub closing_balance: SignedBalance,
}

/// Read side of the ledger for single accounts and vouchers
pub struct StatementManager<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> StatementManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Statement of an account of `business_id` over an inclusive range
    pub async fn get_statement(
        &self,
        business_id: Uuid,
        account_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<LedgerStatement> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .filter(|account| account.business_id == business_id)
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;
        let normal = account.normal_balance();

        let opening = self
            .storage
            .account_totals_before(account_id, range.from)
            .await?;
        let entries = self.storage.entries_for_account(account_id, range).await?;

        let mut running = opening.net_for(normal);
        let opening_balance = SignedBalance::from_net(&running, normal);
        let mut period = DebitCredit::default();
        let mut lines = Vec::with_capacity(entries.len());

        for entry in entries {
            period.add_entry(&entry);
            running += match normal {
                EntryType::Debit => &entry.base_debit_amount - &entry.base_credit_amount,
                EntryType::Credit => &entry.base_credit_amount - &entry.base_debit_amount,
            };
            lines.push(StatementLine {
                entry_id: entry.id,
                voucher_id: entry.voucher_id,
                entry_date: entry.entry_date,
                narration: entry.narration,
                debit: entry.base_debit_amount,
                credit: entry.base_credit_amount,
                running_balance: SignedBalance::from_net(&running, normal),
                is_opening_balance: entry.is_opening_balance,
                reconciliation_status: entry.reconciliation_status,
            });
        }

        let closing_balance = SignedBalance::from_net(&running, normal);

        Ok(LedgerStatement {
            account_id,
            account_code: account.code,
            account_name: account.name,
            account_type: account.account_type,
            from_date: range.from,
            to_date: range.to,
            opening_balance,
            lines,
            total_debit: period.debit,
            total_credit: period.credit,
            closing_balance,
        })
    }

    /// Entries created from a voucher of `business_id`
    pub async fn entries_for_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let mut entries = self.storage.entries_for_voucher(voucher_id).await?;
        entries.retain(|entry| entry.business_id == business_id);
        Ok(entries)
    }
}
