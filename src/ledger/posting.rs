//! Posting of draft vouchers into the ledger
//!
//! Posting is the only path from a mutable [`Voucher`] to immutable
//! [`LedgerEntry`] rows. The engine validates everything up front and then
//! hands a single [`PostingCommit`] to storage, which re-checks the voucher's
//! status and version and writes entries plus the status flip atomically.
//! Two concurrent posts of the same voucher therefore produce one success and
//! one `InvalidState` failure.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::traits::*;
use crate::types::*;

/// What a successful post created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingReceipt {
    pub voucher_id: Uuid,
    pub voucher_number: String,
    pub entries_created: usize,
    pub entry_ids: Vec<Uuid>,
}

/// Structured outcome of a post, for callers that branch on `success`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingResult {
    pub success: bool,
    pub message: String,
    pub entries_created: usize,
    pub entry_ids: Vec<Uuid>,
    /// Set when the voucher was rejected as unbalanced
    pub difference: Option<BigDecimal>,
}

impl From<LedgerResult<PostingReceipt>> for PostingResult {
    fn from(result: LedgerResult<PostingReceipt>) -> Self {
        match result {
            Ok(receipt) => PostingResult {
                success: true,
                message: format!(
                    "Voucher {} posted with {} ledger entries",
                    receipt.voucher_number, receipt.entries_created
                ),
                entries_created: receipt.entries_created,
                entry_ids: receipt.entry_ids,
                difference: None,
            },
            Err(err) => {
                let difference = match &err {
                    LedgerError::Unbalanced { difference, .. } => Some(difference.clone()),
                    _ => None,
                };
                PostingResult {
                    success: false,
                    message: err.to_string(),
                    entries_created: 0,
                    entry_ids: Vec::new(),
                    difference,
                }
            }
        }
    }
}

/// Opening balance of one account, on its debit or credit side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBalance {
    pub account_id: Uuid,
    pub side: EntryType,
    pub amount: BigDecimal,
}

/// Converts draft vouchers into balanced ledger entries
pub struct PostingEngine<S: LedgerStorage> {
    storage: S,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage> PostingEngine<S> {
    /// Create a new posting engine
    pub fn new(storage: S, config: Arc<EngineConfig>) -> Self {
        Self { storage, config }
    }

    /// Post a draft voucher of `business_id` on behalf of `acting_user_id`
    pub async fn post_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        acting_user_id: Uuid,
    ) -> LedgerResult<PostingReceipt> {
        self.post(business_id, voucher_id, acting_user_id, false).await
    }

    /// Post a voucher whose entries represent opening balances
    pub(crate) async fn post_opening_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        acting_user_id: Uuid,
    ) -> LedgerResult<PostingReceipt> {
        self.post(business_id, voucher_id, acting_user_id, true).await
    }

    async fn post(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        acting_user_id: Uuid,
        is_opening_balance: bool,
    ) -> LedgerResult<PostingReceipt> {
        let voucher = self
            .storage
            .get_voucher(voucher_id)
            .await?
            .filter(|v| v.business_id == business_id)
            .ok_or_else(|| LedgerError::voucher_not_found(voucher_id))?;

        match voucher.status {
            VoucherStatus::Draft => {}
            VoucherStatus::Posted => {
                return Err(LedgerError::InvalidState(format!(
                    "Voucher {} is already posted",
                    voucher.voucher_number
                )))
            }
            VoucherStatus::Cancelled => {
                return Err(LedgerError::InvalidState(format!(
                    "Voucher {} is cancelled",
                    voucher.voucher_number
                )))
            }
        }

        if let Err(err) = self.validate(&voucher).await {
            tracing::warn!(
                voucher_id = %voucher_id,
                voucher_number = %voucher.voucher_number,
                error = %err,
                "voucher rejected for posting"
            );
            return Err(err);
        }

        let entries = build_entries(&voucher, is_opening_balance);
        let expected_version = voucher.version;
        let voucher_number = voucher.voucher_number.clone();

        let mut posted = voucher;
        posted.status = VoucherStatus::Posted;
        posted.posted_at = Some(chrono::Utc::now().naive_utc());
        posted.posted_by = Some(acting_user_id);
        posted.updated_at = chrono::Utc::now().naive_utc();
        posted.version += 1;

        let entry_ids = self
            .storage
            .commit_posting(PostingCommit {
                voucher: posted,
                expected_version,
                entries,
            })
            .await
            .map_err(|err| match err {
                // Lost the race: the voucher changed after we loaded it.
                LedgerError::Conflict(message) => LedgerError::InvalidState(message),
                other => other,
            })?;

        tracing::info!(
            voucher_id = %voucher_id,
            voucher_number = %voucher_number,
            posted_by = %acting_user_id,
            entries = entry_ids.len(),
            "voucher posted"
        );

        Ok(PostingReceipt {
            voucher_id,
            voucher_number,
            entries_created: entry_ids.len(),
            entry_ids,
        })
    }

    /// Balance and account checks; nothing is written before these pass
    async fn validate(&self, voucher: &Voucher) -> LedgerResult<()> {
        if voucher.lines.is_empty() {
            return Err(LedgerError::InvalidArgument(format!(
                "Voucher {} has no lines",
                voucher.voucher_number
            )));
        }

        for line in &voucher.lines {
            if line.side().is_none() {
                return Err(LedgerError::InvalidArgument(format!(
                    "Line {} must have exactly one of debit or credit set",
                    line.line_number
                )));
            }
        }

        let debit = voucher.total_debits();
        let credit = voucher.total_credits();
        let base_debit = &debit * &voucher.exchange_rate;
        let base_credit = &credit * &voucher.exchange_rate;
        self.check_balance(debit, credit)?;
        // Reports and the reconciliation check read base amounts
        self.check_balance(base_debit, base_credit)?;

        self.check_accounts(
            voucher.business_id,
            voucher.lines.iter().map(|line| line.account_id).collect::<Vec<_>>(),
        )
        .await
    }

    fn check_balance(&self, debit: BigDecimal, credit: BigDecimal) -> LedgerResult<()> {
        let difference = (&debit - &credit).abs();
        if self.config.within_tolerance(&difference) {
            Ok(())
        } else {
            Err(LedgerError::Unbalanced {
                debit,
                credit,
                difference,
            })
        }
    }

    /// Every account must exist, belong to `business_id` and be active
    pub(crate) async fn check_accounts(
        &self,
        business_id: Uuid,
        account_ids: impl IntoIterator<Item = Uuid>,
    ) -> LedgerResult<()> {
        let mut checked = HashSet::new();
        for account_id in account_ids {
            if !checked.insert(account_id) {
                continue;
            }
            let account = self.storage.get_account(account_id).await?.ok_or_else(|| {
                LedgerError::InvalidAccount {
                    account_id,
                    reason: "account does not exist".to_string(),
                }
            })?;
            if account.business_id != business_id {
                return Err(LedgerError::InvalidAccount {
                    account_id: account.id,
                    reason: format!("account '{}' belongs to another business", account.code),
                });
            }
            if !account.is_active {
                return Err(LedgerError::InvalidAccount {
                    account_id: account.id,
                    reason: format!("account '{}' is inactive", account.code),
                });
            }
        }

        Ok(())
    }

    /// Whether the voucher has produced ledger entries in `business_id`
    pub async fn has_ledger_entries(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<bool> {
        match self.storage.get_voucher(voucher_id).await? {
            Some(voucher) if voucher.business_id == business_id => {
                self.storage.voucher_has_entries(voucher_id).await
            }
            _ => Ok(false),
        }
    }
}

/// One ledger entry per voucher line, dated on the voucher date
fn build_entries(voucher: &Voucher, is_opening_balance: bool) -> Vec<LedgerEntry> {
    voucher
        .lines
        .iter()
        .filter_map(|line| {
            let (side, amount) = line.side()?;
            let mut entry = LedgerEntry::new(
                voucher.business_id,
                voucher.id,
                voucher.date,
                line.account_id,
                side,
                amount.clone(),
                voucher.currency.clone(),
                voucher.exchange_rate.clone(),
            );
            entry.voucher_line_id = Some(line.id);
            entry.cost_center = line.cost_center.clone();
            entry.project = line.project.clone();
            entry.narration = line.narration.clone().or_else(|| voucher.narration.clone());
            entry.is_opening_balance = is_opening_balance;
            Some(entry)
        })
        .collect()
}

/// Lines for an opening-balance voucher: the given balances plus one line on
/// `equity_account_id` that brings the voucher into balance
pub(crate) fn opening_balance_lines(
    balances: &[OpeningBalance],
    equity_account_id: Uuid,
) -> LedgerResult<Vec<VoucherLineInput>> {
    let zero = BigDecimal::from(0);
    let mut lines = Vec::with_capacity(balances.len() + 1);
    let mut net_debit = BigDecimal::from(0);

    for balance in balances {
        if balance.amount <= zero {
            return Err(LedgerError::InvalidArgument(format!(
                "Opening balance for account {} must be positive",
                balance.account_id
            )));
        }
        let narration = Some("Opening balance".to_string());
        match balance.side {
            EntryType::Debit => {
                net_debit += &balance.amount;
                lines.push(VoucherLineInput::debit(
                    balance.account_id,
                    balance.amount.clone(),
                    narration,
                ));
            }
            EntryType::Credit => {
                net_debit -= &balance.amount;
                lines.push(VoucherLineInput::credit(
                    balance.account_id,
                    balance.amount.clone(),
                    narration,
                ));
            }
        }
    }

    let narration = Some("Opening balance difference".to_string());
    if net_debit > zero {
        lines.push(VoucherLineInput::credit(equity_account_id, net_debit, narration));
    } else if net_debit < zero {
        lines.push(VoucherLineInput::debit(equity_account_id, net_debit.abs(), narration));
    }

    Ok(lines)
}
