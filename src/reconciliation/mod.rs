//! Reconciliation of the ledger against its own invariants
//!
//! The posting engine only ever writes balanced vouchers, but entries can
//! also arrive through migrations or direct store manipulation. The check
//! here audits already-posted data: every voucher's entries within a range
//! must sum to equal debits and credits. Entry-level reconciliation flags
//! (reconciled by whom, and when) are the only mutation the ledger allows.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DateRange, EngineConfig};
use crate::traits::*;
use crate::types::*;

/// A voucher whose entries do not balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbalancedVoucher {
    pub voucher_id: Uuid,
    pub entry_count: usize,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// `total_debit - total_credit`
    pub difference: BigDecimal,
}

/// Result of a per-voucher balance audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub business_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub vouchers_checked: usize,
    pub entries_checked: usize,
    pub unbalanced_vouchers: Vec<UnbalancedVoucher>,
    pub is_reconciled: bool,
}

/// Audits posted vouchers and maintains entry reconciliation flags
pub struct ReconciliationEngine<S: LedgerStorage> {
    storage: S,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage> ReconciliationEngine<S> {
    pub fn new(storage: S, config: Arc<EngineConfig>) -> Self {
        Self { storage, config }
    }

    /// List every voucher whose entries in the range differ by more than the tolerance
    pub async fn reconciliation_check(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<ReconciliationReport> {
        if !self.storage.business_exists(business_id).await? {
            return Err(LedgerError::business_not_found(business_id));
        }

        let totals = self
            .storage
            .aggregate_voucher_totals(business_id, range)
            .await?;

        let vouchers_checked = totals.len();
        let entries_checked = totals.iter().map(|t| t.entry_count).sum();
        let unbalanced_vouchers: Vec<UnbalancedVoucher> = totals
            .into_iter()
            .filter_map(|row| {
                let difference = &row.totals.debit - &row.totals.credit;
                if self.config.within_tolerance(&difference) {
                    return None;
                }
                Some(UnbalancedVoucher {
                    voucher_id: row.voucher_id,
                    entry_count: row.entry_count,
                    total_debit: row.totals.debit,
                    total_credit: row.totals.credit,
                    difference,
                })
            })
            .collect();

        for voucher in &unbalanced_vouchers {
            tracing::warn!(
                business_id = %business_id,
                voucher_id = %voucher.voucher_id,
                difference = %voucher.difference,
                "voucher entries do not balance"
            );
        }

        Ok(ReconciliationReport {
            business_id,
            from_date: range.from,
            to_date: range.to,
            vouchers_checked,
            entries_checked,
            is_reconciled: unbalanced_vouchers.is_empty(),
            unbalanced_vouchers,
        })
    }

    /// Mark entries reconciled by `user_id`; returns how many changed state
    pub async fn mark_reconciled(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
        user_id: Uuid,
    ) -> LedgerResult<usize> {
        let now = chrono::Utc::now().naive_utc();
        let changed = self
            .storage
            .set_reconciliation(
                business_id,
                entry_ids,
                ReconciliationStatus::Reconciled,
                Some(user_id),
                Some(now),
            )
            .await?;
        tracing::debug!(entries = entry_ids.len(), changed, "entries reconciled");
        Ok(changed)
    }

    /// Clear reconciliation on entries; returns how many changed state
    pub async fn mark_unreconciled(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
    ) -> LedgerResult<usize> {
        self.storage
            .set_reconciliation(
                business_id,
                entry_ids,
                ReconciliationStatus::Unreconciled,
                None,
                None,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    struct Fixture {
        storage: MemoryStorage,
        business: Uuid,
        cash: Uuid,
        bank: Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let storage = MemoryStorage::new();
            let business = Uuid::new_v4();
            storage.register_business(business).unwrap();
            let cash = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
            let bank = Account::new(business, "1100".into(), "Bank".into(), AccountType::Asset, None);
            storage.insert_account(&cash).await.unwrap();
            storage.insert_account(&bank).await.unwrap();
            Self {
                storage,
                business,
                cash: cash.id,
                bank: bank.id,
            }
        }

        fn entry(&self, voucher: Uuid, account: Uuid, side: EntryType, amount: &str) -> LedgerEntry {
            LedgerEntry::new(
                self.business,
                voucher,
                date(3),
                account,
                side,
                amount.parse().unwrap(),
                "INR".to_string(),
                BigDecimal::from(1),
            )
        }

        fn engine(&self) -> ReconciliationEngine<MemoryStorage> {
            ReconciliationEngine::new(self.storage.clone(), Arc::new(EngineConfig::default()))
        }
    }

    #[tokio::test]
    async fn flags_only_vouchers_outside_tolerance() {
        let fx = Fixture::new().await;
        let (good, rounding, bad) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        fx.storage
            .append_entries(vec![
                fx.entry(good, fx.cash, EntryType::Debit, "100"),
                fx.entry(good, fx.bank, EntryType::Credit, "100"),
                fx.entry(rounding, fx.cash, EntryType::Debit, "10.005"),
                fx.entry(rounding, fx.bank, EntryType::Credit, "10.00"),
                fx.entry(bad, fx.cash, EntryType::Debit, "100"),
                fx.entry(bad, fx.bank, EntryType::Credit, "90"),
            ])
            .await
            .unwrap();

        let report = fx
            .engine()
            .reconciliation_check(fx.business, DateRange::new(date(1), date(31)).unwrap())
            .await
            .unwrap();

        assert_eq!(report.vouchers_checked, 3);
        assert_eq!(report.entries_checked, 6);
        assert!(!report.is_reconciled);
        assert_eq!(report.unbalanced_vouchers.len(), 1);
        assert_eq!(report.unbalanced_vouchers[0].voucher_id, bad);
        assert_eq!(report.unbalanced_vouchers[0].difference, BigDecimal::from(10));
    }

    #[tokio::test]
    async fn empty_range_is_reconciled() {
        let fx = Fixture::new().await;
        let report = fx
            .engine()
            .reconciliation_check(fx.business, DateRange::new(date(1), date(2)).unwrap())
            .await
            .unwrap();
        assert!(report.is_reconciled);
        assert_eq!(report.vouchers_checked, 0);
    }

    #[tokio::test]
    async fn unknown_business_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx
            .engine()
            .reconciliation_check(Uuid::new_v4(), DateRange::new(date(1), date(2)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn marking_entries_round_trips_their_flags() {
        let fx = Fixture::new().await;
        let voucher = Uuid::new_v4();
        let ids = fx
            .storage
            .append_entries(vec![
                fx.entry(voucher, fx.cash, EntryType::Debit, "5"),
                fx.entry(voucher, fx.bank, EntryType::Credit, "5"),
            ])
            .await
            .unwrap();
        let engine = fx.engine();
        let clerk = Uuid::new_v4();

        assert_eq!(engine.mark_reconciled(fx.business, &ids[..1], clerk).await.unwrap(), 1);
        let entries = fx.storage.entries_for_voucher(voucher).await.unwrap();
        let marked = entries.iter().find(|e| e.id == ids[0]).unwrap();
        assert_eq!(marked.reconciliation_status, ReconciliationStatus::Reconciled);
        assert_eq!(marked.reconciled_by, Some(clerk));
        assert!(marked.reconciled_at.is_some());

        assert_eq!(engine.mark_unreconciled(fx.business, &ids).await.unwrap(), 1);
        let entries = fx.storage.entries_for_voucher(voucher).await.unwrap();
        assert!(entries
            .iter()
            .all(|e| e.reconciliation_status == ReconciliationStatus::Unreconciled
                && e.reconciled_by.is_none()));

        let err = engine
            .mark_reconciled(fx.business, &[Uuid::new_v4()], clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        // Another business cannot touch these entries
        let err = engine
            .mark_reconciled(Uuid::new_v4(), &ids, clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        let entries = fx.storage.entries_for_voucher(voucher).await.unwrap();
        assert!(entries
            .iter()
            .all(|e| e.reconciliation_status == ReconciliationStatus::Unreconciled));
    }
}
