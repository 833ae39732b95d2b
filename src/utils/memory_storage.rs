//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::config::DateRange;
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Tables {
    businesses: HashSet<Uuid>,
    accounts: HashMap<Uuid, Account>,
    vouchers: HashMap<Uuid, Voucher>,
    voucher_sequences: HashMap<Uuid, u64>,
    /// Append-only, in creation order
    entries: Vec<LedgerEntry>,
}

impl Tables {
    fn check_draft_version(&self, voucher_id: Uuid, expected_version: u64) -> LedgerResult<()> {
        let stored = self
            .vouchers
            .get(&voucher_id)
            .ok_or_else(|| LedgerError::voucher_not_found(voucher_id))?;
        if !stored.status.is_draft() {
            return Err(LedgerError::InvalidState(format!(
                "voucher {} is {}",
                stored.voucher_number, stored.status
            )));
        }
        if stored.version != expected_version {
            return Err(LedgerError::Conflict(format!(
                "voucher {} was modified concurrently (expected version {}, found {})",
                stored.voucher_number, expected_version, stored.version
            )));
        }
        Ok(())
    }

    fn next_sequence(&self) -> u64 {
        self.entries.last().map_or(1, |e| e.sequence + 1)
    }

    fn append(&mut self, entries: Vec<LedgerEntry>) -> Vec<Uuid> {
        let mut sequence = self.next_sequence();
        let mut ids = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.sequence = sequence;
            sequence += 1;
            ids.push(entry.id);
            self.entries.push(entry);
        }
        ids
    }

    fn check_entry_references(&self, entries: &[LedgerEntry]) -> LedgerResult<()> {
        for entry in entries {
            if !self.accounts.contains_key(&entry.account_id) {
                return Err(LedgerError::Storage(format!(
                    "ledger entry {} references missing account {}",
                    entry.id, entry.account_id
                )));
            }
        }
        Ok(())
    }
}

/// In-memory storage implementation for testing and development
///
/// All tables sit behind one lock, so every write is applied atomically.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a business known to the store
    pub fn register_business(&self, business_id: Uuid) -> LedgerResult<()> {
        self.write()?.businesses.insert(business_id);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }

    /// Number of stored ledger entries
    pub fn entry_count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.entries.len())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn business_exists(&self, business_id: Uuid) -> LedgerResult<bool> {
        Ok(self.read()?.businesses.contains(&business_id))
    }

    async fn insert_account(&self, account: &Account) -> LedgerResult<()> {
        let mut tables = self.write()?;
        let duplicate = tables.accounts.values().any(|existing| {
            existing.business_id == account.business_id && existing.code == account.code
        });
        if duplicate {
            return Err(LedgerError::Conflict(format!(
                "account code '{}' already exists",
                account.code
            )));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&account_id).cloned())
    }

    async fn find_account_by_code(
        &self,
        business_id: Uuid,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.business_id == business_id && a.code == code)
            .cloned())
    }

    async fn list_accounts(
        &self,
        business_id: Uuid,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        let tables = self.read()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|account| {
                account.business_id == business_id
                    && account_type.is_none_or(|t| account.account_type == t)
            })
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn update_account(&self, account: &Account) -> LedgerResult<()> {
        let mut tables = self.write()?;
        match tables.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(LedgerError::account_not_found(account.id)),
        }
    }

    async fn delete_account(&self, account_id: Uuid) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.entries.iter().any(|e| e.account_id == account_id) {
            return Err(LedgerError::Conflict(format!(
                "account {} has ledger entries",
                account_id
            )));
        }
        if tables.accounts.remove(&account_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::account_not_found(account_id))
        }
    }

    async fn next_voucher_sequence(&self, business_id: Uuid) -> LedgerResult<u64> {
        let mut tables = self.write()?;
        let sequence = tables.voucher_sequences.entry(business_id).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn insert_voucher(&self, voucher: &Voucher) -> LedgerResult<()> {
        let mut tables = self.write()?;
        let duplicate = tables.vouchers.values().any(|existing| {
            existing.business_id == voucher.business_id
                && existing.voucher_number == voucher.voucher_number
        });
        if duplicate {
            return Err(LedgerError::Conflict(format!(
                "voucher number {} already exists",
                voucher.voucher_number
            )));
        }
        tables.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn get_voucher(&self, voucher_id: Uuid) -> LedgerResult<Option<Voucher>> {
        Ok(self.read()?.vouchers.get(&voucher_id).cloned())
    }

    async fn list_vouchers(
        &self,
        business_id: Uuid,
        filter: &VoucherFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        let tables = self.read()?;
        let mut vouchers: Vec<Voucher> = tables
            .vouchers
            .values()
            .filter(|v| v.business_id == business_id && filter.matches(v))
            .cloned()
            .collect();
        vouchers.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.voucher_number.cmp(&b.voucher_number))
        });
        Ok(vouchers)
    }

    async fn update_voucher(&self, voucher: &Voucher, expected_version: u64) -> LedgerResult<()> {
        let mut tables = self.write()?;
        tables.check_draft_version(voucher.id, expected_version)?;
        tables.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn delete_voucher(&self, voucher_id: Uuid, expected_version: u64) -> LedgerResult<()> {
        let mut tables = self.write()?;
        tables.check_draft_version(voucher_id, expected_version)?;
        if tables.entries.iter().any(|e| e.voucher_id == voucher_id) {
            return Err(LedgerError::Conflict(format!(
                "voucher {} is referenced by ledger entries",
                voucher_id
            )));
        }
        tables.vouchers.remove(&voucher_id);
        Ok(())
    }

    async fn commit_posting(&self, commit: PostingCommit) -> LedgerResult<Vec<Uuid>> {
        let mut tables = self.write()?;
        tables.check_draft_version(commit.voucher.id, commit.expected_version)?;
        tables.check_entry_references(&commit.entries)?;

        let ids = tables.append(commit.entries);
        tables.vouchers.insert(commit.voucher.id, commit.voucher);
        Ok(ids)
    }

    async fn append_entries(&self, entries: Vec<LedgerEntry>) -> LedgerResult<Vec<Uuid>> {
        let mut tables = self.write()?;
        tables.check_entry_references(&entries)?;
        Ok(tables.append(entries))
    }

    async fn voucher_has_entries(&self, voucher_id: Uuid) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .entries
            .iter()
            .any(|e| e.voucher_id == voucher_id))
    }

    async fn account_has_entries(&self, account_id: Uuid) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .entries
            .iter()
            .any(|e| e.account_id == account_id))
    }

    async fn entries_for_voucher(&self, voucher_id: Uuid) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|e| e.voucher_id == voucher_id)
            .cloned()
            .collect())
    }

    async fn entries_for_account(
        &self,
        account_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let tables = self.read()?;
        let mut entries: Vec<LedgerEntry> = tables
            .entries
            .iter()
            .filter(|e| e.account_id == account_id && range.contains(e.entry_date))
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.entry_date, e.sequence));
        Ok(entries)
    }

    async fn account_totals_before(
        &self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> LedgerResult<DebitCredit> {
        let tables = self.read()?;
        let mut totals = DebitCredit::default();
        for entry in tables
            .entries
            .iter()
            .filter(|e| e.account_id == account_id && e.entry_date < date)
        {
            totals.add_entry(entry);
        }
        Ok(totals)
    }

    async fn aggregate_account_activity(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<AccountActivity>> {
        let tables = self.read()?;
        let mut activity: BTreeMap<Uuid, AccountActivity> = BTreeMap::new();
        for entry in tables
            .entries
            .iter()
            .filter(|e| e.business_id == business_id && e.entry_date <= range.to)
        {
            let row = activity
                .entry(entry.account_id)
                .or_insert_with(|| AccountActivity {
                    account_id: entry.account_id,
                    opening: DebitCredit::default(),
                    period: DebitCredit::default(),
                });
            if entry.entry_date < range.from {
                row.opening.add_entry(entry);
            } else {
                row.period.add_entry(entry);
            }
        }
        Ok(activity.into_values().collect())
    }

    async fn aggregate_voucher_totals(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<VoucherTotals>> {
        let tables = self.read()?;
        let mut order = Vec::new();
        let mut by_voucher: HashMap<Uuid, VoucherTotals> = HashMap::new();
        for entry in tables
            .entries
            .iter()
            .filter(|e| e.business_id == business_id && range.contains(e.entry_date))
        {
            let row = by_voucher.entry(entry.voucher_id).or_insert_with(|| {
                order.push(entry.voucher_id);
                VoucherTotals {
                    voucher_id: entry.voucher_id,
                    entry_count: 0,
                    totals: DebitCredit::default(),
                }
            });
            row.entry_count += 1;
            row.totals.add_entry(entry);
        }
        Ok(order
            .into_iter()
            .filter_map(|id| by_voucher.remove(&id))
            .collect())
    }

    async fn set_reconciliation(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
        status: ReconciliationStatus,
        by: Option<Uuid>,
        at: Option<NaiveDateTime>,
    ) -> LedgerResult<usize> {
        let mut tables = self.write()?;
        let wanted: HashSet<&Uuid> = entry_ids.iter().collect();
        if let Some(missing) = entry_ids.iter().find(|id| {
            !tables
                .entries
                .iter()
                .any(|e| e.id == **id && e.business_id == business_id)
        }) {
            return Err(LedgerError::NotFound(format!("ledger entry {}", missing)));
        }

        let mut changed = 0;
        for entry in tables
            .entries
            .iter_mut()
            .filter(|e| e.business_id == business_id && wanted.contains(&e.id))
        {
            if entry.reconciliation_status != status {
                changed += 1;
            }
            entry.reconciliation_status = status;
            entry.reconciled_by = by;
            entry.reconciled_at = at;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn entry(business: Uuid, voucher: Uuid, account: Uuid, day: u32, side: EntryType) -> LedgerEntry {
        LedgerEntry::new(
            business,
            voucher,
            date(day),
            account,
            side,
            BigDecimal::from(50),
            "INR".to_string(),
            BigDecimal::from(1),
        )
    }

    #[tokio::test]
    async fn duplicate_account_codes_conflict() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        let first = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        let second = Account::new(business, "1000".into(), "Bank".into(), AccountType::Asset, None);

        storage.insert_account(&first).await.unwrap();
        let err = storage.insert_account(&second).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let other_business =
            Account::new(Uuid::new_v4(), "1000".into(), "Cash".into(), AccountType::Asset, None);
        storage.insert_account(&other_business).await.unwrap();
    }

    #[tokio::test]
    async fn entries_are_sequenced_and_ordered_by_date() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        let account = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        storage.insert_account(&account).await.unwrap();

        let voucher = Uuid::new_v4();
        let late = entry(business, voucher, account.id, 20, EntryType::Debit);
        let early = entry(business, voucher, account.id, 10, EntryType::Credit);
        let ids = storage
            .append_entries(vec![late.clone(), early.clone()])
            .await
            .unwrap();
        assert_eq!(ids, vec![late.id, early.id]);

        let range = DateRange::new(date(1), date(31)).unwrap();
        let listed = storage.entries_for_account(account.id, range).await.unwrap();
        assert_eq!(listed[0].id, early.id);
        assert_eq!(listed[1].id, late.id);
        assert!(listed[0].sequence > listed[1].sequence);
    }

    #[tokio::test]
    async fn append_rejects_unknown_accounts_without_writing() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        let account = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        storage.insert_account(&account).await.unwrap();

        let voucher = Uuid::new_v4();
        let good = entry(business, voucher, account.id, 1, EntryType::Debit);
        let bad = entry(business, voucher, Uuid::new_v4(), 1, EntryType::Credit);
        let err = storage.append_entries(vec![good, bad]).await.unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(storage.entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn activity_splits_opening_and_period() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        let account = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        storage.insert_account(&account).await.unwrap();

        let voucher = Uuid::new_v4();
        storage
            .append_entries(vec![
                entry(business, voucher, account.id, 1, EntryType::Debit),
                entry(business, voucher, account.id, 15, EntryType::Credit),
                entry(business, voucher, account.id, 30, EntryType::Debit),
            ])
            .await
            .unwrap();

        let range = DateRange::new(date(10), date(20)).unwrap();
        let activity = storage
            .aggregate_account_activity(business, range)
            .await
            .unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].opening.debit, BigDecimal::from(50));
        assert_eq!(activity[0].period.credit, BigDecimal::from(50));
        assert_eq!(activity[0].period.debit, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn reconciliation_fields_are_the_only_mutation() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        let account = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        storage.insert_account(&account).await.unwrap();
        let original = entry(business, Uuid::new_v4(), account.id, 3, EntryType::Debit);
        let ids = storage.append_entries(vec![original.clone()]).await.unwrap();

        let user = Uuid::new_v4();
        let changed = storage
            .set_reconciliation(business, &ids, ReconciliationStatus::Reconciled, Some(user), None)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let stored = storage.entries_for_voucher(original.voucher_id).await.unwrap();
        assert_eq!(stored[0].reconciliation_status, ReconciliationStatus::Reconciled);
        assert_eq!(stored[0].reconciled_by, Some(user));
        assert_eq!(stored[0].debit_amount, original.debit_amount);

        let err = storage
            .set_reconciliation(
                business,
                &[Uuid::new_v4()],
                ReconciliationStatus::Reconciled,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let err = storage
            .set_reconciliation(Uuid::new_v4(), &ids, ReconciliationStatus::Unreconciled, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
