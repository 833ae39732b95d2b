//! Financial reports derived from posted ledger entries
//!
//! Reports read only from the ledger through the storage aggregate queries;
//! draft vouchers never contribute. Amounts are in the base currency.

pub mod balance_sheet;
pub mod profit_loss;
pub mod trial_balance;

pub use balance_sheet::*;
pub use profit_loss::*;
pub use trial_balance::*;

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DateRange, EngineConfig};
use crate::traits::*;
use crate::types::*;

/// Generates trial balance, profit and loss and balance sheet reports
pub struct ReportEngine<S: LedgerStorage> {
    storage: S,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage> ReportEngine<S> {
    /// Create a new report engine
    pub fn new(storage: S, config: Arc<EngineConfig>) -> Self {
        Self { storage, config }
    }

    async fn ensure_business(&self, business_id: Uuid) -> LedgerResult<()> {
        if self.storage.business_exists(business_id).await? {
            Ok(())
        } else {
            Err(LedgerError::business_not_found(business_id))
        }
    }

    /// Activity rows joined with their accounts, ordered by account code
    async fn activity_with_accounts(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<Vec<(Account, AccountActivity)>> {
        let mut accounts: HashMap<Uuid, Account> = self
            .storage
            .list_accounts(business_id, None)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let activity = self
            .storage
            .aggregate_account_activity(business_id, range)
            .await?;

        let mut rows = Vec::with_capacity(activity.len());
        for row in activity {
            let account = accounts.remove(&row.account_id).ok_or_else(|| {
                LedgerError::Storage(format!(
                    "ledger entries reference unknown account {}",
                    row.account_id
                ))
            })?;
            rows.push((account, row));
        }
        rows.sort_by(|(a, _), (b, _)| a.code.cmp(&b.code));
        Ok(rows)
    }
}
