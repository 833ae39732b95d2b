//! Balance sheet as of a date

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReportEngine;
use crate::config::DateRange;
use crate::traits::*;
use crate::types::*;

/// Balance of one account, signed in its normal direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetLine {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub balance: BigDecimal,
}

/// Balance Sheet structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub business_id: Uuid,
    pub as_of_date: NaiveDate,
    pub assets: Vec<BalanceSheetLine>,
    pub liabilities: Vec<BalanceSheetLine>,
    pub equity: Vec<BalanceSheetLine>,
    /// Income minus expenses of everything up to `as_of_date`
    pub current_earnings: BigDecimal,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    /// Equity accounts plus current earnings
    pub total_equity: BigDecimal,
    pub is_balanced: bool,
}

impl<S: LedgerStorage> ReportEngine<S> {
    /// Balance sheet of a business including every entry up to `as_of_date`
    pub async fn balance_sheet(
        &self,
        business_id: Uuid,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        self.ensure_business(business_id).await?;
        let range = DateRange::new(NaiveDate::MIN, as_of_date)?;
        let activity = self.activity_with_accounts(business_id, range).await?;

        let mut assets = Vec::new();
        let mut liabilities = Vec::new();
        let mut equity = Vec::new();
        let mut current_earnings = BigDecimal::from(0);

        for (account, row) in activity {
            let totals = &row.opening + &row.period;
            let balance = totals.net_for(account.normal_balance());
            let line = BalanceSheetLine {
                account_id: account.id,
                account_code: account.code,
                account_name: account.name,
                balance,
            };
            match account.account_type {
                AccountType::Asset => assets.push(line),
                AccountType::Liability => liabilities.push(line),
                AccountType::Equity => equity.push(line),
                AccountType::Income => current_earnings += line.balance,
                AccountType::Expense => current_earnings -= line.balance,
            }
        }

        let total_assets: BigDecimal = assets.iter().map(|l| &l.balance).sum();
        let total_liabilities: BigDecimal = liabilities.iter().map(|l| &l.balance).sum();
        let equity_accounts: BigDecimal = equity.iter().map(|l| &l.balance).sum();
        let total_equity = equity_accounts + &current_earnings;

        let difference = &total_assets - &(&total_liabilities + &total_equity);
        let is_balanced = self.config.within_tolerance(&difference);

        Ok(BalanceSheet {
            business_id,
            as_of_date,
            assets,
            liabilities,
            equity,
            current_earnings,
            total_assets,
            total_liabilities,
            total_equity,
            is_balanced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::utils::MemoryStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn earnings_roll_into_equity() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        storage.register_business(business).unwrap();
        let cash = Account::new(business, "1000".into(), "Cash".into(), AccountType::Asset, None);
        let capital =
            Account::new(business, "3000".into(), "Capital".into(), AccountType::Equity, None);
        let sales = Account::new(business, "4000".into(), "Sales".into(), AccountType::Income, None);
        for account in [&cash, &capital, &sales] {
            storage.insert_account(account).await.unwrap();
        }

        let day = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let entry = |account: &Account, side, amount: i32, voucher| {
            LedgerEntry::new(
                business,
                voucher,
                day,
                account.id,
                side,
                BigDecimal::from(amount),
                "INR".to_string(),
                BigDecimal::from(1),
            )
        };
        let (invest, sale) = (Uuid::new_v4(), Uuid::new_v4());
        storage
            .append_entries(vec![
                entry(&cash, EntryType::Debit, 5000, invest),
                entry(&capital, EntryType::Credit, 5000, invest),
                entry(&cash, EntryType::Debit, 700, sale),
                entry(&sales, EntryType::Credit, 700, sale),
            ])
            .await
            .unwrap();

        let engine = ReportEngine::new(storage, Arc::new(EngineConfig::default()));
        let sheet = engine.balance_sheet(business, day).await.unwrap();
        assert_eq!(sheet.total_assets, BigDecimal::from(5700));
        assert_eq!(sheet.current_earnings, BigDecimal::from(700));
        assert_eq!(sheet.total_equity, BigDecimal::from(5700));
        assert!(sheet.is_balanced);

        let before = engine
            .balance_sheet(business, day.pred_opt().unwrap())
            .await
            .unwrap();
        assert!(before.assets.is_empty());
        assert!(before.is_balanced);
    }
}
