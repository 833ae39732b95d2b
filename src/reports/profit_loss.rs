//! Profit and loss statement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReportEngine;
use crate::config::DateRange;
use crate::traits::*;
use crate::types::*;

/// Net period activity of one income or expense account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossLine {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    /// Signed in the account's normal direction
    pub amount: BigDecimal,
}

/// Income and expenses over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub business_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub income_accounts: Vec<ProfitAndLossLine>,
    pub expense_accounts: Vec<ProfitAndLossLine>,
    pub total_income: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_profit: BigDecimal,
    pub is_profitable: bool,
}

impl<S: LedgerStorage> ReportEngine<S> {
    /// Profit and loss of a business over an inclusive range
    pub async fn profit_and_loss(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<ProfitAndLoss> {
        self.ensure_business(business_id).await?;
        let activity = self.activity_with_accounts(business_id, range).await?;

        let mut income_accounts = Vec::new();
        let mut expense_accounts = Vec::new();
        for (account, row) in activity {
            if !account.account_type.is_profit_and_loss() || row.period.is_zero() {
                continue;
            }
            let line = ProfitAndLossLine {
                amount: row.period.net_for(account.normal_balance()),
                account_id: account.id,
                account_code: account.code,
                account_name: account.name,
            };
            match account.account_type {
                AccountType::Income => income_accounts.push(line),
                _ => expense_accounts.push(line),
            }
        }

        let total_income: BigDecimal = income_accounts.iter().map(|l| &l.amount).sum();
        let total_expenses: BigDecimal = expense_accounts.iter().map(|l| &l.amount).sum();
        let net_profit = &total_income - &total_expenses;
        let is_profitable = net_profit > BigDecimal::from(0);

        tracing::debug!(
            business_id = %business_id,
            net_profit = %net_profit,
            "profit and loss generated"
        );

        Ok(ProfitAndLoss {
            business_id,
            from_date: range.from,
            to_date: range.to,
            income_accounts,
            expense_accounts,
            total_income,
            total_expenses,
            net_profit,
            is_profitable,
        })
    }
}
