//! Trial balance over a date range

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReportEngine;
use crate::config::DateRange;
use crate::traits::*;
use crate::types::*;

/// One account's line on the trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub opening_debit: BigDecimal,
    pub opening_credit: BigDecimal,
    pub period_debit: BigDecimal,
    pub period_credit: BigDecimal,
    pub closing_debit: BigDecimal,
    pub closing_credit: BigDecimal,
}

/// Opening, period and closing columns for every account with activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub business_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_opening_debit: BigDecimal,
    pub total_opening_credit: BigDecimal,
    pub total_period_debit: BigDecimal,
    pub total_period_credit: BigDecimal,
    pub total_closing_debit: BigDecimal,
    pub total_closing_credit: BigDecimal,
    /// Closing debit and credit totals agree within tolerance
    pub is_balanced: bool,
    /// `total_closing_debit - total_closing_credit`; non-zero means corrupted books
    pub difference: BigDecimal,
}

impl<S: LedgerStorage> ReportEngine<S> {
    /// Trial balance of a business over an inclusive range
    pub async fn trial_balance(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> LedgerResult<TrialBalance> {
        self.ensure_business(business_id).await?;
        let activity = self.activity_with_accounts(business_id, range).await?;

        let zero = BigDecimal::from(0);
        let mut report = TrialBalance {
            business_id,
            from_date: range.from,
            to_date: range.to,
            rows: Vec::with_capacity(activity.len()),
            total_opening_debit: zero.clone(),
            total_opening_credit: zero.clone(),
            total_period_debit: zero.clone(),
            total_period_credit: zero.clone(),
            total_closing_debit: zero.clone(),
            total_closing_credit: zero.clone(),
            is_balanced: true,
            difference: zero,
        };

        for (account, row) in activity {
            let normal = account.normal_balance();
            let opening_net = row.opening.net_for(normal);
            let closing_net = &opening_net + &row.period.net_for(normal);
            let (opening_debit, opening_credit) =
                SignedBalance::from_net(&opening_net, normal).columns();
            let (closing_debit, closing_credit) =
                SignedBalance::from_net(&closing_net, normal).columns();

            report.total_opening_debit += &opening_debit;
            report.total_opening_credit += &opening_credit;
            report.total_period_debit += &row.period.debit;
            report.total_period_credit += &row.period.credit;
            report.total_closing_debit += &closing_debit;
            report.total_closing_credit += &closing_credit;

            report.rows.push(TrialBalanceRow {
                account_id: account.id,
                account_code: account.code,
                account_name: account.name,
                account_type: account.account_type,
                opening_debit,
                opening_credit,
                period_debit: row.period.debit,
                period_credit: row.period.credit,
                closing_debit,
                closing_credit,
            });
        }

        report.difference = &report.total_closing_debit - &report.total_closing_credit;
        report.is_balanced = self.config.within_tolerance(&report.difference);
        if !report.is_balanced {
            tracing::warn!(
                business_id = %business_id,
                difference = %report.difference,
                "trial balance does not balance"
            );
        }
        tracing::debug!(
            business_id = %business_id,
            accounts = report.rows.len(),
            "trial balance generated"
        );

        Ok(report)
    }
}
