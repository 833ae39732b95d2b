//! Main ledger orchestrator that coordinates accounts, vouchers, posting and reports

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DateRange, EngineConfig};
use crate::ledger::account::utils::OPENING_BALANCE_EQUITY_CODE;
use crate::ledger::{
    AccountManager, LedgerStatement, OpeningBalance, PostingEngine, PostingReceipt, PostingResult,
    StatementManager, VoucherManager,
};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::reports::{BalanceSheet, ProfitAndLoss, ReportEngine, TrialBalance};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    account_manager: AccountManager<S>,
    voucher_manager: VoucherManager<S>,
    posting_engine: PostingEngine<S>,
    statements: StatementManager<S>,
    reports: ReportEngine<S>,
    reconciliation: ReconciliationEngine<S>,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    /// Create a new ledger with explicit configuration
    pub fn with_config(storage: S, config: EngineConfig) -> Self {
        Self::with_validators(
            storage,
            config,
            Box::new(DefaultAccountValidator),
            Box::new(DefaultVoucherValidator),
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: EngineConfig,
        account_validator: Box<dyn AccountValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            account_manager: AccountManager::with_validator(
                storage.clone(),
                config.clone(),
                account_validator,
            ),
            voucher_manager: VoucherManager::with_validator(
                storage.clone(),
                config.clone(),
                voucher_validator,
            ),
            posting_engine: PostingEngine::new(storage.clone(), config.clone()),
            statements: StatementManager::new(storage.clone()),
            reports: ReportEngine::new(storage.clone(), config.clone()),
            reconciliation: ReconciliationEngine::new(storage, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<DateRange> {
        DateRange::resolve(from, to, &self.config, chrono::Utc::now().date_naive())
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &self,
        business_id: Uuid,
        account: NewAccount,
    ) -> LedgerResult<Account> {
        self.account_manager.create_account(business_id, account).await
    }

    /// Get an account of a business by ID
    pub async fn get_account(
        &self,
        business_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(business_id, account_id).await
    }

    /// Find an account by its business-unique code
    pub async fn find_account_by_code(
        &self,
        business_id: Uuid,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        self.account_manager.find_by_code(business_id, code).await
    }

    /// List all accounts of a business
    pub async fn list_accounts(&self, business_id: Uuid) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts(business_id).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .list_accounts_by_type(business_id, account_type)
            .await
    }

    /// Update an account's name, description or active flag
    pub async fn update_account(
        &self,
        business_id: Uuid,
        account_id: Uuid,
        update: AccountUpdate,
    ) -> LedgerResult<Account> {
        self.account_manager
            .update_account(business_id, account_id, update)
            .await
    }

    /// Delete an account
    pub async fn delete_account(&self, business_id: Uuid, account_id: Uuid) -> LedgerResult<()> {
        self.account_manager
            .delete_account(business_id, account_id)
            .await
    }

    pub async fn child_accounts(
        &self,
        business_id: Uuid,
        parent_id: Uuid,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .child_accounts(business_id, parent_id)
            .await
    }

    pub async fn account_path(
        &self,
        business_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .account_path(business_id, account_id)
            .await
    }

    /// Setup a standard chart of accounts for small business
    pub async fn setup_standard_chart_of_accounts(
        &self,
        business_id: Uuid,
    ) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_standard_chart(&self.account_manager, business_id)
            .await
    }

    // Voucher operations
    /// Create a draft voucher
    pub async fn create_voucher(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        draft: VoucherDraft,
    ) -> LedgerResult<Voucher> {
        self.voucher_manager
            .create_draft(business_id, user_id, draft)
            .await
    }

    /// Replace header and lines of a draft voucher
    pub async fn update_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        draft: VoucherDraft,
    ) -> LedgerResult<Voucher> {
        self.voucher_manager
            .update_draft(business_id, voucher_id, draft)
            .await
    }

    /// Delete a draft voucher
    pub async fn delete_voucher(&self, business_id: Uuid, voucher_id: Uuid) -> LedgerResult<()> {
        self.voucher_manager
            .delete_draft(business_id, voucher_id)
            .await
    }

    /// Cancel a draft voucher
    pub async fn cancel_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        user_id: Uuid,
    ) -> LedgerResult<Voucher> {
        self.voucher_manager
            .cancel_draft(business_id, voucher_id, user_id)
            .await
    }

    /// Get a voucher of a business by ID
    pub async fn get_voucher(&self, business_id: Uuid, voucher_id: Uuid) -> LedgerResult<Voucher> {
        self.voucher_manager
            .get_voucher_required(business_id, voucher_id)
            .await
    }

    pub async fn list_vouchers(
        &self,
        business_id: Uuid,
        filter: &VoucherFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        self.voucher_manager.list_vouchers(business_id, filter).await
    }

    // Posting operations
    /// Post a draft voucher into the ledger
    pub async fn post_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        user_id: Uuid,
    ) -> LedgerResult<PostingReceipt> {
        self.posting_engine
            .post_voucher(business_id, voucher_id, user_id)
            .await
    }

    /// Post a draft voucher, reporting failure as a structured result
    pub async fn post_voucher_result(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        user_id: Uuid,
    ) -> PostingResult {
        self.post_voucher(business_id, voucher_id, user_id)
            .await
            .into()
    }

    /// Whether a voucher of the business has produced ledger entries
    pub async fn has_ledger_entries(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<bool> {
        self.posting_engine
            .has_ledger_entries(business_id, voucher_id)
            .await
    }

    /// Record opening balances as a posted `Opening` voucher balanced against
    /// the Opening Balance Equity account. A failed call leaves no voucher behind.
    pub async fn post_opening_balances(
        &self,
        business_id: Uuid,
        date: NaiveDate,
        balances: &[OpeningBalance],
        user_id: Uuid,
    ) -> LedgerResult<PostingReceipt> {
        let equity = self
            .account_manager
            .find_by_code(business_id, OPENING_BALANCE_EQUITY_CODE)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "Opening balance equity account '{}' for business {}",
                    OPENING_BALANCE_EQUITY_CODE, business_id
                ))
            })?;

        let lines = crate::ledger::posting::opening_balance_lines(balances, equity.id)?;
        // Checked before the draft exists so a bad account costs no voucher number
        self.posting_engine
            .check_accounts(business_id, lines.iter().map(|line| line.account_id))
            .await?;

        let mut header = VoucherHeader::new("Opening", date);
        header.narration = Some("Opening balances".to_string());
        let voucher = self
            .voucher_manager
            .create_draft(business_id, user_id, VoucherDraft { header, lines })
            .await?;

        match self
            .posting_engine
            .post_opening_voucher(business_id, voucher.id, user_id)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                let cleanup = self.voucher_manager.delete_draft(business_id, voucher.id).await;
                if let Err(cleanup) = cleanup {
                    tracing::warn!(
                        voucher_id = %voucher.id,
                        error = %cleanup,
                        "opening balance draft left behind"
                    );
                }
                Err(err)
            }
        }
    }

    // Ledger store operations
    /// Statement of an account; missing dates default to the current fiscal year
    pub async fn get_ledger_statement(
        &self,
        business_id: Uuid,
        account_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<LedgerStatement> {
        let range = self.resolve_range(from, to)?;
        self.statements
            .get_statement(business_id, account_id, range)
            .await
    }

    /// Entries created from a voucher
    pub async fn entries_for_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        self.statements
            .entries_for_voucher(business_id, voucher_id)
            .await
    }

    pub async fn mark_reconciled(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
        user_id: Uuid,
    ) -> LedgerResult<usize> {
        self.reconciliation
            .mark_reconciled(business_id, entry_ids, user_id)
            .await
    }

    pub async fn mark_unreconciled(
        &self,
        business_id: Uuid,
        entry_ids: &[Uuid],
    ) -> LedgerResult<usize> {
        self.reconciliation
            .mark_unreconciled(business_id, entry_ids)
            .await
    }

    // Reporting operations
    /// Trial balance; missing dates default to the current fiscal year
    pub async fn get_trial_balance(
        &self,
        business_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<TrialBalance> {
        let range = self.resolve_range(from, to)?;
        self.reports.trial_balance(business_id, range).await
    }

    /// Profit and loss; missing dates default to the current fiscal year
    pub async fn get_profit_and_loss(
        &self,
        business_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<ProfitAndLoss> {
        let range = self.resolve_range(from, to)?;
        self.reports.profit_and_loss(business_id, range).await
    }

    /// Balance sheet as of a date
    pub async fn get_balance_sheet(
        &self,
        business_id: Uuid,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        self.reports.balance_sheet(business_id, as_of_date).await
    }

    /// Per-voucher balance audit; missing dates default to the current fiscal year
    pub async fn get_reconciliation_check(
        &self,
        business_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<ReconciliationReport> {
        let range = self.resolve_range(from, to)?;
        self.reconciliation
            .reconciliation_check(business_id, range)
            .await
    }
}
