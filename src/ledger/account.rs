//! Chart of accounts management

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn AccountValidator>,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S, config: Arc<EngineConfig>) -> Self {
        Self::with_validator(storage, config, Box::new(DefaultAccountValidator))
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(
        storage: S,
        config: Arc<EngineConfig>,
        validator: Box<dyn AccountValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            config,
        }
    }

    /// Create a new account
    pub async fn create_account(
        &self,
        business_id: Uuid,
        input: NewAccount,
    ) -> LedgerResult<Account> {
        if !self.storage.business_exists(business_id).await? {
            return Err(LedgerError::business_not_found(business_id));
        }

        let mut account = Account::new(
            business_id,
            input.code.trim().to_string(),
            input.name.trim().to_string(),
            input.account_type,
            input.parent_id,
        );
        account.description = input.description;
        account.is_system_account = input.is_system_account;

        self.validator.validate_account(&account)?;

        if self
            .storage
            .find_account_by_code(business_id, &account.code)
            .await?
            .is_some()
        {
            return Err(LedgerError::Conflict(format!(
                "Account with code '{}' already exists",
                account.code
            )));
        }

        if let Some(parent_id) = account.parent_id {
            self.check_parent(&account, parent_id).await?;
        }

        self.storage.insert_account(&account).await?;
        tracing::debug!(
            business_id = %business_id,
            account_id = %account.id,
            code = %account.code,
            "account created"
        );

        Ok(account)
    }

    /// Parent must exist in the same business and its chain to the root must
    /// be finite and within the depth bound
    async fn check_parent(&self, account: &Account, parent_id: Uuid) -> LedgerResult<()> {
        let parent = self.storage.get_account(parent_id).await?.ok_or_else(|| {
            LedgerError::InvalidArgument(format!("Parent account '{}' does not exist", parent_id))
        })?;

        if parent.business_id != account.business_id {
            return Err(LedgerError::InvalidArgument(format!(
                "Parent account '{}' belongs to another business",
                parent.code
            )));
        }

        // New accounts cannot close a loop, but a chain written by another
        // client of the store can already contain one.
        let mut visited = HashSet::new();
        let mut current = Some(parent);
        let mut depth = 0;
        while let Some(node) = current {
            if !visited.insert(node.id) {
                return Err(LedgerError::InvalidState(format!(
                    "Account hierarchy above '{}' contains a cycle at '{}'",
                    parent_id, node.code
                )));
            }
            depth += 1;
            if depth >= self.config.max_account_depth {
                return Err(LedgerError::InvalidArgument(format!(
                    "Account hierarchy deeper than {} levels",
                    self.config.max_account_depth
                )));
            }
            current = match node.parent_id {
                Some(id) => self.storage.get_account(id).await?,
                None => None,
            };
        }

        Ok(())
    }

    /// Get an account by ID; accounts of other businesses are not visible
    pub async fn get_account(
        &self,
        business_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Option<Account>> {
        Ok(self
            .storage
            .get_account(account_id)
            .await?
            .filter(|account| account.business_id == business_id))
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(
        &self,
        business_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Account> {
        self.get_account(business_id, account_id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }

    /// Find an account by its code
    pub async fn find_by_code(&self, business_id: Uuid, code: &str) -> LedgerResult<Option<Account>> {
        self.storage.find_account_by_code(business_id, code).await
    }

    /// List all accounts of a business
    pub async fn list_accounts(&self, business_id: Uuid) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(business_id, None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.storage
            .list_accounts(business_id, Some(account_type))
            .await
    }

    /// Update name, description or active flag
    pub async fn update_account(
        &self,
        business_id: Uuid,
        account_id: Uuid,
        update: AccountUpdate,
    ) -> LedgerResult<Account> {
        let mut account = self.get_account_required(business_id, account_id).await?;
        if account.is_system_account {
            return Err(LedgerError::Conflict(format!(
                "System account '{}' cannot be edited",
                account.code
            )));
        }

        if let Some(name) = update.name {
            account.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            account.description = Some(description);
        }
        if let Some(is_active) = update.is_active {
            account.is_active = is_active;
        }
        account.updated_at = chrono::Utc::now().naive_utc();

        self.validator.validate_account(&account)?;
        self.storage.update_account(&account).await?;
        Ok(account)
    }

    /// Delete an account that has never been posted to
    pub async fn delete_account(&self, business_id: Uuid, account_id: Uuid) -> LedgerResult<()> {
        let account = self.get_account_required(business_id, account_id).await?;
        if account.is_system_account {
            return Err(LedgerError::Conflict(format!(
                "System account '{}' cannot be deleted",
                account.code
            )));
        }
        if self.storage.account_has_entries(account_id).await? {
            return Err(LedgerError::Conflict(format!(
                "Account '{}' has ledger entries",
                account.code
            )));
        }
        let children = self.child_accounts(business_id, account_id).await?;
        if let Some(child) = children.first() {
            return Err(LedgerError::Conflict(format!(
                "Account '{}' is the parent of '{}'",
                account.code, child.code
            )));
        }

        self.storage.delete_account(account_id).await
    }

    /// Direct children of an account
    pub async fn child_accounts(
        &self,
        business_id: Uuid,
        parent_id: Uuid,
    ) -> LedgerResult<Vec<Account>> {
        self.get_account_required(business_id, parent_id).await?;
        let all_accounts = self.list_accounts(business_id).await?;
        Ok(all_accounts
            .into_iter()
            .filter(|account| account.parent_id == Some(parent_id))
            .collect())
    }

    /// Accounts from the root down to `account_id`
    pub async fn account_path(
        &self,
        business_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Vec<Account>> {
        let mut path: Vec<Account> = Vec::new();
        let mut current_account_id = Some(account_id);

        while let Some(id) = current_account_id {
            if path.iter().any(|account| account.id == id) {
                return Err(LedgerError::InvalidState(format!(
                    "Account hierarchy above '{}' contains a cycle",
                    account_id
                )));
            }
            if path.len() >= self.config.max_account_depth {
                return Err(LedgerError::InvalidState(format!(
                    "Account hierarchy above '{}' exceeds {} levels",
                    account_id, self.config.max_account_depth
                )));
            }
            let account = self.get_account_required(business_id, id).await?;
            current_account_id = account.parent_id;
            path.insert(0, account);
        }

        Ok(path)
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Key, code, name and type of every standard system account
    pub const STANDARD_CHART: &[(&str, &str, &str, AccountType)] = &[
        ("cash", "1000", "Cash", AccountType::Asset),
        ("bank", "1100", "Bank", AccountType::Asset),
        ("accounts_receivable", "1200", "Accounts Receivable", AccountType::Asset),
        ("inventory", "1300", "Inventory", AccountType::Asset),
        ("gst_input", "1400", "GST Input Credit", AccountType::Asset),
        ("accounts_payable", "2000", "Accounts Payable", AccountType::Liability),
        ("gst_output", "2100", "GST Output Payable", AccountType::Liability),
        ("loans_payable", "2200", "Loans Payable", AccountType::Liability),
        ("owners_capital", "3000", "Owner's Capital", AccountType::Equity),
        ("retained_earnings", "3200", "Retained Earnings", AccountType::Equity),
        ("opening_balance_equity", "3900", "Opening Balance Equity", AccountType::Equity),
        ("sales_revenue", "4000", "Sales Revenue", AccountType::Income),
        ("service_revenue", "4100", "Service Revenue", AccountType::Income),
        ("cost_of_goods_sold", "5000", "Cost of Goods Sold", AccountType::Expense),
        ("rent_expense", "6000", "Rent Expense", AccountType::Expense),
        ("utilities_expense", "6100", "Utilities Expense", AccountType::Expense),
        ("round_off", "6900", "Round Off", AccountType::Expense),
    ];

    /// Code of the account that absorbs opening balance differences
    pub const OPENING_BALANCE_EQUITY_CODE: &str = "3900";

    /// Create the standard chart of system accounts for a business
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &AccountManager<S>,
        business_id: Uuid,
    ) -> LedgerResult<HashMap<String, Account>> {
        let mut accounts = HashMap::new();

        for (key, code, name, account_type) in STANDARD_CHART {
            let input = NewAccount {
                is_system_account: true,
                ..NewAccount::new(*code, *name, *account_type)
            };
            let account = account_manager.create_account(business_id, input).await?;
            accounts.insert(key.to_string(), account);
        }

        tracing::info!(
            business_id = %business_id,
            accounts = accounts.len(),
            "standard chart of accounts created"
        );
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    async fn manager() -> (AccountManager<MemoryStorage>, Uuid) {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        storage.register_business(business).unwrap();
        (
            AccountManager::new(storage, Arc::new(EngineConfig::default())),
            business,
        )
    }

    #[tokio::test]
    async fn create_requires_unique_code() {
        let (manager, business) = manager().await;
        manager
            .create_account(business, NewAccount::new("1000", "Cash", AccountType::Asset))
            .await
            .unwrap();

        let err = manager
            .create_account(business, NewAccount::new("1000", "Petty Cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let err = manager
            .create_account(business, NewAccount::new("  ", "Blank", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_rejects_unknown_business() {
        let (manager, _) = manager().await;
        let err = manager
            .create_account(Uuid::new_v4(), NewAccount::new("1000", "Cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn parent_must_share_business() {
        let (manager, business) = manager().await;
        let other = Uuid::new_v4();
        manager.storage.register_business(other).unwrap();
        let foreign = manager
            .create_account(other, NewAccount::new("1000", "Assets", AccountType::Asset))
            .await
            .unwrap();

        let err = manager
            .create_account(
                business,
                NewAccount::new("1010", "Cash", AccountType::Asset).with_parent(foreign.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let err = manager
            .create_account(
                business,
                NewAccount::new("1010", "Cash", AccountType::Asset).with_parent(Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn hierarchy_depth_is_bounded() {
        let storage = MemoryStorage::new();
        let business = Uuid::new_v4();
        storage.register_business(business).unwrap();
        let config = EngineConfig {
            max_account_depth: 2,
            ..EngineConfig::default()
        };
        let manager = AccountManager::new(storage, Arc::new(config));

        let root = manager
            .create_account(business, NewAccount::new("1", "Root", AccountType::Asset))
            .await
            .unwrap();
        let mid = manager
            .create_account(
                business,
                NewAccount::new("2", "Mid", AccountType::Asset).with_parent(root.id),
            )
            .await
            .unwrap();
        let err = manager
            .create_account(
                business,
                NewAccount::new("3", "Leaf", AccountType::Asset).with_parent(mid.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let path = manager.account_path(business, mid.id).await.unwrap();
        assert_eq!(
            path.iter().map(|a| a.code.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(manager.child_accounts(business, root.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_touches_only_mutable_fields() {
        let (manager, business) = manager().await;
        let account = manager
            .create_account(business, NewAccount::new("6000", "Rent", AccountType::Expense))
            .await
            .unwrap();

        let updated = manager
            .update_account(
                business,
                account.id,
                AccountUpdate {
                    name: Some("Office Rent".to_string()),
                    is_active: Some(false),
                    ..AccountUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Office Rent");
        assert!(!updated.is_active);
        assert_eq!(updated.code, "6000");
        assert_eq!(updated.account_type, AccountType::Expense);
    }

    #[tokio::test]
    async fn system_accounts_are_locked() {
        let (manager, business) = manager().await;
        let chart = utils::create_standard_chart(&manager, business).await.unwrap();
        let cash = &chart["cash"];

        let err = manager
            .update_account(business, cash.id, AccountUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let err = manager.delete_account(business, cash.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_refuses_parents() {
        let (manager, business) = manager().await;
        let parent = manager
            .create_account(business, NewAccount::new("1", "Parent", AccountType::Asset))
            .await
            .unwrap();
        let child = manager
            .create_account(
                business,
                NewAccount::new("2", "Child", AccountType::Asset).with_parent(parent.id),
            )
            .await
            .unwrap();

        let err = manager.delete_account(business, parent.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        manager.delete_account(business, child.id).await.unwrap();
        manager.delete_account(business, parent.id).await.unwrap();
        assert!(manager.get_account(business, parent.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn accounts_are_invisible_to_other_businesses() {
        let (manager, business) = manager().await;
        let other = Uuid::new_v4();
        manager.storage.register_business(other).unwrap();
        let rent = manager
            .create_account(business, NewAccount::new("6000", "Rent", AccountType::Expense))
            .await
            .unwrap();

        assert!(manager.get_account(other, rent.id).await.unwrap().is_none());
        let err = manager
            .update_account(
                other,
                rent.id,
                AccountUpdate {
                    is_active: Some(false),
                    ..AccountUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        let err = manager.delete_account(other, rent.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        let err = manager.account_path(other, rent.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let stored = manager.get_account_required(business, rent.id).await.unwrap();
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn looping_parent_chain_in_store_is_detected() {
        let (manager, business) = manager().await;
        let top = manager
            .create_account(business, NewAccount::new("1", "Top", AccountType::Asset))
            .await
            .unwrap();
        let below = manager
            .create_account(
                business,
                NewAccount::new("2", "Below", AccountType::Asset).with_parent(top.id),
            )
            .await
            .unwrap();

        // Written around the manager, as a bad import might
        let looped = Account {
            parent_id: Some(below.id),
            ..top.clone()
        };
        manager.storage.update_account(&looped).await.unwrap();

        let err = manager
            .create_account(
                business,
                NewAccount::new("3", "Leaf", AccountType::Asset).with_parent(below.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        let err = manager.account_path(business, below.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert!(manager.find_by_code(business, "3").await.unwrap().is_none());
    }
}
