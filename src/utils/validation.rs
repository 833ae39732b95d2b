//! Validation utilities

use crate::traits::*;
use crate::types::*;

/// Longest accepted account code
pub const MAX_ACCOUNT_CODE_LEN: usize = 50;
/// Longest accepted account name
pub const MAX_ACCOUNT_NAME_LEN: usize = 100;
/// Longest accepted voucher or line narration
pub const MAX_NARRATION_LEN: usize = 500;

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > MAX_ACCOUNT_CODE_LEN {
        return Err(LedgerError::InvalidArgument(format!(
            "Account code cannot exceed {} characters",
            MAX_ACCOUNT_CODE_LEN
        )));
    }

    // Alphanumeric, dashes, dots and underscores
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(LedgerError::InvalidArgument(
            "Account code can only contain alphanumeric characters, dashes, dots and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
        return Err(LedgerError::InvalidArgument(format!(
            "Account name cannot exceed {} characters",
            MAX_ACCOUNT_NAME_LEN
        )));
    }

    Ok(())
}

/// Validate an optional narration
pub fn validate_narration(narration: Option<&str>) -> LedgerResult<()> {
    match narration {
        Some(text) if text.chars().count() > MAX_NARRATION_LEN => {
            Err(LedgerError::InvalidArgument(format!(
                "Narration cannot exceed {} characters",
                MAX_NARRATION_LEN
            )))
        }
        _ => Ok(()),
    }
}

/// Enhanced voucher validator with detailed checks
pub struct EnhancedVoucherValidator;

impl VoucherValidator for EnhancedVoucherValidator {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()> {
        // Basic validation
        DefaultVoucherValidator.validate_draft(draft)?;

        validate_narration(draft.header.narration.as_deref())?;
        for line in &draft.lines {
            validate_narration(line.narration.as_deref())?;
        }

        // Same account cannot appear twice on the same side
        if let Some(account_id) = duplicate_line_accounts(draft) {
            return Err(LedgerError::InvalidArgument(format!(
                "Account {} appears multiple times on the same side of the voucher",
                account_id
            )));
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;
        validate_narration(account.description.as_deref())
    }
}
