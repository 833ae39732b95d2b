//! Engine configuration and reporting date ranges

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Settings handed to the engine at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest |debits - credits| accepted as balanced
    pub balance_tolerance: BigDecimal,
    /// Month the fiscal year starts in (1-12)
    pub fiscal_year_start_month: u32,
    /// Day of month the fiscal year starts on
    pub fiscal_year_start_day: u32,
    /// Longest parent chain walked when checking the account hierarchy
    pub max_account_depth: usize,
    /// Prefix for generated voucher numbers
    pub voucher_number_prefix: String,
    /// Currency used when a voucher does not name one
    pub base_currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: BigDecimal::from(1) / BigDecimal::from(100),
            fiscal_year_start_month: 4,
            fiscal_year_start_day: 1,
            max_account_depth: 50,
            voucher_number_prefix: "VCH".to_string(),
            base_currency: "INR".to_string(),
        }
    }
}

const CONFIG_FILE: &str = "config/ledger.toml";

impl EngineConfig {
    /// Load the `[engine]` table from `config/ledger.toml` and `LEDGER__ENGINE__*`
    /// environment variables, using defaults for anything missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Same as [`EngineConfig::load`] with an explicit file path
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        let engine = match settings.get::<EngineConfig>("engine") {
            Ok(engine) => engine,
            Err(ConfigError::NotFound(_)) => EngineConfig::default(),
            Err(err) => return Err(err),
        };

        engine
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(engine)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> LedgerResult<()> {
        if self.balance_tolerance < BigDecimal::from(0) {
            return Err(LedgerError::Config(
                "balance_tolerance cannot be negative".to_string(),
            ));
        }
        if self.max_account_depth == 0 {
            return Err(LedgerError::Config(
                "max_account_depth must be at least 1".to_string(),
            ));
        }
        if self.voucher_number_prefix.trim().is_empty() {
            return Err(LedgerError::Config(
                "voucher_number_prefix cannot be empty".to_string(),
            ));
        }
        // 2000 is a leap year, so Feb 29 is accepted here and clamped later.
        if NaiveDate::from_ymd_opt(2000, self.fiscal_year_start_month, self.fiscal_year_start_day)
            .is_none()
        {
            return Err(LedgerError::Config(format!(
                "invalid fiscal year start {}-{}",
                self.fiscal_year_start_month, self.fiscal_year_start_day
            )));
        }
        Ok(())
    }

    /// Whether a debit/credit difference is small enough to count as balanced
    pub fn within_tolerance(&self, difference: &BigDecimal) -> bool {
        difference.abs() <= self.balance_tolerance
    }

    /// First day of the fiscal year containing `date`
    pub fn fiscal_year_start(&self, date: NaiveDate) -> NaiveDate {
        let start_in = |year: i32| {
            NaiveDate::from_ymd_opt(year, self.fiscal_year_start_month, self.fiscal_year_start_day)
                .or_else(|| NaiveDate::from_ymd_opt(year, self.fiscal_year_start_month, 28))
                .unwrap_or(date)
        };
        let this_year = start_in(date.year());
        if date >= this_year {
            this_year
        } else {
            start_in(date.year() - 1)
        }
    }

    /// Default reporting range: fiscal year start through `today`
    pub fn default_range(&self, today: NaiveDate) -> DateRange {
        DateRange {
            from: self.fiscal_year_start(today),
            to: today,
        }
    }
}

/// Inclusive reporting range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> LedgerResult<Self> {
        if from > to {
            return Err(LedgerError::InvalidArgument(format!(
                "from date {} is after to date {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Fill missing bounds from the fiscal-year default
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        config: &EngineConfig,
        today: NaiveDate,
    ) -> LedgerResult<Self> {
        let to = to.unwrap_or(today);
        let from = from.unwrap_or_else(|| config.fiscal_year_start(to));
        Self::new(from, to)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}
