//! Draft voucher management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::traits::*;
use crate::types::*;

/// Voucher manager for creating and editing drafts
pub struct VoucherManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn VoucherValidator>,
    config: Arc<EngineConfig>,
}

impl<S: LedgerStorage> VoucherManager<S> {
    /// Create a new voucher manager
    pub fn new(storage: S, config: Arc<EngineConfig>) -> Self {
        Self::with_validator(storage, config, Box::new(DefaultVoucherValidator))
    }

    /// Create a new voucher manager with custom validator
    pub fn with_validator(
        storage: S,
        config: Arc<EngineConfig>,
        validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            config,
        }
    }

    /// Create a new draft voucher with a freshly assigned number
    pub async fn create_draft(
        &self,
        business_id: Uuid,
        created_by: Uuid,
        draft: VoucherDraft,
    ) -> LedgerResult<Voucher> {
        if !self.storage.business_exists(business_id).await? {
            return Err(LedgerError::business_not_found(business_id));
        }
        self.validator.validate_draft(&draft)?;

        let sequence = self.storage.next_voucher_sequence(business_id).await?;
        let now = chrono::Utc::now().naive_utc();
        let mut voucher = Voucher {
            id: Uuid::new_v4(),
            business_id,
            voucher_number: format!("{}-{:06}", self.config.voucher_number_prefix, sequence),
            voucher_type: String::new(),
            date: draft.header.date,
            party_name: None,
            reference: None,
            narration: None,
            total_amount: BigDecimal::from(0),
            tax_amount: BigDecimal::from(0),
            discount_amount: BigDecimal::from(0),
            round_off_amount: BigDecimal::from(0),
            net_amount: BigDecimal::from(0),
            currency: self.config.base_currency.clone(),
            exchange_rate: BigDecimal::from(1),
            status: VoucherStatus::Draft,
            posted_at: None,
            posted_by: None,
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
            lines: Vec::new(),
        };
        self.apply_draft(&mut voucher, draft);

        self.storage.insert_voucher(&voucher).await?;
        tracing::debug!(
            business_id = %business_id,
            voucher_id = %voucher.id,
            voucher_number = %voucher.voucher_number,
            lines = voucher.lines.len(),
            "draft voucher created"
        );
        Ok(voucher)
    }

    /// Replace header and lines of a draft
    pub async fn update_draft(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        draft: VoucherDraft,
    ) -> LedgerResult<Voucher> {
        let mut voucher = self.get_voucher_required(business_id, voucher_id).await?;
        ensure_draft(&voucher, "edited")?;
        self.validator.validate_draft(&draft)?;

        let expected_version = voucher.version;
        self.apply_draft(&mut voucher, draft);
        voucher.version += 1;
        voucher.updated_at = chrono::Utc::now().naive_utc();

        self.storage
            .update_voucher(&voucher, expected_version)
            .await?;
        Ok(voucher)
    }

    /// Delete a draft; posted and cancelled vouchers are kept forever
    pub async fn delete_draft(&self, business_id: Uuid, voucher_id: Uuid) -> LedgerResult<()> {
        let voucher = self.get_voucher_required(business_id, voucher_id).await?;
        ensure_draft(&voucher, "deleted")?;
        self.storage
            .delete_voucher(voucher_id, voucher.version)
            .await
    }

    /// Move a draft to the terminal cancelled state
    pub async fn cancel_draft(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
        cancelled_by: Uuid,
    ) -> LedgerResult<Voucher> {
        let mut voucher = self.get_voucher_required(business_id, voucher_id).await?;
        ensure_draft(&voucher, "cancelled")?;

        let expected_version = voucher.version;
        voucher.status = VoucherStatus::Cancelled;
        voucher.version += 1;
        voucher.updated_at = chrono::Utc::now().naive_utc();

        self.storage
            .update_voucher(&voucher, expected_version)
            .await?;
        tracing::info!(
            voucher_id = %voucher_id,
            cancelled_by = %cancelled_by,
            "voucher cancelled"
        );
        Ok(voucher)
    }

    /// Get a voucher by ID; vouchers of other businesses are not visible
    pub async fn get_voucher(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<Option<Voucher>> {
        Ok(self
            .storage
            .get_voucher(voucher_id)
            .await?
            .filter(|voucher| voucher.business_id == business_id))
    }

    /// Get a voucher by ID, returning an error if not found
    pub async fn get_voucher_required(
        &self,
        business_id: Uuid,
        voucher_id: Uuid,
    ) -> LedgerResult<Voucher> {
        self.get_voucher(business_id, voucher_id)
            .await?
            .ok_or_else(|| LedgerError::voucher_not_found(voucher_id))
    }

    /// List vouchers of a business
    pub async fn list_vouchers(
        &self,
        business_id: Uuid,
        filter: &VoucherFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        if let (Some(from), Some(to)) = (filter.from_date, filter.to_date) {
            if from > to {
                return Err(LedgerError::InvalidArgument(format!(
                    "from date {} is after to date {}",
                    from, to
                )));
            }
        }
        self.storage.list_vouchers(business_id, filter).await
    }

    /// Copy header fields and lines onto the voucher and recompute totals.
    /// Client-side totals are never read.
    fn apply_draft(&self, voucher: &mut Voucher, draft: VoucherDraft) {
        let VoucherDraft { header, lines } = draft;
        voucher.voucher_type = header.voucher_type.trim().to_string();
        voucher.date = header.date;
        voucher.party_name = header.party_name;
        voucher.reference = header.reference;
        voucher.narration = header.narration;
        voucher.currency = header
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.config.base_currency.clone());
        voucher.exchange_rate = header.exchange_rate.unwrap_or_else(|| BigDecimal::from(1));
        voucher.round_off_amount = header.round_off_amount.unwrap_or_else(|| BigDecimal::from(0));

        let voucher_id = voucher.id;
        voucher.lines = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| VoucherLine {
                id: Uuid::new_v4(),
                voucher_id,
                line_number: index as u32 + 1,
                account_id: line.account_id,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                narration: line.narration,
                item: line.item,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_amount: line.discount_amount.unwrap_or_else(|| BigDecimal::from(0)),
                tax_amount: line.tax_amount.unwrap_or_else(|| BigDecimal::from(0)),
                cost_center: line.cost_center,
                project: line.project,
                warehouse: line.warehouse,
            })
            .collect();

        recompute_totals(voucher);
    }
}

/// Recompute header totals from the lines.
///
/// `net_amount` is a document figure: posting writes the lines only, so a
/// round-off that must reach the books is entered as a line against the
/// round-off account.
pub fn recompute_totals(voucher: &mut Voucher) {
    voucher.total_amount = voucher.total_debits();
    voucher.tax_amount = voucher.lines.iter().map(|l| &l.tax_amount).sum();
    voucher.discount_amount = voucher.lines.iter().map(|l| &l.discount_amount).sum();
    voucher.net_amount = &voucher.total_amount + &voucher.round_off_amount;
}

pub(crate) fn ensure_draft(voucher: &Voucher, action: &str) -> LedgerResult<()> {
    match voucher.status {
        VoucherStatus::Draft => Ok(()),
        status => Err(LedgerError::InvalidState(format!(
            "Voucher {} is {} and cannot be {}",
            voucher.voucher_number, status, action
        ))),
    }
}

/// Builder for voucher drafts
#[derive(Debug)]
pub struct VoucherBuilder {
    draft: VoucherDraft,
}

impl VoucherBuilder {
    /// Create a new voucher builder
    pub fn new(voucher_type: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            draft: VoucherDraft {
                header: VoucherHeader::new(voucher_type, date),
                lines: Vec::new(),
            },
        }
    }

    /// Set the narration for the voucher
    pub fn narration(mut self, narration: impl Into<String>) -> Self {
        self.draft.header.narration = Some(narration.into());
        self
    }

    /// Set the reference for the voucher
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.draft.header.reference = Some(reference.into());
        self
    }

    /// Set the counterparty name
    pub fn party(mut self, party_name: impl Into<String>) -> Self {
        self.draft.header.party_name = Some(party_name.into());
        self
    }

    /// Set currency and exchange rate to the base currency
    pub fn currency(mut self, currency: impl Into<String>, exchange_rate: BigDecimal) -> Self {
        self.draft.header.currency = Some(currency.into());
        self.draft.header.exchange_rate = Some(exchange_rate);
        self
    }

    /// Set the round-off amount
    pub fn round_off(mut self, amount: BigDecimal) -> Self {
        self.draft.header.round_off_amount = Some(amount);
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account_id: Uuid, amount: BigDecimal, narration: Option<String>) -> Self {
        self.draft
            .lines
            .push(VoucherLineInput::debit(account_id, amount, narration));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account_id: Uuid, amount: BigDecimal, narration: Option<String>) -> Self {
        self.draft
            .lines
            .push(VoucherLineInput::credit(account_id, amount, narration));
        self
    }

    /// Add a custom line
    pub fn line(mut self, line: VoucherLineInput) -> Self {
        self.draft.lines.push(line);
        self
    }

    /// Build the draft, running the default line checks
    pub fn build(self) -> LedgerResult<VoucherDraft> {
        DefaultVoucherValidator.validate_draft(&self.draft)?;
        Ok(self.draft)
    }
}

/// Common voucher patterns
pub mod patterns {
    use super::*;

    /// Parameters for a sales invoice with GST output tax
    pub struct SalesWithGstParams {
        pub date: NaiveDate,
        pub party_name: String,
        pub receivables_account_id: Uuid,
        pub revenue_account_id: Uuid,
        pub gst_output_account_id: Uuid,
        pub base_amount: BigDecimal,
        pub gst_amount: BigDecimal,
    }

    /// Parameters for a purchase bill with GST input credit
    pub struct PurchaseWithGstParams {
        pub date: NaiveDate,
        pub party_name: String,
        pub expense_account_id: Uuid,
        pub gst_input_account_id: Uuid,
        pub payables_account_id: Uuid,
        pub base_amount: BigDecimal,
        pub gst_amount: BigDecimal,
    }

    /// Payment of an expense (debit expense, credit cash/bank)
    pub fn expense_payment(
        date: NaiveDate,
        narration: &str,
        expense_account_id: Uuid,
        cash_account_id: Uuid,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new("Payment", date)
            .narration(narration)
            .debit(expense_account_id, amount.clone(), None)
            .credit(cash_account_id, amount, None)
            .build()
    }

    /// Money received (debit cash/bank, credit income or receivables)
    pub fn receipt(
        date: NaiveDate,
        narration: &str,
        cash_account_id: Uuid,
        source_account_id: Uuid,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new("Receipt", date)
            .narration(narration)
            .debit(cash_account_id, amount.clone(), None)
            .credit(source_account_id, amount, None)
            .build()
    }

    /// Transfer between two accounts
    pub fn journal(
        date: NaiveDate,
        narration: &str,
        debit_account_id: Uuid,
        credit_account_id: Uuid,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new("Journal", date)
            .narration(narration)
            .debit(debit_account_id, amount.clone(), None)
            .credit(credit_account_id, amount, None)
            .build()
    }

    /// Sales invoice: receivable for the gross, revenue and GST output credited
    pub fn sales_with_gst(params: SalesWithGstParams) -> LedgerResult<VoucherDraft> {
        let total_amount = &params.base_amount + &params.gst_amount;
        let mut revenue_line = VoucherLineInput::credit(
            params.revenue_account_id,
            params.base_amount,
            Some("Revenue amount".to_string()),
        );
        revenue_line.tax_amount = Some(params.gst_amount.clone());

        VoucherBuilder::new("Sales", params.date)
            .party(params.party_name)
            .debit(
                params.receivables_account_id,
                total_amount,
                Some("Total including GST".to_string()),
            )
            .line(revenue_line)
            .credit(
                params.gst_output_account_id,
                params.gst_amount,
                Some("GST payable".to_string()),
            )
            .build()
    }

    /// Purchase bill: expense and GST input debited, payable credited with the gross
    pub fn purchase_with_gst(params: PurchaseWithGstParams) -> LedgerResult<VoucherDraft> {
        let total_amount = &params.base_amount + &params.gst_amount;
        let mut expense_line = VoucherLineInput::debit(
            params.expense_account_id,
            params.base_amount,
            Some("Expense amount".to_string()),
        );
        expense_line.tax_amount = Some(params.gst_amount.clone());

        VoucherBuilder::new("Purchase", params.date)
            .party(params.party_name)
            .line(expense_line)
            .debit(
                params.gst_input_account_id,
                params.gst_amount,
                Some("GST recoverable".to_string()),
            )
            .credit(
                params.payables_account_id,
                total_amount,
                Some("Total payable".to_string()),
            )
            .build()
    }
}
