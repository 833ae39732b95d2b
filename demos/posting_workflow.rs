//! Voucher posting workflow example

use ledger_engine::utils::MemoryStorage;
use ledger_engine::{
    patterns, EntryType, Ledger, NewAccount, OpeningBalance, AccountType, VoucherBuilder,
    VoucherFilter, VoucherStatus,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Ledger Engine - Posting Workflow Example\n");

    let storage = MemoryStorage::new();
    let business = Uuid::new_v4();
    let clerk = Uuid::new_v4();
    storage.register_business(business)?;
    let ledger = Ledger::new(storage);

    // 1. Chart of accounts
    println!("Setting up Chart of Accounts...");
    let accounts = ledger.setup_standard_chart_of_accounts(business).await?;
    let mut listed = ledger.list_accounts(business).await?;
    listed.sort_by(|a, b| a.code.cmp(&b.code));
    for account in &listed {
        println!(
            "  {} {:<28} {:<9} normal {}",
            account.code,
            account.name,
            account.account_type.name(),
            account.normal_balance().label()
        );
    }
    let equipment = ledger
        .create_account(
            business,
            NewAccount::new("1500", "Office Equipment", AccountType::Asset),
        )
        .await?;
    println!("  {} {}\n", equipment.code, equipment.name);

    // 2. Opening balances
    let year_start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let opening = ledger
        .post_opening_balances(
            business,
            year_start,
            &[
                OpeningBalance {
                    account_id: accounts["bank"].id,
                    side: EntryType::Debit,
                    amount: BigDecimal::from(250000),
                },
                OpeningBalance {
                    account_id: accounts["loans_payable"].id,
                    side: EntryType::Credit,
                    amount: BigDecimal::from(100000),
                },
            ],
            clerk,
        )
        .await?;
    println!(
        "Opening balances posted as {} ({} entries)\n",
        opening.voucher_number, opening.entries_created
    );

    // 3. Drafts and posting
    println!("Posting vouchers...");
    let sale = patterns::sales_with_gst(patterns::SalesWithGstParams {
        date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        party_name: "Acme Traders".to_string(),
        receivables_account_id: accounts["accounts_receivable"].id,
        revenue_account_id: accounts["sales_revenue"].id,
        gst_output_account_id: accounts["gst_output"].id,
        base_amount: BigDecimal::from(40000),
        gst_amount: BigDecimal::from(7200),
    })?;
    let rent = patterns::expense_payment(
        NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
        "April rent",
        accounts["rent_expense"].id,
        accounts["bank"].id,
        BigDecimal::from(18000),
    )?;
    let purchase = VoucherBuilder::new("Payment", NaiveDate::from_ymd_opt(2024, 4, 15).unwrap())
        .narration("Laptop for accounts desk")
        .debit(equipment.id, BigDecimal::from(65000), None)
        .credit(accounts["bank"].id, BigDecimal::from(65000), None)
        .build()?;

    for draft in [sale, rent, purchase] {
        let voucher = ledger.create_voucher(business, clerk, draft).await?;
        let result = ledger.post_voucher_result(business, voucher.id, clerk).await;
        println!(
            "  {} {:<8} {:>10}  {}",
            voucher.voucher_number, voucher.voucher_type, voucher.total_amount, result.message
        );
    }

    // An unbalanced draft is stored but cannot be posted
    let lopsided = VoucherBuilder::new("Journal", NaiveDate::from_ymd_opt(2024, 4, 20).unwrap())
        .debit(accounts["cash"].id, BigDecimal::from(100), None)
        .credit(accounts["bank"].id, BigDecimal::from(90), None)
        .build()?;
    let lopsided = ledger.create_voucher(business, clerk, lopsided).await?;
    let rejected = ledger.post_voucher_result(business, lopsided.id, clerk).await;
    println!(
        "  {} rejected: {} (difference {:?})",
        lopsided.voucher_number, rejected.message, rejected.difference
    );
    ledger.cancel_voucher(business, lopsided.id, clerk).await?;

    let drafts = ledger
        .list_vouchers(
            business,
            &VoucherFilter {
                status: Some(VoucherStatus::Draft),
                ..VoucherFilter::default()
            },
        )
        .await?;
    println!("  drafts remaining: {}\n", drafts.len());

    // 4. Reports
    let from = Some(year_start);
    let to = NaiveDate::from_ymd_opt(2024, 4, 30);

    let statement = ledger
        .get_ledger_statement(business, accounts["bank"].id, from, to)
        .await?;
    println!("Bank statement {} to {}", statement.from_date, statement.to_date);
    println!("  opening {}", statement.opening_balance);
    for line in &statement.lines {
        println!(
            "  {} {:>10} {:>10}  {}",
            line.entry_date, line.debit, line.credit, line.running_balance
        );
    }
    println!("  closing {}\n", statement.closing_balance);

    let trial_balance = ledger.get_trial_balance(business, from, to).await?;
    println!("Trial Balance");
    for row in &trial_balance.rows {
        println!(
            "  {} {:<28} {:>10} {:>10}",
            row.account_code, row.account_name, row.closing_debit, row.closing_credit
        );
    }
    println!(
        "  totals {} / {} balanced: {}\n",
        trial_balance.total_closing_debit,
        trial_balance.total_closing_credit,
        trial_balance.is_balanced
    );

    let profit_and_loss = ledger.get_profit_and_loss(business, from, to).await?;
    println!(
        "Profit and Loss: income {} expenses {} net {}",
        profit_and_loss.total_income, profit_and_loss.total_expenses, profit_and_loss.net_profit
    );

    if let Some(as_of) = to {
        let balance_sheet = ledger.get_balance_sheet(business, as_of).await?;
        println!(
            "Balance Sheet: assets {} liabilities {} equity {} balanced: {}",
            balance_sheet.total_assets,
            balance_sheet.total_liabilities,
            balance_sheet.total_equity,
            balance_sheet.is_balanced
        );
    }

    let check = ledger.get_reconciliation_check(business, from, to).await?;
    println!(
        "Reconciliation: {} vouchers, {} entries, reconciled: {}",
        check.vouchers_checked, check.entries_checked, check.is_reconciled
    );

    Ok(())
}
