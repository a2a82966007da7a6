//! E2E tests driving the binary against the household fixture

use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--"].iter().copied().chain(args.iter().copied()))
        .output()
        .expect("Failed to execute command")
}

/// Test the net worth report at a fixed date
#[test]
fn report_shows_net_worth() {
    let output = run(&["report", "tests/data/household.json", "-d", "2025-04-05"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("NET WORTH as at 2025-04-05 (GBP)"));
    assert!(stdout.contains("Current"));
    assert!(stdout.contains("4749.75"));
    assert!(stdout.contains("Savings"));
    assert!(stdout.contains("2020.00"));
    assert!(stdout.contains("4.00%"));
    // 205 VOD units at the 6.00 price
    assert!(stdout.contains("1230.00"));
    assert!(stdout.contains("6769.75"));
    assert!(stdout.contains("7999.75"));
}

/// Test the report JSON output
#[test]
fn report_json_output() {
    let output = run(&[
        "report",
        "tests/data/household.json",
        "-d",
        "2025-04-05",
        "--json",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("\"net_worth\": \"7999.75\""));
    assert!(stdout.contains("\"account_total\": \"6769.75\""));
    assert!(stdout.contains("\"portfolio_total\": \"1230.00\""));
}

/// Test summary tables for categories, payees and tax bases
#[test]
fn summary_totals_flows() {
    let output = run(&["summary", "tests/data/household.json"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("Salary"));
    assert!(stdout.contains("3000.00"));
    assert!(stdout.contains("Groceries"));
    assert!(stdout.contains("150.25"));
    assert!(stdout.contains("Tesco"));
    assert!(stdout.contains("HMRC"));
    assert!(stdout.contains("600.00"));
    assert!(stdout.contains("Gross Income"));
    assert!(stdout.contains("Tax Paid"));
    // 5000 opening + 3000 salary + 20 interest + 30 dividend
    assert!(stdout.contains("8050.00"));
}

/// Test a date-bounded summary with an extra CSV transaction stream merged in
#[test]
fn summary_range_with_merged_csv() {
    let output = run(&[
        "summary",
        "tests/data/household.json",
        "--transactions",
        "tests/data/march_transactions.csv",
        "--from",
        "2025-03-01",
        "--to",
        "2025-03-31",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("2025-03-01 to 2025-03-31"));
    assert!(stdout.contains("Groceries"));
    assert!(stdout.contains("49.75"));
    // The salary flows all predate the range
    assert!(!stdout.contains("Salary"));
    assert!(stdout.contains("-49.75"));
}

/// Test per-holding positions and valuations
#[test]
fn holdings_values_positions() {
    let output = run(&["holdings", "tests/data/household.json", "-d", "2025-04-05"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("HOLDINGS as at 2025-04-05 (GBP)"));
    assert!(stdout.contains("VOD"));
    assert!(stdout.contains("205"));
    assert!(stdout.contains("1030.00"));
    assert!(stdout.contains("1230.00"));
    // The surrendered bond keeps its realized gain
    assert!(stdout.contains("GROWTH"));
    assert!(stdout.contains("500.00"));
}

/// Test the holdings security filter
#[test]
fn holdings_filter_by_security() {
    let output = run(&[
        "holdings",
        "tests/data/household.json",
        "-d",
        "2025-04-05",
        "-s",
        "vod",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("VOD"));
    assert!(!stdout.contains("GROWTH"));
}

/// Test the merged event timeline
#[test]
fn events_lists_market_and_transactions() {
    let output = run(&["events", "tests/data/household.json"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("Price VOD"));
    assert!(stdout.contains("Price GROWTH"));
    assert!(stdout.contains("Transaction"));
    assert!(stdout.contains("ISA:VOD"));
    assert!(stdout.contains("April pay"));
}

/// Test events CSV output with an owner filter
#[test]
fn events_csv_with_owner_filter() {
    let output = run(&[
        "events",
        "tests/data/household.json",
        "--owner",
        "Tesco",
        "--csv",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("ref,date,event,debit,credit,category,amount,tax,units,description"));
    assert!(stdout.contains("Tesco"));
    assert!(stdout.contains("150.25"));
    assert!(!stdout.contains("Salary"));
    assert!(!stdout.contains("Price VOD"));
}

/// Test the chargeable event listing before any taxation
#[test]
fn chargeable_lists_gains() {
    let output = run(&["chargeable", "tests/data/household.json"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("GROWTH"));
    assert!(stdout.contains("500.00"));
    // 500 gain sliced over 3 years
    assert!(stdout.contains("166.67"));
    assert!(stdout.contains("Total gains:"));
}

/// Test tax apportionment across chargeable events
#[test]
fn chargeable_applies_tax() {
    let output = run(&[
        "chargeable",
        "tests/data/household.json",
        "--tax",
        "100",
        "--json",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("\"taxation\": \"100.00\""));
    assert!(stdout.contains("\"tax_due\": \"300.00\""));
    assert!(stdout.contains("\"total_tax_due\": \"300.00\""));
}

/// Test that validation passes on a complete ledger
#[test]
fn validate_passes_clean_ledger() {
    let output = run(&["validate", "tests/data/household.json"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("No issues found"));
}

/// Test that validation flags missing market data and exits non-zero
#[test]
fn validate_flags_missing_market_data() {
    let output = run(&["validate", "tests/data/missing_price.json"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());

    assert!(stdout.contains("MissingPrice"));
    assert!(stdout.contains("MissingRate"));
    assert!(stdout.contains("ACME"));
}

/// Test the JSON Schema output
#[test]
fn schema_prints_json_schema() {
    let output = run(&["schema"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("\"title\": \"LedgerFile\""));
    assert!(stdout.contains("transactions"));
}

/// Test the CSV header and field documentation outputs
#[test]
fn schema_prints_csv_columns() {
    let output = run(&["schema", "csv-header", "prices"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("date,security,price"));

    let output = run(&["schema", "csv-fields", "transactions"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("tax_credit"));
    assert!(stdout.contains("decimal"));
    assert!(stdout.contains("optional"));
}
