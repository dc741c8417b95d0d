use anyhow::Result;
use rust_decimal::Decimal;
use statement_importer::{format_rand, CatalogProfile, LedgerStore, Period, StatementImporter};

fn main() -> Result<()> {
    let importer = StatementImporter::new(&CatalogProfile::Summary)?;
    let store = LedgerStore::new();

    // 1. Two months of summary statements, as they come out of a PDF text layer
    let march_text = "\
SILVER AVENUE GRILL (PTY) LTD
INCOME STATEMENT FOR THE MONTH ENDED 31 MARCH 2024

Gross turnover                          R 125,430.00
Less VAT                                 (15,430.00)
Nett turnover                           R 110,000.00
Total cost of sales                        38,500.00
Gross profit                               71,500.00
Net profit/(loss)                       R (12,500.00)
";
    let april_text = "\
SILVER AVENUE GRILL (PTY) LTD
INCOME STATEMENT FOR THE MONTH ENDED 30 APRIL 2024

Gross turnover                          R 131,080.00
Less VAT                                 (16,120.00)
Nett turnover                           R 114,960.00
Total cost of sales                        39,870.00
Gross profit                               75,090.00
Net profit/(loss)                        R 8,440.00
";

    let march: Period = "2024-03".parse()?;
    let april: Period = "2024-04".parse()?;

    let (outcome, _) = importer.import(&store, march_text, march, false)?;
    println!("📄 {}: {}", march, importer.report(&outcome).summary());

    let (outcome, _) = importer.import(&store, april_text, april, false)?;
    println!("📄 {}: {}", april, importer.report(&outcome).summary());

    // 2. Query the ledger
    println!();
    for record in store.records() {
        if let Some(turnover) = record.get("Gross turnover") {
            println!("   {}  gross turnover {}", record.period, format_rand(turnover));
        }
    }

    println!();
    for (period, value) in store.periods_below("Net profit/(loss)", Decimal::ZERO) {
        println!("⚠️  {} closed at a loss of {}", period, format_rand(value));
    }

    // 3. Persist and reload
    store.save_csv_file("ledger.csv", importer.catalog())?;
    let reloaded = LedgerStore::load_csv_file("ledger.csv", importer.catalog())?;
    println!("\n✅ Saved and reloaded {} records (ledger.csv)", reloaded.len());

    Ok(())
}
