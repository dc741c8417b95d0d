use std::error::Error;

use statement_importer::{pdf, CatalogProfile, LedgerStore, Period, StatementImporter};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        println!("Usage: pdf_import <statement.pdf> <YYYY-MM>");
        println!("Extracts the detailed field set from a statement PDF.");
        return Ok(());
    }

    let period: Period = args[2].parse()?;

    println!("📄 Reading {}", args[1]);
    let text = pdf::statement_text_from_file(&args[1])?;
    println!("   {} characters of text extracted", text.len());

    let importer = StatementImporter::new(&CatalogProfile::Detailed)?;
    let store = LedgerStore::new();

    let (outcome, record) = importer.import(&store, &text, period, false)?;
    println!("✅ {}", importer.report(&outcome).summary());

    for (name, value) in &record.values {
        println!("   {:<40} {:>14}", name, value);
    }

    if !outcome.ambiguous.is_empty() {
        println!("⚠️  Fields with competing amounts (first kept):");
        for ambiguous in &outcome.ambiguous {
            println!("   {}: {}", ambiguous.canonical_name, ambiguous.candidates.join(", "));
        }
    }

    Ok(())
}
