use statement_importer::{
    import_statement, CatalogProfile, FieldDefinition, LedgerStore, Period,
};

fn main() {
    // A vocabulary for a business the built-in profiles know nothing about.
    let profile = CatalogProfile::Custom(vec![
        FieldDefinition::new("Takings").with_alias("Daily takings"),
        FieldDefinition::new("Beans and milk"),
        FieldDefinition::new("Pastries"),
        FieldDefinition::new("Shop rent").with_alias("Rental"),
        FieldDefinition::new("Barista wages"),
        FieldDefinition::new("Owner drawings").signed(),
    ]);

    let statement = "\
BEAN COUNTER COFFEE CO
MANAGEMENT ACCOUNTS - MAY 2024

Takings                     R 48,200.00
Beans and milk                 9,140.00
Pastries                       3,615.50
Shop rent                     12,000.00
Barista wages                 14,800.00
Owner drawings                (6,000.00)
";

    let store = LedgerStore::new();
    let period: Period = "2024-05".parse().expect("valid period");

    let (outcome, record) = import_statement(&store, &profile, statement, period, false)
        .expect("import should succeed");

    println!("Matched {} of 6 fields", outcome.values.len());
    for (name, value) in &record.values {
        println!("  {:<16} {:>12}", name, value);
    }

    // The profile definition itself is serializable, so a front end can
    // offer the same vocabulary for editing.
    let schema = CatalogProfile::schema_as_json().expect("schema serializes");
    println!("\nProfile schema is {} bytes of JSON", schema.len());
}
