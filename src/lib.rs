//! # Statement Importer
//!
//! A library for extracting validated monthly financial records from
//! free-form income statement text (management accounts, bookkeeper
//! exports, PDF text layers) and filing them in a period-keyed ledger.
//!
//! ## Core Concepts
//!
//! - **Field Catalog**: the canonical field vocabulary to search for, with aliases and per-field sign rules, validated once up front
//! - **Normalization**: currency markers stripped, parenthesised negatives rewritten as signed amounts, whitespace collapsed
//! - **Extraction**: a per-field scan that reports matched, missing and ambiguous fields instead of failing on imperfect documents
//! - **Ledger**: one record per month, merged atomically, persisted as CSV
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_importer::*;
//!
//! let importer = StatementImporter::new(&CatalogProfile::Summary)?;
//! let store = LedgerStore::new();
//!
//! let text = std::fs::read_to_string("statement_2024_03.txt")?;
//! let period: Period = "2024-03".parse()?;
//!
//! let (outcome, _record) = importer.import(&store, &text, period, false)?;
//! println!("{}", importer.report(&outcome).summary());
//!
//! store.save_csv_file("ledger.csv", importer.catalog())?;
//! ```

pub mod catalog;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod normalize;
pub mod report;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use catalog::{CatalogProfile, FieldCatalog, FieldDefinition};
pub use error::{Result, StatementError};
pub use extract::{AmbiguousField, ExtractionResult, FieldExtractor, TableLayout};
pub use ledger::{FinancialRecord, LedgerStore, Period};
pub use normalize::{NormalizedStatement, TextNormalizer};
pub use report::{format_rand, ExtractionReport};

use log::info;

/// The assembled import pipeline: one normalizer and one extractor built
/// from a catalog profile, reusable across any number of statements.
pub struct StatementImporter {
    normalizer: TextNormalizer,
    extractor: FieldExtractor,
    table_layout: Option<TableLayout>,
}

impl StatementImporter {
    pub fn new(profile: &CatalogProfile) -> Result<Self> {
        let catalog = FieldCatalog::from_profile(profile)?;
        Ok(Self {
            normalizer: TextNormalizer::new()?,
            extractor: FieldExtractor::new(catalog)?,
            table_layout: None,
        })
    }

    /// Enables column-aware extraction for statements laid out as
    /// multi-column tables (actual vs budget, this year vs last year).
    pub fn with_table_layout(mut self, layout: TableLayout) -> Self {
        self.table_layout = Some(layout);
        self
    }

    pub fn catalog(&self) -> &FieldCatalog {
        self.extractor.catalog()
    }

    /// Normalizes and extracts without touching any store.
    pub fn extract_only(&self, raw_text: &str) -> ExtractionResult {
        let statement = self.normalizer.normalize(raw_text);
        match &self.table_layout {
            Some(layout) => self.extractor.extract_with_table(&statement, layout),
            None => self.extractor.extract(&statement),
        }
    }

    /// Extracts from `raw_text` and merges the values into `store` under
    /// `period`.
    ///
    /// Extraction itself never fails on statement content: a statement that
    /// matches nothing yields an all-missing outcome and an empty record.
    /// The merge refuses a period that already holds a record unless
    /// `overwrite` is set.
    pub fn import(
        &self,
        store: &LedgerStore,
        raw_text: &str,
        period: Period,
        overwrite: bool,
    ) -> Result<(ExtractionResult, FinancialRecord)> {
        let outcome = self.extract_only(raw_text);
        info!(
            "Extraction for {} matched {} of {} fields",
            period,
            outcome.values.len(),
            self.catalog().len()
        );

        let record = store.merge(period, outcome.values.clone(), overwrite)?;
        Ok((outcome, record))
    }

    pub fn report(&self, outcome: &ExtractionResult) -> ExtractionReport {
        ExtractionReport::new(outcome, self.catalog())
    }
}

/// One-call convenience over [`StatementImporter::import`] for callers that
/// do not need to reuse the pipeline.
pub fn import_statement(
    store: &LedgerStore,
    profile: &CatalogProfile,
    raw_text: &str,
    period: Period,
    overwrite: bool,
) -> Result<(ExtractionResult, FinancialRecord)> {
    StatementImporter::new(profile)?.import(store, raw_text, period, overwrite)
}
