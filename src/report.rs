//! Human-facing summaries of an extraction outcome.

use num_format::{Locale, ToFormattedString as _};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::catalog::FieldCatalog;
use crate::extract::ExtractionResult;

/// How many missing field names `summary` lists before truncating.
const MAX_LISTED_MISSING: usize = 5;

/// Derived view over one extraction run: coverage plus a short description
/// suitable for logs or an operator-facing status line. Pure data; building
/// or printing it has no side effects.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    matched: usize,
    catalog_size: usize,
    missing: Vec<String>,
    ambiguous: Vec<String>,
}

impl ExtractionReport {
    pub fn new(result: &ExtractionResult, catalog: &FieldCatalog) -> Self {
        Self {
            matched: result.values.len(),
            catalog_size: catalog.len(),
            missing: result.missing.clone(),
            ambiguous: result
                .ambiguous
                .iter()
                .map(|a| a.canonical_name.clone())
                .collect(),
        }
    }

    /// Fraction of catalog fields that were extracted, in `[0.0, 1.0]`.
    pub fn coverage_ratio(&self) -> f64 {
        if self.catalog_size == 0 {
            return 0.0;
        }
        self.matched as f64 / self.catalog_size as f64
    }

    /// One-line description of the run. Missing names are truncated after
    /// the first few; ambiguous fields are always listed in full because
    /// each one needs operator review.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Matched {} of {} fields ({:.1}% coverage).",
            self.matched,
            self.catalog_size,
            self.coverage_ratio() * 100.0
        );

        if !self.missing.is_empty() {
            let listed = if self.missing.len() <= MAX_LISTED_MISSING {
                self.missing.join(", ")
            } else {
                format!(
                    "{} ... and {} more",
                    self.missing[..MAX_LISTED_MISSING].join(", "),
                    self.missing.len() - MAX_LISTED_MISSING
                )
            };
            summary.push_str(&format!(" Missing: {}.", listed));
        }

        if !self.ambiguous.is_empty() {
            summary.push_str(&format!(
                " Ambiguous (first match kept): {}.",
                self.ambiguous.join(", ")
            ));
        }

        summary
    }
}

/// Renders an amount the way the dashboards always did: rand symbol,
/// thousands separators, two decimals (`R12,345.67`). Grouping uses the en
/// locale regardless of the host's.
pub fn format_rand(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let magnitude = rounded.abs();

    let units = magnitude
        .trunc()
        .to_i64()
        .unwrap_or_default()
        .to_formatted_string(&Locale::en);
    let cents_text = format!("{:.2}", magnitude.fract());
    let cents = cents_text.split('.').nth(1).unwrap_or("00");

    let sign = if negative { "-" } else { "" };
    format!("R{}{}.{}", sign, units, cents)
}
