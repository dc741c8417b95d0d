//! Field-by-field value extraction from normalized statement text.
//!
//! For every catalog field the extractor collects candidate amounts from the
//! statement, in document order, and resolves them under one policy: the
//! first parsable candidate wins, competing distinct values are reported as
//! ambiguous, and a field with no parsable candidate is reported as missing.
//! Missing and ambiguous fields are never errors; a partially extracted
//! statement is still worth keeping for operator review.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{FieldCatalog, FieldDefinition};
use crate::error::Result;
use crate::normalize::{NormalizedStatement, AMOUNT_PATTERN};

/// Longest run of non-letter characters allowed between a field name and its
/// amount in the flattened scan. Crosses leader dots, column padding and
/// percentage columns; prose between a name and an unrelated number does not
/// fit because prose contains letters.
const MAX_NAME_VALUE_GAP: usize = 60;

/// A field for which the statement offered more than one distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousField {
    pub canonical_name: String,
    /// Every competing matched amount string, in document order. The first
    /// parsable one is the value that was kept.
    pub candidates: Vec<String>,
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractionResult {
    /// Canonical field name to extracted amount, only for matched fields.
    /// Absent keys mean "not extracted", never zero.
    pub values: BTreeMap<String, Decimal>,
    /// Canonical names with no parsable amount, in catalog order.
    pub missing: Vec<String>,
    /// Fields resolved by tie-break, in catalog order.
    pub ambiguous: Vec<AmbiguousField>,
}

impl ExtractionResult {
    /// True when every catalog field was matched exactly once.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.ambiguous.is_empty()
    }
}

/// Column selection for statements that lay a field out as a row of several
/// numeric columns (actual, budget, variance and so on). `value_column` is
/// the zero-based index of the column holding the amount to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableLayout {
    pub value_column: usize,
}

impl TableLayout {
    pub fn new(value_column: usize) -> Self {
        Self { value_column }
    }
}

/// One candidate amount for one field.
#[derive(Debug, Clone)]
struct Candidate {
    raw: String,
    value: Option<Decimal>,
}

/// Compiled patterns for one catalog field.
#[derive(Debug)]
struct FieldMatcher {
    /// Term followed by an amount within the same segment of flattened text.
    inline: Regex,
    /// Whole line starting with a term, remainder captured for column
    /// splitting in table mode.
    row: Regex,
}

/// Scans normalized statement text for every field of one catalog.
///
/// All patterns are compiled at construction, once per catalog, so repeated
/// extraction runs pay no compilation cost.
#[derive(Debug)]
pub struct FieldExtractor {
    catalog: FieldCatalog,
    matchers: Vec<FieldMatcher>,
    standalone_amount: Regex,
    row_amount: Regex,
}

impl FieldExtractor {
    pub fn new(catalog: FieldCatalog) -> Result<Self> {
        let matchers = catalog
            .fields()
            .iter()
            .map(field_matcher)
            .collect::<Result<Vec<_>>>()?;
        let standalone_amount = Regex::new(&format!(
            r"(?i)^(?:R\s*)?(?P<amt>{})$",
            AMOUNT_PATTERN
        ))?;
        let row_amount = Regex::new(AMOUNT_PATTERN)?;

        debug!("Compiled {} field matchers", matchers.len());

        Ok(Self {
            catalog,
            matchers,
            standalone_amount,
            row_amount,
        })
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Runs the inline scan with the next-line fallback for every field.
    pub fn extract(&self, statement: &NormalizedStatement) -> ExtractionResult {
        self.run(statement, None)
    }

    /// Like [`extract`](Self::extract), but rows recognized as numeric table
    /// rows supply their value from `layout.value_column` and take precedence
    /// over the inline scan for their field. Fields without a recognized row
    /// are extracted exactly as in `extract`.
    pub fn extract_with_table(
        &self,
        statement: &NormalizedStatement,
        layout: &TableLayout,
    ) -> ExtractionResult {
        self.run(statement, Some(layout))
    }

    fn run(&self, statement: &NormalizedStatement, layout: Option<&TableLayout>) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        for (field, matcher) in self.catalog.fields().iter().zip(&self.matchers) {
            let mut candidates: Vec<Candidate> = Vec::new();

            if let Some(layout) = layout {
                let table = self.table_candidates(matcher, field, statement.lines(), layout);
                if has_parsable(&table) {
                    candidates = table;
                }
            }
            if candidates.is_empty() {
                let inline = self.inline_candidates(matcher, field, statement.flattened());
                if has_parsable(&inline) {
                    candidates = inline;
                }
            }
            if candidates.is_empty() {
                let next_line = self.next_line_candidates(field, statement.lines());
                if has_parsable(&next_line) {
                    candidates = next_line;
                }
            }

            resolve_field(field, candidates, &mut result);
        }

        debug!(
            "Extraction finished: {} matched, {} missing, {} ambiguous out of {} fields",
            result.values.len(),
            result.missing.len(),
            result.ambiguous.len(),
            self.catalog.len()
        );

        result
    }

    /// First amount after each term occurrence in the flattened text.
    fn inline_candidates(
        &self,
        matcher: &FieldMatcher,
        field: &FieldDefinition,
        flattened: &str,
    ) -> Vec<Candidate> {
        matcher
            .inline
            .captures_iter(flattened)
            .map(|caps| {
                let raw = caps["amt"].to_string();
                let value = parse_amount(&raw, field.allow_negative);
                Candidate { raw, value }
            })
            .collect()
    }

    /// A line equal to a search term, immediately followed by a line that is
    /// a standalone amount. Card layouts place values this way.
    fn next_line_candidates(&self, field: &FieldDefinition, lines: &[String]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for pair in lines.windows(2) {
            if self.catalog.lookup(&pair[0]) != Some(field.canonical_name.as_str()) {
                continue;
            }
            if let Some(caps) = self.standalone_amount.captures(&pair[1]) {
                let raw = caps["amt"].to_string();
                let value = parse_amount(&raw, field.allow_negative);
                candidates.push(Candidate { raw, value });
            }
        }
        candidates
    }

    /// Lines that read as a numeric table row for this field: the term at
    /// line start, then two or more amounts and nothing alphabetic. A row
    /// without the requested column is not a hit.
    fn table_candidates(
        &self,
        matcher: &FieldMatcher,
        field: &FieldDefinition,
        lines: &[String],
        layout: &TableLayout,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for line in lines {
            let caps = match matcher.row.captures(line) {
                Some(caps) => caps,
                None => continue,
            };
            let rest = &caps["rest"];
            let amounts: Vec<&str> = self
                .row_amount
                .find_iter(rest)
                .map(|m| m.as_str())
                .collect();
            if amounts.len() < 2 {
                continue;
            }
            if let Some(raw) = amounts.get(layout.value_column) {
                candidates.push(Candidate {
                    raw: (*raw).to_string(),
                    value: parse_amount(raw, field.allow_negative),
                });
            }
        }
        candidates
    }
}

fn has_parsable(candidates: &[Candidate]) -> bool {
    candidates.iter().any(|c| c.value.is_some())
}

/// Applies the first-wins policy and files the field into `values`,
/// `ambiguous` and `missing`.
fn resolve_field(field: &FieldDefinition, candidates: Vec<Candidate>, result: &mut ExtractionResult) {
    let mut winner: Option<Decimal> = None;
    let mut distinct: Vec<Decimal> = Vec::new();

    for candidate in &candidates {
        if let Some(value) = candidate.value {
            if winner.is_none() {
                winner = Some(value);
            }
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
    }

    match winner {
        Some(value) => {
            result.values.insert(field.canonical_name.clone(), value);
            if distinct.len() > 1 {
                debug!(
                    "Field '{}' matched {} competing values, keeping the first",
                    field.canonical_name,
                    distinct.len()
                );
                result.ambiguous.push(AmbiguousField {
                    canonical_name: field.canonical_name.clone(),
                    candidates: candidates.into_iter().map(|c| c.raw).collect(),
                });
            }
        }
        None => result.missing.push(field.canonical_name.clone()),
    }
}

/// Strips thousands separators and parses to a fixed-point decimal. Fields
/// that do not allow negatives take the absolute value, treating a stray
/// minus as a formatting artifact. `None` means the substring is not a
/// usable amount (for example, too many digits to represent).
fn parse_amount(raw: &str, allow_negative: bool) -> Option<Decimal> {
    let cleaned = raw.trim().replace(',', "");
    let value = Decimal::from_str(&cleaned).ok()?;
    if allow_negative {
        Some(value)
    } else {
        Some(value.abs())
    }
}

fn field_matcher(field: &FieldDefinition) -> Result<FieldMatcher> {
    let alternation = field
        .search_terms()
        .map(term_pattern)
        .collect::<Vec<_>>()
        .join("|");
    let inline = Regex::new(&format!(
        r"(?i)(?:{})[^A-Za-z]{{0,{}}}?(?:R\s*)?(?P<amt>{})",
        alternation, MAX_NAME_VALUE_GAP, AMOUNT_PATTERN
    ))?;
    let row = Regex::new(&format!(r"(?i)^(?:{})(?P<rest>[^A-Za-z]*)$", alternation))?;
    Ok(FieldMatcher { inline, row })
}

/// Turns one search term into a pattern fragment: tokens are matched
/// literally, token gaps tolerate commas and any whitespace, and word
/// boundaries apply only where the term edge is a word character (so a term
/// ending in ")" still matches).
fn term_pattern(term: &str) -> String {
    let tokens: Vec<String> = term
        .replace(',', " ")
        .split_whitespace()
        .map(|token| regex::escape(token))
        .collect();
    let mut pattern = tokens.join(r"[\s,]+");
    if term.starts_with(|c: char| c.is_alphanumeric()) {
        pattern.insert_str(0, r"\b");
    }
    if term.ends_with(|c: char| c.is_alphanumeric()) {
        pattern.push_str(r"\b");
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProfile;
    use crate::normalize::TextNormalizer;

    fn extractor(profile: &CatalogProfile) -> FieldExtractor {
        FieldExtractor::new(FieldCatalog::from_profile(profile).unwrap()).unwrap()
    }

    fn summary_extractor() -> FieldExtractor {
        extractor(&CatalogProfile::Summary)
    }

    fn custom(fields: Vec<FieldDefinition>) -> FieldExtractor {
        extractor(&CatalogProfile::Custom(fields))
    }

    fn normalized(raw: &str) -> NormalizedStatement {
        TextNormalizer::new().unwrap().normalize(raw)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_inline_scan_finds_values_and_reports_the_rest_missing() {
        let extractor = summary_extractor();
        let statement =
            normalized("Gross turnover R 125,430.00 ... Total cost of sales 54,210.00");

        let result = extractor.extract(&statement);

        assert_eq!(result.values.len(), 2);
        assert_eq!(result.values["Gross turnover"], dec("125430.00"));
        assert_eq!(result.values["Total cost of sales"], dec("54210.00"));
        assert!(result.ambiguous.is_empty());
        assert_eq!(
            result.missing,
            vec![
                "Less VAT",
                "Nett turnover",
                "Beverages",
                "Staff wages",
                "Utilities",
                "Marketing",
                "Gross profit",
                "Net profit/(loss)",
            ]
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let extractor = custom(vec![FieldDefinition::new("Gross turnover")]);
        let result = extractor.extract(&normalized("GROSS TURNOVER 125,430.00"));
        assert_eq!(result.values["Gross turnover"], dec("125430.00"));
    }

    #[test]
    fn test_alias_resolves_to_canonical_name() {
        let extractor = summary_extractor();
        let result = extractor.extract(&normalized("Net turnover 99,000.00"));
        assert_eq!(result.values["Nett turnover"], dec("99000.00"));
        assert!(!result.values.contains_key("Net turnover"));
    }

    #[test]
    fn test_duplicate_occurrences_first_wins_and_both_reported() {
        let extractor = custom(vec![FieldDefinition::new("Bank charges")]);
        let statement =
            normalized("Bank charges 10.00 carried forward\nBank charges 20.00 current");

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Bank charges"], dec("10.00"));
        assert_eq!(result.ambiguous.len(), 1);
        assert_eq!(result.ambiguous[0].canonical_name, "Bank charges");
        assert_eq!(result.ambiguous[0].candidates, vec!["10.00", "20.00"]);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_many_competing_values_are_all_reported() {
        let extractor = custom(vec![FieldDefinition::new("Bank charges")]);
        let text = (1..=9)
            .map(|i| format!("Bank charges {}0.00", i))
            .collect::<Vec<_>>()
            .join("\n");

        let result = extractor.extract(&normalized(&text));

        assert_eq!(result.values["Bank charges"], dec("10.00"));
        assert_eq!(result.ambiguous.len(), 1);
        let candidates = &result.ambiguous[0].candidates;
        assert_eq!(candidates.len(), 9);
        assert_eq!(candidates.first().map(String::as_str), Some("10.00"));
        assert_eq!(candidates.last().map(String::as_str), Some("90.00"));
    }

    #[test]
    fn test_repeated_identical_value_is_not_ambiguous() {
        let extractor = custom(vec![FieldDefinition::new("Bank charges")]);
        let statement = normalized("Bank charges 10.00 and again Bank charges 10.00");

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Bank charges"], dec("10.00"));
        assert!(result.ambiguous.is_empty());
    }

    #[test]
    fn test_prose_between_name_and_number_means_missing() {
        let extractor = custom(vec![FieldDefinition::new("Donations")]);
        let result = extractor.extract(&normalized("Donations see note 4"));

        assert!(result.values.is_empty());
        assert_eq!(result.missing, vec!["Donations"]);
        assert!(result.ambiguous.is_empty());
    }

    #[test]
    fn test_gap_crosses_leader_dots_and_percent_columns() {
        let extractor = custom(vec![FieldDefinition::new("Gross profit")]);
        let result = extractor.extract(&normalized("Gross profit ........ 61.2% 345,210.00"));
        assert_eq!(result.values["Gross profit"], dec("345210.00"));
    }

    #[test]
    fn test_negative_clamped_unless_field_allows_it() {
        let extractor = custom(vec![
            FieldDefinition::new("Donations"),
            FieldDefinition::new("Net profit/(loss)").signed(),
        ]);
        let statement = normalized("Donations (150.00)\nNet profit/(loss) (12,500.00)");

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Donations"], dec("150.00"));
        assert_eq!(result.values["Net profit/(loss)"], dec("-12500.00"));
    }

    #[test]
    fn test_leading_minus_preserved_for_signed_field() {
        let extractor = custom(vec![FieldDefinition::new("Net profit/(loss)").signed()]);
        let result = extractor.extract(&normalized("Net profit/(loss) -12,500.00"));
        assert_eq!(result.values["Net profit/(loss)"], dec("-12500.00"));
    }

    #[test]
    fn test_unrepresentable_amount_is_demoted_to_missing() {
        let extractor = custom(vec![FieldDefinition::new("Donations")]);
        let statement =
            normalized("Donations 111,111,111,111,111,111,111,111,111,111,111.00");

        let result = extractor.extract(&statement);

        assert!(result.values.is_empty());
        assert_eq!(result.missing, vec!["Donations"]);
    }

    #[test]
    fn test_next_line_fallback_when_flattened_text_has_no_amount() {
        let extractor = custom(vec![FieldDefinition::new("Beverages")]);
        let statement = NormalizedStatement::from_parts(
            "Beverages",
            vec!["Beverages".to_string(), "4,890.50".to_string()],
        );

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Beverages"], dec("4890.50"));
    }

    #[test]
    fn test_next_line_fallback_conflicts_are_ambiguous() {
        let extractor = custom(vec![FieldDefinition::new("Beverages")]);
        let statement = NormalizedStatement::from_parts(
            "Beverages twice over",
            vec![
                "Beverages".to_string(),
                "10.00".to_string(),
                "Beverages".to_string(),
                "20.00".to_string(),
            ],
        );

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Beverages"], dec("10.00"));
        assert_eq!(result.ambiguous.len(), 1);
        assert_eq!(result.ambiguous[0].candidates, vec!["10.00", "20.00"]);
    }

    #[test]
    fn test_table_mode_selects_the_requested_column() {
        let extractor = custom(vec![FieldDefinition::new("Beverages")]);
        let statement = normalized("Beverages 4,890.50 4,638.00 5.4");

        let inline = extractor.extract(&statement);
        assert_eq!(inline.values["Beverages"], dec("4890.50"));

        let budget = extractor.extract_with_table(&statement, &TableLayout::new(1));
        assert_eq!(budget.values["Beverages"], dec("4638.00"));
    }

    #[test]
    fn test_table_mode_ignores_rows_with_prose_or_too_few_columns() {
        let extractor = custom(vec![FieldDefinition::new("Beverages")]);
        // One amount only: not a table row, inline scan still applies.
        let single = normalized("Beverages 4,890.50");
        let result = extractor.extract_with_table(&single, &TableLayout::new(1));
        assert_eq!(result.values["Beverages"], dec("4890.50"));

        // Prose in the remainder: not a table row.
        let prose = normalized("Beverages cost of 4,890.50 against 4,638.00");
        let result = extractor.extract_with_table(&prose, &TableLayout::new(1));
        assert_eq!(result.missing, vec!["Beverages"]);
    }

    #[test]
    fn test_table_row_without_requested_column_is_not_a_hit() {
        let extractor = custom(vec![FieldDefinition::new("Beverages")]);
        let statement = normalized("Beverages 4,890.50 4,638.00");
        let result = extractor.extract_with_table(&statement, &TableLayout::new(5));
        // Falls through to the inline scan.
        assert_eq!(result.values["Beverages"], dec("4890.50"));
    }

    #[test]
    fn test_longer_phrase_fields_do_not_leak_into_prefix_fields() {
        let extractor = custom(vec![
            FieldDefinition::new("Salaries and wages"),
            FieldDefinition::new("Salaries and wages: management"),
        ]);
        let statement = normalized(
            "Salaries and wages: management 12,000.00\nSalaries and wages 30,000.00",
        );

        let result = extractor.extract(&statement);

        assert_eq!(result.values["Salaries and wages: management"], dec("12000.00"));
        assert_eq!(result.values["Salaries and wages"], dec("30000.00"));
        assert!(result.ambiguous.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = summary_extractor();
        let statement = normalized(
            "Gross turnover 125,430.00 Less VAT 15,430.00 Beverages 4,890.50 Beverages 5,000.00",
        );

        let first = extractor.extract(&statement);
        let second = extractor.extract(&statement);

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_statement_reports_every_field_missing() {
        let extractor = summary_extractor();
        let result = extractor.extract(&normalized(""));

        assert!(result.values.is_empty());
        assert_eq!(result.missing.len(), extractor.catalog().len());
        assert!(!result.is_complete());
    }
}
