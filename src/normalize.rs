//! Canonicalizes raw statement text before pattern search.
//!
//! Source documents are inconsistent about currency markers, negative
//! conventions and whitespace. Normalization resolves all three up front so
//! the extractor can work against a single amount grammar:
//! - currency codes and glyphs adjacent to an amount are stripped (field
//!   names are left untouched),
//! - parenthesized amounts become signed amounts (`(12,500.00)` becomes
//!   `-12,500.00`),
//! - whitespace runs collapse to a single space.

use regex::Regex;

use crate::error::Result;

/// Core amount grammar: optional sign, digit groups with thousands
/// separators, exactly two fractional digits.
pub(crate) const AMOUNT_PATTERN: &str = r"-?\d[\d,]*\.\d{2}";

/// Statement text after normalization, in the two shapes the extractor
/// needs.
///
/// Some layouts place the value inline after the field name, others place it
/// on the following line, so both the flattened text and the per-line
/// structure are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStatement {
    flattened: String,
    lines: Vec<String>,
}

impl NormalizedStatement {
    pub(crate) fn from_parts(flattened: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            flattened: flattened.into(),
            lines,
        }
    }

    /// The whole statement as one whitespace-collapsed string.
    pub fn flattened(&self) -> &str {
        &self.flattened
    }

    /// Non-empty normalized lines, in document order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty()
    }
}

/// Applies the normalization passes. Construct once and reuse; the patterns
/// are compiled up front.
#[derive(Debug)]
pub struct TextNormalizer {
    currency_code: Regex,
    currency_glyph: Regex,
    paren_negative: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        // The code must sit at a token boundary so words like "Rent" or
        // "Ribs" are never shortened. The boundary character is captured and
        // restored because the regex engine has no lookbehind.
        let currency_code = Regex::new(&format!(
            r"(?m)(?P<pre>^|[\s(])(?:ZAR|USD|EUR|GBP|R)\s*(?P<amt>\(?{})",
            AMOUNT_PATTERN
        ))?;
        let currency_glyph = Regex::new(&format!(r"[$€£]\s*(?P<amt>\(?{})", AMOUNT_PATTERN))?;
        let paren_negative = Regex::new(r"\(\s*(?P<amt>\d[\d,]*\.\d{2})\s*\)")?;

        Ok(Self {
            currency_code,
            currency_glyph,
            paren_negative,
        })
    }

    /// Runs the passes in order (currency markers first, so a marker inside
    /// parentheses does not hide a parenthesized negative) and splits the
    /// result into the dual representation.
    pub fn normalize(&self, raw: &str) -> NormalizedStatement {
        let stripped = self.currency_code.replace_all(raw, "${pre}${amt}");
        let stripped = self.currency_glyph.replace_all(&stripped, "${amt}");
        let signed = self.paren_negative.replace_all(&stripped, "-${amt}");

        let lines: Vec<String> = signed
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect();
        let flattened = lines.join(" ");

        NormalizedStatement { flattened, lines }
    }
}
