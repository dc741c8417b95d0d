//! Period-keyed storage for extracted records and its CSV persistence.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{Datelike, Days, NaiveDate};
use csv::{ReaderBuilder, WriterBuilder};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::FieldCatalog;
use crate::error::{Result, StatementError};

/// One reporting month. Totally ordered, renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(StatementError::InvalidPeriod {
                value: format!("{}-{}", year, month),
                details: "month must be between 1 and 12".to_string(),
            });
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(StatementError::InvalidPeriod {
                value: format!("{}-{}", year, month),
                details: "year is out of range".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };

        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap()
            .checked_sub_days(Days::new(1))
            .unwrap()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self> {
        let start_str = format!("{}-01", s.trim());
        let date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
            StatementError::InvalidPeriod {
                value: s.to_string(),
                details: "expected YYYY-MM".to_string(),
            }
        })?;
        Ok(Self::from_date(date))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

/// The persisted extraction outcome for one month. Keys are canonical field
/// names; a field absent from `values` was not extracted, which is distinct
/// from an extracted zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub period: Period,
    pub values: BTreeMap<String, Decimal>,
}

impl FinancialRecord {
    pub fn new(period: Period, values: BTreeMap<String, Decimal>) -> Self {
        Self { period, values }
    }

    pub fn get(&self, field: &str) -> Option<Decimal> {
        self.values.get(field).copied()
    }
}

/// In-memory store of one record per period, with CSV load and save.
///
/// All mutation goes through a single lock so that two importers racing on
/// the same period cannot both pass the existence check; exactly one merge
/// wins, the other gets [`StatementError::AlreadyExists`].
#[derive(Debug, Default)]
pub struct LedgerStore {
    records: Mutex<BTreeMap<Period, FinancialRecord>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the record for `period`. An existing record is refused unless
    /// `overwrite` is set, in which case it is replaced in full: fields
    /// omitted from `values` are gone from the replacement even if the old
    /// record had them.
    ///
    /// Callers are expected to pass canonical field names as produced by
    /// extraction.
    pub fn merge(
        &self,
        period: Period,
        values: BTreeMap<String, Decimal>,
        overwrite: bool,
    ) -> Result<FinancialRecord> {
        let mut records = self.records.lock().unwrap();

        if records.contains_key(&period) {
            if !overwrite {
                return Err(StatementError::AlreadyExists { period });
            }
            info!("Overwriting existing record for {}", period);
        }

        let record = FinancialRecord::new(period, values);
        records.insert(period, record.clone());
        info!("Stored record for {} ({} fields)", period, record.values.len());
        Ok(record)
    }

    pub fn get(&self, period: &Period) -> Option<FinancialRecord> {
        self.records.lock().unwrap().get(period).cloned()
    }

    pub fn contains(&self, period: &Period) -> bool {
        self.records.lock().unwrap().contains_key(period)
    }

    /// Every record, in period order.
    pub fn records(&self) -> Vec<FinancialRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Every stored period, in order.
    pub fn periods(&self) -> Vec<Period> {
        self.records.lock().unwrap().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Empties the store. The only way to delete records.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Periods whose value for `field` sits below `threshold`, in period
    /// order. Periods where the field was not extracted are not reported;
    /// absence is unknown, not zero.
    pub fn periods_below(&self, field: &str, threshold: Decimal) -> Vec<(Period, Decimal)> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter_map(|record| {
                record.get(field).and_then(|value| {
                    if value < threshold {
                        Some((record.period, value))
                    } else {
                        None
                    }
                })
            })
            .collect()
    }

    /// Writes the store as CSV: a `Month` column then one column per catalog
    /// field, in catalog order. Missing values become empty cells. Fields
    /// outside the catalog are dropped with a warning.
    pub fn save_csv<W: Write>(&self, writer: W, catalog: &FieldCatalog) -> Result<()> {
        let records = self.records.lock().unwrap();
        let mut csv_writer = WriterBuilder::new().from_writer(writer);

        let mut header = Vec::with_capacity(catalog.len() + 1);
        header.push("Month".to_string());
        header.extend(catalog.canonical_names().map(str::to_string));
        csv_writer.write_record(&header)?;

        for record in records.values() {
            for key in record.values.keys() {
                if catalog.lookup(key).is_none() {
                    warn!(
                        "Dropping field '{}' for {}: not in the active catalog",
                        key, record.period
                    );
                }
            }

            let mut row = Vec::with_capacity(catalog.len() + 1);
            row.push(record.period.to_string());
            for name in catalog.canonical_names() {
                let cell = record
                    .values
                    .get(name)
                    .map(Decimal::to_string)
                    .unwrap_or_default();
                row.push(cell);
            }
            csv_writer.write_record(&row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Reads a store written by [`save_csv`](Self::save_csv). Unknown
    /// columns and malformed cells are skipped with a warning so a file
    /// written against an older catalog revision still loads; an unreadable
    /// period key is an error because the row cannot be filed anywhere.
    /// Duplicate period rows keep the first occurrence.
    pub fn load_csv<R: Read>(reader: R, catalog: &FieldCatalog) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut columns: Vec<Option<String>> = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if i == 0 {
                if header != "Month" {
                    warn!(
                        "First column is '{}', expected 'Month'; treating it as the period column",
                        header
                    );
                }
                columns.push(None);
                continue;
            }
            match catalog.lookup(header) {
                Some(canonical) => columns.push(Some(canonical.to_string())),
                None => {
                    warn!("Ignoring unknown column '{}'", header);
                    columns.push(None);
                }
            }
        }

        let mut records: BTreeMap<Period, FinancialRecord> = BTreeMap::new();
        for row in csv_reader.records() {
            let row = row?;
            let period_cell = match row.get(0) {
                Some(cell) => cell,
                None => continue,
            };
            let period: Period = period_cell.parse()?;
            if records.contains_key(&period) {
                warn!("Duplicate row for {}, keeping the first", period);
                continue;
            }

            let mut values = BTreeMap::new();
            for (i, cell) in row.iter().enumerate().skip(1) {
                let canonical = match columns.get(i).and_then(|c| c.as_deref()) {
                    Some(name) => name,
                    None => continue,
                };
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                match Decimal::from_str(&cell.replace(',', "")) {
                    Ok(value) => {
                        values.insert(canonical.to_string(), value);
                    }
                    Err(_) => warn!(
                        "Ignoring malformed amount '{}' in column '{}' for {}",
                        cell, canonical, period
                    ),
                }
            }

            records.insert(period, FinancialRecord::new(period, values));
        }

        info!("Loaded {} records", records.len());
        Ok(Self {
            records: Mutex::new(records),
        })
    }

    pub fn save_csv_file<P: AsRef<Path>>(&self, path: P, catalog: &FieldCatalog) -> Result<()> {
        let file = File::create(&path)?;
        self.save_csv(BufWriter::new(file), catalog)?;
        info!("Saved {} records to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    pub fn load_csv_file<P: AsRef<Path>>(path: P, catalog: &FieldCatalog) -> Result<Self> {
        let file = File::open(&path)?;
        let store = Self::load_csv(BufReader::new(file), catalog)?;
        info!(
            "Loaded {} records from {}",
            store.len(),
            path.as_ref().display()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProfile;
    use std::sync::Arc;
    use std::thread;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn summary_catalog() -> FieldCatalog {
        FieldCatalog::from_profile(&CatalogProfile::Summary).unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, Decimal> {
        pairs
            .iter()
            .map(|(name, amount)| (name.to_string(), dec(amount)))
            .collect()
    }

    #[test]
    fn test_period_display_and_parse_round_trip() {
        let period = Period::new(2024, 3).unwrap();
        assert_eq!(period.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<Period>().unwrap(), period);
        assert_eq!(" 2024-03 ".parse::<Period>().unwrap(), period);
    }

    #[test]
    fn test_period_rejects_bad_input() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
        assert!("2024-13".parse::<Period>().is_err());
        assert!("March 2024".parse::<Period>().is_err());
        assert!("2024".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_ordering() {
        assert!(period("2024-03") < period("2024-12"));
        assert!(period("2024-12") < period("2025-01"));
    }

    #[test]
    fn test_period_day_bounds() {
        let feb_leap = Period::new(2024, 2).unwrap();
        assert_eq!(
            feb_leap.first_day(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(
            feb_leap.last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let december = Period::new(2023, 12).unwrap();
        assert_eq!(
            december.last_day(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_period_serde_as_string() {
        let period = Period::new(2024, 3).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2024-03\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }

    #[test]
    fn test_merge_refused_without_overwrite_and_store_unchanged() {
        let store = LedgerStore::new();
        let march = period("2024-03");
        store
            .merge(march, values(&[("Gross turnover", "100.00")]), false)
            .unwrap();

        let result = store.merge(march, values(&[("Gross turnover", "999.00")]), false);
        assert!(matches!(
            result,
            Err(StatementError::AlreadyExists { period }) if period == march
        ));

        let kept = store.get(&march).unwrap();
        assert_eq!(kept.get("Gross turnover"), Some(dec("100.00")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_overwrite_replaces_in_full() {
        let store = LedgerStore::new();
        let march = period("2024-03");
        store
            .merge(
                march,
                values(&[("Gross turnover", "100.00"), ("Less VAT", "15.00")]),
                false,
            )
            .unwrap();

        store
            .merge(march, values(&[("Gross turnover", "200.00")]), true)
            .unwrap();

        let replaced = store.get(&march).unwrap();
        assert_eq!(replaced.get("Gross turnover"), Some(dec("200.00")));
        assert_eq!(replaced.get("Less VAT"), None);
    }

    #[test]
    fn test_simultaneous_merges_for_one_period_admit_exactly_one() {
        let store = Arc::new(LedgerStore::new());
        let march = period("2024-03");

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.merge(march, BTreeMap::new(), false).is_ok())
            })
            .collect();

        let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_records_enumerate_in_period_order() {
        let store = LedgerStore::new();
        store.merge(period("2024-11"), BTreeMap::new(), false).unwrap();
        store.merge(period("2024-02"), BTreeMap::new(), false).unwrap();
        store.merge(period("2025-01"), BTreeMap::new(), false).unwrap();

        assert_eq!(
            store.periods(),
            vec![period("2024-02"), period("2024-11"), period("2025-01")]
        );
    }

    #[test]
    fn test_clear_empties_the_store() {
        let store = LedgerStore::new();
        store.merge(period("2024-03"), BTreeMap::new(), false).unwrap();
        assert!(!store.is_empty());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_csv_round_trip_keeps_missing_fields_missing() {
        let catalog = summary_catalog();
        let store = LedgerStore::new();
        store
            .merge(
                period("2024-03"),
                values(&[("Gross turnover", "125430.00"), ("Less VAT", "0.00")]),
                false,
            )
            .unwrap();
        store
            .merge(
                period("2024-04"),
                values(&[("Net profit/(loss)", "-12500.00")]),
                false,
            )
            .unwrap();

        let mut buffer = Vec::new();
        store.save_csv(&mut buffer, &catalog).unwrap();
        let loaded = LedgerStore::load_csv(buffer.as_slice(), &catalog).unwrap();

        assert_eq!(loaded.len(), 2);
        let march = loaded.get(&period("2024-03")).unwrap();
        assert_eq!(march.get("Gross turnover"), Some(dec("125430.00")));
        // An extracted zero survives as zero, not as missing.
        assert_eq!(march.get("Less VAT"), Some(dec("0.00")));
        assert_eq!(march.get("Beverages"), None);

        let april = loaded.get(&period("2024-04")).unwrap();
        assert_eq!(april.get("Net profit/(loss)"), Some(dec("-12500.00")));
        assert_eq!(april.get("Gross turnover"), None);
    }

    #[test]
    fn test_load_skips_unknown_columns() {
        let catalog = summary_catalog();
        let csv = "Month,Gross turnover,Mystery column\n2024-03,100.00,55.00\n";
        let store = LedgerStore::load_csv(csv.as_bytes(), &catalog).unwrap();

        let record = store.get(&period("2024-03")).unwrap();
        assert_eq!(record.get("Gross turnover"), Some(dec("100.00")));
        assert_eq!(record.values.len(), 1);
    }

    #[test]
    fn test_load_resolves_alias_headers_to_canonical_names() {
        let catalog = summary_catalog();
        let csv = "Month,Net turnover\n2024-03,99000.00\n";
        let store = LedgerStore::load_csv(csv.as_bytes(), &catalog).unwrap();

        let record = store.get(&period("2024-03")).unwrap();
        assert_eq!(record.get("Nett turnover"), Some(dec("99000.00")));
    }

    #[test]
    fn test_load_skips_malformed_cells_but_keeps_the_row() {
        let catalog = summary_catalog();
        let csv = "Month,Gross turnover,Less VAT\n2024-03,not a number,15430.00\n";
        let store = LedgerStore::load_csv(csv.as_bytes(), &catalog).unwrap();

        let record = store.get(&period("2024-03")).unwrap();
        assert_eq!(record.get("Gross turnover"), None);
        assert_eq!(record.get("Less VAT"), Some(dec("15430.00")));
    }

    #[test]
    fn test_load_keeps_first_of_duplicate_period_rows() {
        let catalog = summary_catalog();
        let csv = "Month,Gross turnover\n2024-03,100.00\n2024-03,999.00\n";
        let store = LedgerStore::load_csv(csv.as_bytes(), &catalog).unwrap();

        assert_eq!(store.len(), 1);
        let record = store.get(&period("2024-03")).unwrap();
        assert_eq!(record.get("Gross turnover"), Some(dec("100.00")));
    }

    #[test]
    fn test_load_rejects_unreadable_period() {
        let catalog = summary_catalog();
        let csv = "Month,Gross turnover\nMarch,100.00\n";
        let result = LedgerStore::load_csv(csv.as_bytes(), &catalog);
        assert!(matches!(result, Err(StatementError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_periods_below_threshold() {
        let store = LedgerStore::new();
        store
            .merge(period("2024-01"), values(&[("Net profit/(loss)", "100.00")]), false)
            .unwrap();
        store
            .merge(period("2024-02"), values(&[("Net profit/(loss)", "-50.00")]), false)
            .unwrap();
        // No profit figure at all for March: not reported either way.
        store.merge(period("2024-03"), BTreeMap::new(), false).unwrap();

        let flagged = store.periods_below("Net profit/(loss)", Decimal::ZERO);
        assert_eq!(flagged, vec![(period("2024-02"), dec("-50.00"))]);
    }
}
