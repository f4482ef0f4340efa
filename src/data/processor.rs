//! Data Processor Module
//! Turns loaded rows into sorted, enriched observations.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Half-point exchange-rate ranges used by the network graph.
///
/// Every range is left-closed and right-open except `From4_0To4_5`, which
/// also contains 4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueBucket {
    From1_5To2_0,
    From2_0To2_5,
    From2_5To3_0,
    From3_0To3_5,
    From3_5To4_0,
    From4_0To4_5,
}

impl ValueBucket {
    pub const ALL: [ValueBucket; 6] = [
        ValueBucket::From1_5To2_0,
        ValueBucket::From2_0To2_5,
        ValueBucket::From2_5To3_0,
        ValueBucket::From3_0To3_5,
        ValueBucket::From3_5To4_0,
        ValueBucket::From4_0To4_5,
    ];

    /// Lowest rate covered by any bucket.
    pub const MIN_RATE: f64 = 1.5;
    /// Highest rate covered by any bucket (inclusive).
    pub const MAX_RATE: f64 = 4.5;

    /// Find the bucket for a rate. Rates outside 1.5..=4.5 (and NaN) have none.
    pub fn from_rate(rate: f64) -> Option<Self> {
        if !(Self::MIN_RATE..=Self::MAX_RATE).contains(&rate) {
            return None;
        }
        if rate == Self::MAX_RATE {
            return Some(ValueBucket::From4_0To4_5);
        }
        Self::ALL.into_iter().find(|bucket| {
            let (low, high) = bucket.bounds();
            rate >= low && rate < high
        })
    }

    /// Lower and upper bound of the range.
    pub fn bounds(self) -> (f64, f64) {
        let index = self as usize as f64;
        let low = Self::MIN_RATE + 0.5 * index;
        (low, low + 0.5)
    }

    pub fn label(self) -> &'static str {
        match self {
            ValueBucket::From1_5To2_0 => "1.5-2.0",
            ValueBucket::From2_0To2_5 => "2.0-2.5",
            ValueBucket::From2_5To3_0 => "2.5-3.0",
            ValueBucket::From3_0To3_5 => "3.0-3.5",
            ValueBucket::From3_5To4_0 => "3.5-4.0",
            ValueBucket::From4_0To4_5 => "4.0-4.5",
        }
    }
}

impl fmt::Display for ValueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row as read from the input file, before enrichment.
///
/// `year` and `month` are `Some` only when the file already carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub exchange_rate: f64,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// One dated exchange-rate reading with its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub exchange_rate: f64,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub value_bucket: Option<ValueBucket>,
}

/// Enrichment and ordering of loaded rows.
pub struct DataProcessor;

impl DataProcessor {
    /// Calendar quarter (1-4) of a date.
    pub fn quarter_of(date: NaiveDate) -> u32 {
        (date.month() - 1) / 3 + 1
    }

    /// Derive year, month, quarter and bucket for one row.
    ///
    /// Year and month already present in the row are kept as they are.
    pub fn enrich(raw: RawRecord) -> Observation {
        Observation {
            date: raw.date,
            exchange_rate: raw.exchange_rate,
            year: raw.year.unwrap_or_else(|| raw.date.year()),
            month: raw.month.unwrap_or_else(|| raw.date.month()),
            quarter: Self::quarter_of(raw.date),
            value_bucket: ValueBucket::from_rate(raw.exchange_rate),
        }
    }

    /// Enrich every row and sort ascending by date.
    ///
    /// The sort is stable: rows sharing a date keep their file order.
    pub fn prepare(rows: Vec<RawRecord>) -> Vec<Observation> {
        let mut observations: Vec<Observation> = rows.into_iter().map(Self::enrich).collect();
        observations.sort_by_key(|obs| obs.date);
        observations
    }

    /// Distinct years in ascending order.
    pub fn get_years(observations: &[Observation]) -> Vec<i32> {
        let mut years: Vec<i32> = observations.iter().map(|obs| obs.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Exchange rates grouped by year, years ascending, rates in date order.
    pub fn rates_by_year(observations: &[Observation]) -> Vec<(i32, Vec<f64>)> {
        Self::get_years(observations)
            .into_iter()
            .map(|year| {
                let rates = observations
                    .iter()
                    .filter(|obs| obs.year == year)
                    .map(|obs| obs.exchange_rate)
                    .collect();
                (year, rates)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(d: NaiveDate, rate: f64) -> RawRecord {
        RawRecord {
            date: d,
            exchange_rate: rate,
            year: None,
            month: None,
        }
    }

    #[rstest]
    #[case(1.5, Some(ValueBucket::From1_5To2_0))]
    #[case(1.99, Some(ValueBucket::From1_5To2_0))]
    #[case(2.0, Some(ValueBucket::From2_0To2_5))]
    #[case(2.5, Some(ValueBucket::From2_5To3_0))]
    #[case(3.49, Some(ValueBucket::From3_0To3_5))]
    #[case(4.0, Some(ValueBucket::From4_0To4_5))]
    #[case(4.5, Some(ValueBucket::From4_0To4_5))]
    #[case(1.0, None)]
    #[case(1.49, None)]
    #[case(4.51, None)]
    #[case(5.0, None)]
    #[case(f64::NAN, None)]
    fn test_bucket_boundaries(#[case] rate: f64, #[case] expected: Option<ValueBucket>) {
        assert_eq!(ValueBucket::from_rate(rate), expected);
    }

    #[test]
    fn test_bucket_labels_follow_bounds() {
        for bucket in ValueBucket::ALL {
            let (low, high) = bucket.bounds();
            assert_eq!(bucket.label(), format!("{:.1}-{:.1}", low, high));
        }
        assert_eq!(ValueBucket::From2_0To2_5.to_string(), "2.0-2.5");
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 1)]
    #[case(4, 2)]
    #[case(6, 2)]
    #[case(7, 3)]
    #[case(9, 3)]
    #[case(10, 4)]
    #[case(12, 4)]
    fn test_quarter_of(#[case] month: u32, #[case] quarter: u32) {
        assert_eq!(DataProcessor::quarter_of(date(2017, month, 15)), quarter);
    }

    #[test]
    fn test_enrich_derives_missing_fields() {
        let obs = DataProcessor::enrich(raw(date(2016, 5, 12), 3.51));

        assert_eq!(obs.year, 2016);
        assert_eq!(obs.month, 5);
        assert_eq!(obs.quarter, 2);
        assert_eq!(obs.value_bucket, Some(ValueBucket::From3_5To4_0));
    }

    #[test]
    fn test_enrich_keeps_existing_year_and_month() {
        let mut row = raw(date(2016, 5, 12), 3.51);
        row.year = Some(1999);
        row.month = Some(11);

        let obs = DataProcessor::enrich(row);

        assert_eq!(obs.year, 1999);
        assert_eq!(obs.month, 11);
        // Quarter always comes from the date
        assert_eq!(obs.quarter, 2);
    }

    #[test]
    fn test_prepare_sorts_stably_and_keeps_length() {
        let rows = vec![
            raw(date(2012, 3, 1), 2.0),
            raw(date(2010, 1, 4), 1.8),
            raw(date(2012, 3, 1), 2.1),
            raw(date(2011, 7, 9), 5.2),
        ];

        let prepared = DataProcessor::prepare(rows);

        assert_eq!(prepared.len(), 4);
        assert!(prepared.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(prepared[0].exchange_rate, 1.8);
        assert_eq!(prepared[2].exchange_rate, 2.0);
        assert_eq!(prepared[3].exchange_rate, 2.1);
        assert_eq!(prepared[1].value_bucket, None);
    }

    #[test]
    fn test_rates_by_year_orders_years() {
        let prepared = DataProcessor::prepare(vec![
            raw(date(2013, 2, 1), 2.3),
            raw(date(2011, 2, 1), 1.7),
            raw(date(2013, 3, 1), 2.4),
        ]);

        let grouped = DataProcessor::rates_by_year(&prepared);

        assert_eq!(grouped, vec![(2011, vec![1.7]), (2013, vec![2.3, 2.4])]);
    }
}
