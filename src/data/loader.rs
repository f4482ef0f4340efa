//! CSV Data Loader Module
//! Loads the exchange-rate file with Polars and validates it into typed rows.

use crate::data::processor::{DataProcessor, Observation, RawRecord};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Date column (required).
pub const DATE_COLUMN: &str = "Data";
/// Exchange-rate column (required).
pub const RATE_COLUMN: &str = "USD_BRL";
/// Pre-computed year column (optional, passed through).
pub const YEAR_COLUMN: &str = "Ano";
/// Pre-computed month column (optional, passed through).
pub const MONTH_COLUMN: &str = "Mes";
/// Quarter column (optional, always recomputed).
pub const QUARTER_COLUMN: &str = "Trimestre";

const KNOWN_COLUMNS: [&str; 5] = [
    DATE_COLUMN,
    RATE_COLUMN,
    YEAR_COLUMN,
    MONTH_COLUMN,
    QUARTER_COLUMN,
];

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Unknown column '{0}' (expected {known})", known = KNOWN_COLUMNS.join(", "))]
    UnknownColumn(String),
    #[error("Invalid value '{value}' in column '{column}' at row {row}: {reason}")]
    Parse {
        column: &'static str,
        row: usize,
        value: String,
        reason: String,
    },
}

impl LoaderError {
    fn parse(column: &'static str, index: usize, value: &str, reason: impl Into<String>) -> Self {
        LoaderError::Parse {
            column,
            row: index + 1,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Load options for the input file.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Skip unrecognised columns instead of rejecting the file.
    pub allow_extra_columns: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            allow_extra_columns: false,
        }
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    options: LoadOptions,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

impl DataLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load, validate, enrich and sort the observations in `path`.
    pub fn load_observations(&self, path: &Path) -> Result<Vec<Observation>, LoaderError> {
        log::info!("Loading data from file: {}", path.display());

        let df = self.load_csv(path)?;
        let rows = self.read_rows(&df)?;
        let observations = DataProcessor::prepare(rows);

        log::info!("Dataset prepared with {} records.", observations.len());
        Ok(observations)
    }

    /// Read the file into a DataFrame without interpreting any column.
    ///
    /// Schema inference is disabled so every column arrives as text and each
    /// value is validated here, wherever it sits in the file.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::FileNotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(self.options.delimiter)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        Ok(df)
    }

    /// Validate the column set and convert each row to a [`RawRecord`].
    pub fn read_rows(&self, df: &DataFrame) -> Result<Vec<RawRecord>, LoaderError> {
        self.validate_columns(df)?;

        let dates = Self::date_values(df.column(DATE_COLUMN)?)?;
        let rates = Self::rate_values(df.column(RATE_COLUMN)?)?;

        let years = match df.column(YEAR_COLUMN) {
            Ok(column) => Some(Self::year_values(column)?),
            Err(_) => None,
        };
        let months = match df.column(MONTH_COLUMN) {
            Ok(column) => Some(Self::month_values(column)?),
            Err(_) => None,
        };

        let rows = dates
            .into_iter()
            .zip(rates)
            .enumerate()
            .map(|(i, (date, exchange_rate))| RawRecord {
                date,
                exchange_rate,
                year: years.as_ref().map(|y| y[i]),
                month: months.as_ref().map(|m| m[i]),
            })
            .collect();

        Ok(rows)
    }

    fn validate_columns(&self, df: &DataFrame) -> Result<(), LoaderError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for required in [DATE_COLUMN, RATE_COLUMN] {
            if !names.iter().any(|name| name == required) {
                return Err(LoaderError::MissingColumn(required));
            }
        }

        for name in &names {
            if KNOWN_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if self.options.allow_extra_columns {
                log::warn!("Ignoring unknown column '{}'", name);
            } else {
                return Err(LoaderError::UnknownColumn(name.clone()));
            }
        }

        if names.iter().any(|name| name == QUARTER_COLUMN) {
            log::debug!("Column '{}' present, recomputing from dates", QUARTER_COLUMN);
        }

        Ok(())
    }

    /// Parse a date string in any of the accepted layouts.
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
                    .ok()
                    .map(|dt| dt.date())
            })
    }

    fn date_values(column: &Column) -> Result<Vec<NaiveDate>, LoaderError> {
        let as_text = column.cast(&DataType::String)?;
        let ca = as_text.str()?;

        ca.into_iter()
            .enumerate()
            .map(|(i, value)| {
                let value = value.ok_or_else(|| LoaderError::parse(DATE_COLUMN, i, "", "missing date"))?;
                Self::parse_date(value)
                    .ok_or_else(|| LoaderError::parse(DATE_COLUMN, i, value, "unrecognised date"))
            })
            .collect()
    }

    fn rate_values(column: &Column) -> Result<Vec<f64>, LoaderError> {
        let as_text = column.cast(&DataType::String)?;

        as_text
            .str()?
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let text = value.unwrap_or_default().trim();
                match text.parse::<f64>() {
                    Err(_) if text.is_empty() => {
                        Err(LoaderError::parse(RATE_COLUMN, i, "", "missing value"))
                    }
                    Err(_) => Err(LoaderError::parse(RATE_COLUMN, i, text, "not a number")),
                    Ok(v) if !v.is_finite() || v <= 0.0 => Err(LoaderError::parse(
                        RATE_COLUMN,
                        i,
                        text,
                        "exchange rate must be a positive number",
                    )),
                    Ok(v) => Ok(v),
                }
            })
            .collect()
    }

    fn year_values(column: &Column) -> Result<Vec<i32>, LoaderError> {
        Self::integer_values(column, YEAR_COLUMN)?
            .into_iter()
            .enumerate()
            .map(|(i, year)| {
                i32::try_from(year).map_err(|_| {
                    LoaderError::parse(YEAR_COLUMN, i, &year.to_string(), "year out of range")
                })
            })
            .collect()
    }

    fn month_values(column: &Column) -> Result<Vec<u32>, LoaderError> {
        Self::integer_values(column, MONTH_COLUMN)?
            .into_iter()
            .enumerate()
            .map(|(i, month)| match u32::try_from(month) {
                Ok(month) if (1..=12).contains(&month) => Ok(month),
                _ => Err(LoaderError::parse(
                    MONTH_COLUMN,
                    i,
                    &month.to_string(),
                    "month must be between 1 and 12",
                )),
            })
            .collect()
    }

    fn integer_values(column: &Column, name: &'static str) -> Result<Vec<i64>, LoaderError> {
        let as_text = column.cast(&DataType::String)?;
        let ca = as_text.str()?;

        ca.into_iter()
            .enumerate()
            .map(|(i, value)| {
                let text = value.unwrap_or_default().trim();
                text.parse::<i64>()
                    .map_err(|_| LoaderError::parse(name, i, text, "not an integer"))
            })
            .collect()
    }
}
