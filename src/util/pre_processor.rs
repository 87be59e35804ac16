// External crates
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

// Local modules
use crate::constants::{DATE_COLUMN, INPUT_DATE_FORMAT, RAW_DATE_COLUMN, RAW_PRICE_COLUMNS};
use crate::error::ForecastError;

/// Loads a daily index CSV export and cleans it into a typed DataFrame
///
/// Every column is read as text first so that a stray token in one row
/// cannot make the whole column fail schema inference. Header names are
/// matched after trimming whitespace.
///
/// # Arguments
///
/// * `full_path` - Path to the CSV file
///
/// # Returns
///
/// A DataFrame with the columns `date` (days from the common era), `open`,
/// `high`, `low`, `close` and `shares_traded`, sorted ascending by date and
/// free of missing values
pub fn load_and_preprocess<P: AsRef<Path>>(full_path: P) -> Result<DataFrame> {
    let full_path = full_path.as_ref();
    info!("Loading data from: {}", full_path.display());

    if !full_path.exists() {
        return Err(ForecastError::FileNotFound(full_path.to_path_buf()).into());
    }

    let raw_df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(full_path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV {}", full_path.display()))?;

    let raw_rows = raw_df.height();
    let mut df = coerce_columns(&raw_df)?;

    // Drop any rows with missing values
    df = df.drop_nulls::<String>(None)?;

    // Sort the data in chronological order
    df = df.sort(
        vec![DATE_COLUMN],
        SortMultipleOptions::default().with_maintain_order(true),
    )?;

    info!(
        "Cleaned {}: {} raw rows, {} usable rows",
        full_path.display(),
        raw_rows,
        df.height()
    );

    Ok(df)
}

/// Builds the typed frame from the all-text frame read off disk
fn coerce_columns(raw_df: &DataFrame) -> Result<DataFrame> {
    let date_text = text_values(raw_df, RAW_DATE_COLUMN)?;
    let mut dates: Vec<Option<i32>> = Vec::with_capacity(date_text.len());
    for (row, value) in date_text.iter().enumerate() {
        dates.push(parse_date(row + 1, value.as_deref())?);
    }

    let mut columns = vec![Series::new(DATE_COLUMN.into(), dates).into_column()];
    for (raw_name, name) in RAW_PRICE_COLUMNS {
        let values: Vec<Option<f64>> = text_values(raw_df, raw_name)?
            .iter()
            .map(|v| parse_number(v.as_deref()))
            .collect();
        debug!(
            "Column '{}': {} unparseable values",
            raw_name,
            values.iter().filter(|v| v.is_none()).count()
        );
        columns.push(Series::new(name.into(), values).into_column());
    }

    Ok(DataFrame::new(columns)?)
}

/// Returns the text of a column, looked up by its trimmed header name
fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .get_columns()
        .iter()
        .find(|c| c.name().as_str().trim() == name)
        .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))?;

    let text = column.cast(&DataType::String)?;
    let values = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// Parses a DD-Mon-YYYY date. Blank cells are missing; anything else that
/// does not parse aborts the whole file.
pub fn parse_date(row: usize, raw: Option<&str>) -> Result<Option<i32>> {
    let text = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => text,
        None => return Ok(None),
    };
    let date = NaiveDate::parse_from_str(text, INPUT_DATE_FORMAT).map_err(|_| {
        ForecastError::DateParse {
            row,
            value: text.to_string(),
        }
    })?;
    Ok(Some(date.num_days_from_ce()))
}

/// Coerces a numeric cell, turning anything unparseable into a missing value
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Calendar dates of a cleaned frame, in row order
pub fn trading_dates(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    let days = df.column(DATE_COLUMN)?.i32()?;
    days.into_iter()
        .enumerate()
        .map(|(row, day)| {
            day.and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| anyhow!("Invalid date at row {}", row))
        })
        .collect()
}
