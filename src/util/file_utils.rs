// External crates
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

// Local modules
use crate::constants::{OUTPUT_DATE_FORMAT, OUTPUT_DATE_HEADER, OUTPUT_PRICE_HEADER};
use crate::error::ForecastError;

/// Write a dated forecast as `Date,Predicted_Close_Price`
///
/// The CSV is written next to the target under a temporary name and then
/// renamed, so a failed write never leaves a half-written forecast behind.
///
/// # Arguments
///
/// * `path` - Output CSV path; missing parent directories are created
/// * `dates` - Forecast dates
/// * `prices` - Predicted close prices, one per date
pub fn write_forecast_csv<P: AsRef<Path>>(path: P, dates: &[NaiveDate], prices: &[f64]) -> Result<()> {
    let path = path.as_ref();
    if dates.len() != prices.len() {
        bail!("{} dates but {} prices", dates.len(), prices.len());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let date_text: Vec<String> = dates
        .iter()
        .map(|d| d.format(OUTPUT_DATE_FORMAT).to_string())
        .collect();
    let mut df = DataFrame::new(vec![
        Series::new(OUTPUT_DATE_HEADER.into(), date_text).into_column(),
        Series::new(OUTPUT_PRICE_HEADER.into(), prices.to_vec()).into_column(),
    ])?;

    let tmp_path = path.with_extension("csv.tmp");
    let written = write_then_rename(&mut df, &tmp_path, path);
    if written.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!("Could not remove {}: {}", tmp_path.display(), e);
        }
    }
    written?;

    info!("Predictions saved to {}", path.display());
    Ok(())
}

fn write_then_rename(df: &mut DataFrame, tmp_path: &Path, path: &Path) -> Result<()> {
    {
        let mut file = File::create(tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    }
    fs::rename(tmp_path, path)
        .with_context(|| format!("Failed to move forecast into {}", path.display()))
}

/// Read a forecast CSV written by `write_forecast_csv`
///
/// # Returns
///
/// The forecast rows as (date, predicted close) pairs in file order
pub fn read_forecast_csv<P: AsRef<Path>>(path: P) -> Result<Vec<(NaiveDate, f64)>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ForecastError::FileNotFound(path.to_path_buf()).into());
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    for name in [OUTPUT_DATE_HEADER, OUTPUT_PRICE_HEADER] {
        if !df.schema().contains(name) {
            return Err(ForecastError::MissingColumn(name.to_string()).into());
        }
    }

    let dates = df.column(OUTPUT_DATE_HEADER)?.str()?;
    let prices = df.column(OUTPUT_PRICE_HEADER)?.str()?;

    dates
        .into_iter()
        .zip(prices.into_iter())
        .enumerate()
        .map(|(row, (date, price))| {
            let date = date
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), OUTPUT_DATE_FORMAT).ok())
                .ok_or_else(|| anyhow!("Invalid date at row {} of {}", row + 1, path.display()))?;
            let price = price
                .and_then(|p| p.trim().parse::<f64>().ok())
                .ok_or_else(|| anyhow!("Invalid price at row {} of {}", row + 1, path.display()))?;
            Ok((date, price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_forecast_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("stock_predictions.csv");
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        ];

        write_forecast_csv(&path, &dates, &[22011.5, 22050.25]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Predicted_Close_Price");
        assert_eq!(lines[1], "2024-03-01,22011.5");
        assert_eq!(lines[2], "2024-03-02,22050.25");
        assert_eq!(lines.len(), 3);
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_read_forecast_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stock_predictions.csv");
        let dates: Vec<NaiveDate> = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect();

        write_forecast_csv(&path, &dates, &[1.5, 2.5, 3.5]).unwrap();
        let rows = read_forecast_csv(&path).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], (dates[2], 3.5));
    }

    #[test]
    fn test_write_forecast_csv_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let dates = vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()];

        assert!(write_forecast_csv(&path, &dates, &[1.0, 2.0]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // a non-empty directory where the CSV should go makes the final rename fail
        let path = dir.path().join("stock_predictions.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep.txt"), "x").unwrap();
        let dates = vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()];

        assert!(write_forecast_csv(&path, &dates, &[1.0]).is_err());
        assert!(!path.with_extension("csv.tmp").exists());
        assert!(path.join("keep.txt").exists());
    }
}
