// External crates
use anyhow::Result;
use ndarray::Array2;
use polars::prelude::*;

// Local modules
use crate::constants::FEATURE_COLUMNS;
use crate::error::ForecastError;

/// Calculates the fractional day-over-day close change (0 for the first row)
pub fn calculate_price_change(df: &DataFrame) -> PolarsResult<Series> {
    let close = df.column("close")?.f64()?;
    let prev_close = close.shift(1);

    let changes: Vec<Option<f64>> = prev_close
        .into_iter()
        .zip(close.into_iter())
        .map(|(prev, curr)| match (prev, curr) {
            (Some(p), Some(c)) => Some((c - p) / p),
            (None, Some(_)) => Some(0.0),
            _ => None,
        })
        .collect();

    Ok(Series::new("price_change".into(), changes))
}

/// Calculates the intraday range (high - low)
pub fn calculate_volatility(df: &DataFrame) -> PolarsResult<Series> {
    let high = df.column("high")?.as_materialized_series().clone();
    let low = df.column("low")?.as_materialized_series().clone();
    let volatility = (&high - &low)?;
    Ok(volatility.with_name("volatility".into()))
}

/// Calculates the absolute day-over-day close difference (0 for the first row)
pub fn calculate_daily_return(df: &DataFrame) -> PolarsResult<Series> {
    let close = df.column("close")?.f64()?;
    let prev_close = close.shift(1);

    let returns: Vec<Option<f64>> = prev_close
        .into_iter()
        .zip(close.into_iter())
        .map(|(prev, curr)| match (prev, curr) {
            (Some(p), Some(c)) => Some(c - p),
            (None, Some(_)) => Some(0.0),
            _ => None,
        })
        .collect();

    Ok(Series::new("daily_return".into(), returns))
}

/// Adds the derived daily features to a cleaned, date-sorted frame
pub fn add_daily_features(df: &mut DataFrame) -> PolarsResult<()> {
    let price_change = calculate_price_change(df)?;
    let volatility = calculate_volatility(df)?;
    let daily_return = calculate_daily_return(df)?;

    df.with_column(price_change)?
        .with_column(volatility)?
        .with_column(daily_return)?;

    Ok(())
}

/// Extracts the feature matrix [rows, 8] in `FEATURE_COLUMNS` order
pub fn feature_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_features = FEATURE_COLUMNS.len();
    let mut matrix = Array2::<f64>::zeros((n_rows, n_features));

    for (j, &name) in FEATURE_COLUMNS.iter().enumerate() {
        if !df.schema().contains(name) {
            return Err(ForecastError::MissingColumn(name.to_string()).into());
        }
        let values = df.column(name)?.cast(&DataType::Float64)?;
        for (i, value) in values.f64()?.into_iter().enumerate() {
            let value = value.ok_or_else(|| {
                anyhow::anyhow!("Missing value in feature '{}' at row {}", name, i)
            })?;
            // a zero close makes the next price_change infinite
            if !value.is_finite() {
                return Err(ForecastError::NonFiniteValue {
                    row: i,
                    column: name.to_string(),
                }
                .into());
            }
            matrix[[i, j]] = value;
        }
    }

    Ok(matrix)
}
