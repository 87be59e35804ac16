// External imports
use chrono::{Days, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

// Internal imports
use crate::constants::INPUT_DATE_FORMAT;

/// Header of the index exports the loader reads, spacing included
pub const INDEX_HEADER: &str = "Date ,Open ,High ,Low ,Close ,Shares Traded ,Turnover (Rs Cr)";

/// Write `header` and `rows` to `dir/name` and return the path
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(&path, text).unwrap();
    path
}

/// Rows of a steadily rising index, one per calendar day from 1 Jan 2024
///
/// Close is `100 + i`, open sits half a point below, high and low one point
/// either side, volume grows by 10 a day.
pub fn rising_index_rows(num_rows: usize) -> Vec<String> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..num_rows)
        .map(|i| {
            let date = start.checked_add_days(Days::new(i as u64)).unwrap();
            let close = 100.0 + i as f64;
            format!(
                "{},{},{},{},{},{},{}",
                date.format(INPUT_DATE_FORMAT),
                close - 0.5,
                close + 1.0,
                close - 1.0,
                close,
                1000 + 10 * i,
                1.0
            )
        })
        .collect()
}

/// Write `rising_index_rows(num_rows)` as an index export
pub fn write_rising_index_csv(dir: &Path, name: &str, num_rows: usize) -> PathBuf {
    let rows = rising_index_rows(num_rows);
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    write_csv(dir, name, INDEX_HEADER, &refs)
}

/// Close climbs `100 + i` from 1 Jan 2024 while open, high, low and volume
/// stay fixed, so only the close-driven features move
pub fn write_linear_close_csv(dir: &Path, name: &str, num_rows: usize) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let rows: Vec<String> = (0..num_rows)
        .map(|i| {
            let date = start.checked_add_days(Days::new(i as u64)).unwrap();
            format!(
                "{},120,140,100,{},5000,1.0",
                date.format(INPUT_DATE_FORMAT),
                100 + i
            )
        })
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    write_csv(dir, name, INDEX_HEADER, &refs)
}
