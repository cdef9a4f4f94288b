use crate::types::{FamError, FamResult, Observation};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Raw observation files carry four columns: a row index, ndvi, parcel id
/// and date. Only the last three are consumed; the row index is ignored.
const COL_NDVI: usize = 1;
const COL_ID: usize = 2;
const COL_DATE: usize = 3;

/// Read one raw observation file.
///
/// An unparseable NDVI field becomes NaN (the reading is effectively
/// missing and interpolation covers it); a malformed id or date is a
/// structural problem and fails the file.
pub fn read_observations_file<P: AsRef<Path>>(path: P) -> FamResult<Vec<Observation>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |col: usize| -> FamResult<&str> {
            record.get(col).map(str::trim).ok_or_else(|| {
                FamError::InvalidFormat(format!(
                    "{}: row with {} columns, expected at least {}",
                    path.display(),
                    record.len(),
                    COL_DATE + 1
                ))
            })
        };

        let ndvi: f64 = field(COL_NDVI)?.parse().unwrap_or(f64::NAN);
        let parcel = field(COL_ID)?.parse().map_err(|_| {
            FamError::InvalidFormat(format!(
                "{}: bad parcel id {:?}",
                path.display(),
                field(COL_ID).unwrap_or("")
            ))
        })?;
        let date_str = field(COL_DATE)?;
        let date = parse_date(date_str).ok_or_else(|| {
            FamError::InvalidFormat(format!("{}: bad date {:?}", path.display(), date_str))
        })?;

        observations.push(Observation {
            parcel,
            date,
            ndvi,
        });
    }
    log::debug!(
        "{}: read {} observations",
        path.display(),
        observations.len()
    );
    Ok(observations)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// Discover raw observation files grouped by year.
///
/// Expects the `input/<year>/*.csv` layout; subdirectories whose names are
/// not years are skipped with a warning.
pub fn discover_input_files<P: AsRef<Path>>(input_dir: P) -> FamResult<BTreeMap<i32, Vec<PathBuf>>> {
    let mut by_year: BTreeMap<i32, Vec<PathBuf>> = BTreeMap::new();
    for entry in std::fs::read_dir(input_dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Ok(year) = name.to_string_lossy().parse::<i32>() else {
            log::warn!("skipping non-year input directory {:?}", name);
            continue;
        };
        let mut files: Vec<PathBuf> = std::fs::read_dir(entry.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        files.sort();
        if !files.is_empty() {
            by_year.insert(year, files);
        }
    }
    Ok(by_year)
}

/// Read and concatenate all observation files for one year
pub fn read_year(files: &[PathBuf]) -> FamResult<Vec<Observation>> {
    let mut observations = Vec::new();
    for file in files {
        observations.extend(read_observations_file(file)?);
    }
    Ok(observations)
}
