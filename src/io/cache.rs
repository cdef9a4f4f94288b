use crate::core::ladder::DateLadder;
use crate::types::{FamError, FamResult, ParcelId, YearTable, LADDER_LEN};
use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Cache file for one processed year
pub fn cache_path(cache_dir: &Path, year: i32) -> PathBuf {
    cache_dir.join(format!("yr_{}.csv", year))
}

/// Write a dense year table to the cache.
///
/// Layout matches the dense table itself: an `id` column followed by one
/// column per ladder date in ISO format.
pub fn write_year(cache_dir: &Path, table: &YearTable) -> FamResult<()> {
    std::fs::create_dir_all(cache_dir)?;
    let ladder = DateLadder::for_year(table.year())?;
    let path = cache_path(cache_dir, table.year());
    let mut writer = WriterBuilder::new().from_path(&path)?;

    let mut header = vec!["id".to_string()];
    header.extend(ladder.dates().iter().map(|d| d.to_string()));
    writer.write_record(&header)?;

    for (parcel, row) in table.parcels().iter().zip(table.values().rows()) {
        let mut record = vec![parcel.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::debug!("cached year {} to {}", table.year(), path.display());
    Ok(())
}

/// Read a previously cached year table, if present and well-formed.
///
/// Any failure here (missing file, wrong header, bad value) only triggers
/// full reprocessing from raw input, so it is logged and swallowed rather
/// than surfaced as an error.
pub fn read_year(cache_dir: &Path, year: i32) -> Option<YearTable> {
    let path = cache_path(cache_dir, year);
    match try_read(&path, year) {
        Ok(table) => {
            log::info!(
                "cache hit for year {}: {} parcels",
                year,
                table.parcel_count()
            );
            Some(table)
        }
        Err(e) => {
            log::warn!(
                "cache miss for year {} ({}): reprocessing from raw input",
                year,
                e
            );
            None
        }
    }
}

fn try_read(path: &Path, year: i32) -> FamResult<YearTable> {
    let ladder = DateLadder::for_year(year)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let header = reader.headers()?.clone();
    if header.len() != LADDER_LEN + 1 {
        return Err(FamError::InvalidFormat(format!(
            "{}: {} columns, expected {}",
            path.display(),
            header.len(),
            LADDER_LEN + 1
        )));
    }
    for (date, field) in ladder.dates().iter().zip(header.iter().skip(1)) {
        if field != date.to_string() {
            return Err(FamError::InvalidFormat(format!(
                "{}: ladder column {:?} does not match expected {}",
                path.display(),
                field,
                date
            )));
        }
    }

    let mut parcels: Vec<ParcelId> = Vec::new();
    let mut flat: Vec<f64> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let bad = |what: &str| {
            FamError::InvalidFormat(format!("{}: {}", path.display(), what))
        };
        let parcel = record
            .get(0)
            .and_then(|f| f.trim().parse().ok())
            .ok_or_else(|| bad("bad parcel id"))?;
        parcels.push(parcel);
        for field in record.iter().skip(1) {
            let value: f64 = field.trim().parse().map_err(|_| bad("bad ndvi value"))?;
            if value.is_nan() {
                return Err(bad("NaN in dense series"));
            }
            flat.push(value);
        }
    }

    let values = Array2::from_shape_vec((parcels.len(), LADDER_LEN), flat).map_err(|e| {
        FamError::InvalidFormat(format!("{}: ragged rows ({})", path.display(), e))
    })?;
    YearTable::new(year, parcels, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sample_table(year: i32) -> YearTable {
        let values = Array2::from_shape_fn((2, LADDER_LEN), |(i, j)| 0.1 * i as f64 + 0.01 * j as f64);
        YearTable::new(year, vec![10, 20], values).unwrap()
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table(2018);
        write_year(dir.path(), &table).unwrap();
        let restored = read_year(dir.path(), 2018).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_year(dir.path(), 2018).is_none());
    }

    #[test]
    fn test_corrupt_cache_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(cache_path(dir.path(), 2018), "id,garbage\n10,x\n").unwrap();
        assert!(read_year(dir.path(), 2018).is_none());
    }

    #[test]
    fn test_wrong_year_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table(2018);
        write_year(dir.path(), &table).unwrap();
        // present the 2018 file as 2019: ladder dates no longer match
        std::fs::rename(
            cache_path(dir.path(), 2018),
            cache_path(dir.path(), 2019),
        )
        .unwrap();
        assert!(read_year(dir.path(), 2019).is_none());
    }
}
