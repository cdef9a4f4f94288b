use crate::pipeline::SeasonOutput;
use crate::types::FamResult;
use csv::WriterBuilder;
use std::path::{Path, PathBuf};

/// Output file for one (region, season, year) table
pub fn export_path(output_dir: &Path, output: &SeasonOutput) -> PathBuf {
    output_dir.join(format!(
        "{}_{}_{}.csv",
        output.region, output.season, output.year
    ))
}

/// Write one finalized classification table.
///
/// Columns are parcel id, standardized field status, percent of the
/// historical average, then the 8-day NDVI values for the season window.
/// Non-finite percent values are written as-is; consumers of this column
/// must tolerate them.
pub fn write_season<P: AsRef<Path>>(output_dir: P, output: &SeasonOutput) -> FamResult<PathBuf> {
    std::fs::create_dir_all(output_dir.as_ref())?;
    let path = export_path(output_dir.as_ref(), output);
    let mut writer = WriterBuilder::new().from_path(&path)?;

    let mut header = vec!["id".to_string(), "field_status".to_string(), "percent_5yr_avg".to_string()];
    header.extend(output.dates.iter().map(|d| d.to_string()));
    writer.write_record(&header)?;

    for (i, &parcel) in output.parcels.iter().enumerate() {
        let mut record = vec![
            parcel.to_string(),
            output.field_status[i].to_string(),
            output.percent_of_5yr_avg[i].to_string(),
        ];
        record.extend(output.values.row(i).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::info!(
        "wrote {} parcels to {}",
        output.parcels.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Season;
    use chrono::NaiveDate;
    use ndarray::array;

    fn sample_output() -> SeasonOutput {
        SeasonOutput {
            region: "California".to_string(),
            season: Season::Spring,
            year: 2018,
            parcels: vec![10, 20],
            field_status: vec![2, 10],
            percent_of_5yr_avg: vec![98.5, 41.0],
            values: array![[0.8, 0.7], [0.2, 0.2]],
            dates: vec![
                NaiveDate::from_ymd_opt(2018, 3, 6).unwrap(),
                NaiveDate::from_ymd_opt(2018, 3, 14).unwrap(),
            ],
        }
    }

    #[test]
    fn test_export_filename_carries_identity() {
        let output = sample_output();
        let path = export_path(Path::new("out"), &output);
        assert_eq!(path, Path::new("out/California_Spring_2018.csv"));
    }

    #[test]
    fn test_written_table_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_season(dir.path(), &sample_output()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,field_status,percent_5yr_avg,2018-03-06,2018-03-14"
        );
        assert_eq!(lines.next().unwrap(), "10,2,98.5,0.8,0.7");
        assert_eq!(lines.next().unwrap(), "20,10,41,0.2,0.2");
    }
}
