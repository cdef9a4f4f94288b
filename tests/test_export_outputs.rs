use fallowmap::io::export;
use fallowmap::{
    CropTypeReference, DateLadder, FamInputs, FamPipeline, Observation, RegionProfile, Thresholds,
    LADDER_LEN,
};
use std::collections::BTreeMap;

fn inputs_for(years: &[i32]) -> FamInputs {
    let mut observations = BTreeMap::new();
    for &year in years {
        let ladder = DateLadder::for_year(year).unwrap();
        let obs: Vec<Observation> = ladder
            .dates()
            .iter()
            .flat_map(|&date| {
                [
                    Observation {
                        parcel: 10,
                        date,
                        ndvi: 0.2,
                    },
                    Observation {
                        parcel: 20,
                        date,
                        ndvi: 0.8,
                    },
                ]
            })
            .collect();
        observations.insert(year, obs);
    }
    FamInputs {
        observations,
        crop_types: CropTypeReference::empty(),
        cache_dir: None,
    }
}

#[test]
fn test_export_files_keyed_by_region_season_year() {
    let profile = RegionProfile {
        historical_years: vec![2008, 2009],
        reduction_years: None,
        export_years: vec![2018, 2019],
        ..RegionProfile::california()
    };
    let mut inputs = inputs_for(&[2008, 2009, 2018, 2019]);
    inputs.crop_types = CropTypeReference::from_ids([20]);

    let outputs = FamPipeline::new(profile, Thresholds::default())
        .run(&inputs)
        .unwrap();
    assert_eq!(outputs.len(), 4);

    let dir = tempfile::tempdir().unwrap();
    for output in &outputs {
        export::write_season(dir.path(), output).unwrap();
    }
    for name in [
        "California_Spring_2018.csv",
        "California_Summer_2018.csv",
        "California_Spring_2019.csv",
        "California_Summer_2019.csv",
    ] {
        assert!(dir.path().join(name).exists(), "missing {}", name);
    }

    let spring = std::fs::read_to_string(dir.path().join("California_Spring_2018.csv")).unwrap();
    let header = spring.lines().next().unwrap();
    assert!(header.starts_with("id,field_status,percent_5yr_avg,"));
    // spring window carries 11 ladder dates
    assert_eq!(header.split(',').count(), 3 + 11);
    // one data row per surviving parcel
    assert_eq!(spring.lines().count(), 1 + 2);
}

#[test]
fn test_flat_series_survive_builder_for_every_year() {
    // every parcel observed on every rung: nothing is dropped, and the
    // dense series carry exactly one value per ladder position
    let inputs = inputs_for(&[2008]);
    let builder = fallowmap::SeriesBuilder::new();
    let table = builder.build(&inputs.observations[&2008], 2008).unwrap();
    assert_eq!(table.parcels(), &[10, 20]);
    assert_eq!(table.values().ncols(), LADDER_LEN);
}
