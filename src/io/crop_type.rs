use crate::types::{FamResult, ParcelId};
use csv::ReaderBuilder;
use std::collections::BTreeSet;
use std::path::Path;

/// Externally supplied perennial crop-type reference.
///
/// Backed by a table mapping parcel id to a crop-group label; any parcel
/// with a non-empty label is treated as a known perennial. Parcel ids may
/// change when field boundaries are redrawn, so the table is reloaded per
/// run and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropTypeReference {
    perennial: BTreeSet<ParcelId>,
}

impl CropTypeReference {
    /// Reference with no perennial parcels
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = ParcelId>>(ids: I) -> Self {
        Self {
            perennial: ids.into_iter().collect(),
        }
    }

    /// Load from a CSV table with `id` and `crop_group` columns
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> FamResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut perennial = BTreeSet::new();
        for record in reader.records() {
            let record = record?;
            let id: ParcelId = match record.get(0).map(str::trim) {
                Some(field) if !field.is_empty() => match field.parse() {
                    Ok(id) => id,
                    Err(_) => continue,
                },
                _ => continue,
            };
            let group = record.get(1).map(str::trim).unwrap_or("");
            if !group.is_empty() {
                perennial.insert(id);
            }
        }
        log::info!(
            "loaded crop-type reference: {} perennial parcels from {}",
            perennial.len(),
            path.as_ref().display()
        );
        Ok(Self { perennial })
    }

    pub fn is_perennial(&self, parcel: ParcelId) -> bool {
        self.perennial.contains(&parcel)
    }

    pub fn len(&self) -> usize {
        self.perennial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perennial.is_empty()
    }

    /// Restrict membership to a common parcel index
    pub fn restrict(&self, common: &[ParcelId]) -> Self {
        Self {
            perennial: common
                .iter()
                .copied()
                .filter(|p| self.perennial.contains(p))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_non_empty_group_is_perennial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,crop_group").unwrap();
        writeln!(file, "10,Almonds").unwrap();
        writeln!(file, "20,").unwrap();
        writeln!(file, "30,Vineyard").unwrap();
        file.flush().unwrap();

        let reference = CropTypeReference::from_csv_path(file.path()).unwrap();
        assert!(reference.is_perennial(10));
        assert!(!reference.is_perennial(20));
        assert!(reference.is_perennial(30));
        assert_eq!(reference.len(), 2);
    }

    #[test]
    fn test_restrict_to_common_index() {
        let reference = CropTypeReference::from_ids([10, 20, 30]);
        let restricted = reference.restrict(&[20, 40]);
        assert!(restricted.is_perennial(20));
        assert!(!restricted.is_perennial(10));
        assert!(!restricted.is_perennial(30));
    }
}
