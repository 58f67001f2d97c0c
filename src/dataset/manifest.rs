//! CSV label manifest parsing
//!
//! The manifest is a tabular file with one row per sample:
//!
//! ```text
//! image_names,emergency_or_not
//! 1503.jpg,0
//! 1420.jpg,1
//! ```
//!
//! Labels must be 0 (non-emergency) or 1 (emergency); anything else is
//! rejected before any image is touched.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::error::{EmergencyVehiclesError, Result};

/// A single row of the label manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Image file name, relative to the image directory
    pub image_names: String,
    /// Binary label: 0 = non-emergency, 1 = emergency
    pub emergency_or_not: u8,
}

impl VehicleRecord {
    /// The label as a class index
    pub fn label(&self) -> usize {
        self.emergency_or_not as usize
    }
}

/// Read and validate the manifest from a CSV file on disk
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleRecord>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EmergencyVehiclesError::PathNotFound(path.to_path_buf()));
    }

    let reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = read_records(reader)?;

    info!("Read {} manifest rows from {:?}", records.len(), path);

    Ok(records)
}

/// Read and validate manifest records from any reader
pub fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<VehicleRecord>> {
    let mut records = Vec::new();

    for (row, result) in reader.deserialize::<VehicleRecord>().enumerate() {
        let record = result?;

        if record.emergency_or_not > 1 {
            return Err(EmergencyVehiclesError::Manifest(format!(
                "row {}: label {} for '{}' is not binary (expected 0 or 1)",
                row + 1,
                record.emergency_or_not,
                record.image_names
            )));
        }

        if record.image_names.is_empty() {
            return Err(EmergencyVehiclesError::Manifest(format!(
                "row {}: empty image name",
                row + 1
            )));
        }

        records.push(record);
    }

    if records.is_empty() {
        return Err(EmergencyVehiclesError::Manifest(
            "manifest contains no rows".to_string(),
        ));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_from(data: &str) -> csv::Reader<&[u8]> {
        ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn test_read_valid_manifest() {
        let data = "image_names,emergency_or_not\n1503.jpg,0\n1420.jpg,1\n";
        let records = read_records(reader_from(data)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_names, "1503.jpg");
        assert_eq!(records[0].label(), 0);
        assert_eq!(records[1].label(), 1);
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let data = "image_names,emergency_or_not\n1503.jpg,2\n";
        let result = read_records(reader_from(data));

        assert!(matches!(
            result,
            Err(EmergencyVehiclesError::Manifest(_))
        ));
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let data = "image_names,emergency_or_not\n";
        let result = read_records(reader_from(data));

        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_row_rejected() {
        let data = "image_names,emergency_or_not\n1503.jpg,not_a_number\n";
        let result = read_records(reader_from(data));

        assert!(matches!(result, Err(EmergencyVehiclesError::Csv(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = read_manifest("/nonexistent/emergency_train.csv");
        assert!(matches!(
            result,
            Err(EmergencyVehiclesError::PathNotFound(_))
        ));
    }
}
