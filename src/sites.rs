//! Sensor reference catalog.
//!
//! The catalog is a small CSV shipped with the deployment (by default
//! `assets/sensores.csv`) mapping each sensor to its display name,
//! municipality, and coordinates. It is re-read on every request rather
//! than cached at startup, so a redeployed file takes effect immediately
//! and no module-level state survives between requests.

use std::io::Read;

use crate::error::AppError;
use crate::models::SensorSite;

// ---

/// Load the sensor catalog from `path`.
///
/// The file must carry the header `sensor_id,name,municipio,lat,lon`; any
/// missing column or unparseable field fails the whole load.
pub fn load_sites(path: &str) -> Result<Vec<SensorSite>, AppError> {
    // ---
    let reader = csv::Reader::from_path(path).map_err(|source| AppError::SiteFile {
        path: path.to_string(),
        source,
    })?;

    read_sites(reader).map_err(|source| AppError::SiteFile {
        path: path.to_string(),
        source,
    })
}

fn read_sites<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<SensorSite>, csv::Error> {
    // ---
    let mut sites = Vec::new();
    for record in reader.deserialize() {
        let site: SensorSite = record?;
        sites.push(site);
    }
    Ok(sites)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        // ---
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn test_catalog_parses() {
        // ---
        let data = "\
sensor_id,name,municipio,lat,lon
143390,Estación Abasolo,Abasolo,25.947264,-100.399025
50571,Estación Allende,Allende,25.215078,-99.9597
";
        let sites = read_sites(reader(data)).expect("parse");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].sensor_id, 143390);
        assert_eq!(sites[0].municipio, "Abasolo");
        assert_eq!(sites[1].lon, -99.9597);
    }

    #[test]
    fn test_bad_coordinate_fails_the_load() {
        // ---
        let data = "\
sensor_id,name,municipio,lat,lon
143390,Estación Abasolo,Abasolo,not-a-number,-100.399025
";
        assert!(read_sites(reader(data)).is_err());
    }

    #[test]
    fn test_missing_column_fails_the_load() {
        // ---
        let data = "\
sensor_id,name,municipio
143390,Estación Abasolo,Abasolo
";
        assert!(read_sites(reader(data)).is_err());
    }

    #[test]
    fn test_missing_file_is_a_site_file_error() {
        // ---
        let err = load_sites("definitely/not/here.csv").unwrap_err();
        match err {
            AppError::SiteFile { path, .. } => assert_eq!(path, "definitely/not/here.csv"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
