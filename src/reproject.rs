use crate::crs::{Crs, Transform};
use crate::error::{CrsError, PipelineError, Stage};
use crate::types::{Layer, PlaceRecord, ZoneRecord};
use geo::{MapCoords, Point};
use tracing::debug;

/// Records whose geometry can be moved between coordinate systems.
pub trait Reproject: Sized {
    fn describe(&self) -> String;

    fn reprojected(&self, transform: &Transform) -> Result<Self, CrsError>;
}

impl Reproject for PlaceRecord {
    fn describe(&self) -> String {
        format!("place `{}`", self.name)
    }

    fn reprojected(&self, transform: &Transform) -> Result<Self, CrsError> {
        let coord = transform.apply(self.geometry.0)?;
        Ok(Self {
            geometry: Point(coord),
            ..self.clone()
        })
    }
}

impl Reproject for ZoneRecord {
    fn describe(&self) -> String {
        format!("zone `{}`", self.zone_key)
    }

    fn reprojected(&self, transform: &Transform) -> Result<Self, CrsError> {
        let geometry = self.geometry.try_map_coords(|c| transform.apply(c))?;
        Ok(Self {
            zone_key: self.zone_key.clone(),
            geometry,
        })
    }
}

/// Transform every record from `source` to `target`. The first record that
/// cannot be transformed aborts the whole batch.
pub fn reproject<T: Reproject>(records: &[T], source: Crs, target: Crs) -> Result<Vec<T>, PipelineError> {
    let transform = Transform::new(source, target).map_err(|err| PipelineError::Crs {
        stage: Stage::Reproject,
        record: format!("transform {source} -> {target}"),
        source: err,
    })?;
    debug!(%source, %target, records = records.len(), "reprojecting");

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .reprojected(&transform)
                .map_err(|err| PipelineError::Crs {
                    stage: Stage::Reproject,
                    record: format!("#{} {}", i, record.describe()),
                    source: err,
                })
        })
        .collect()
}

impl<T: Reproject> Layer<T> {
    /// Reproject from the layer's own CRS tag into `target`.
    pub fn to_crs(&self, target: Crs) -> Result<Layer<T>, PipelineError> {
        let records = reproject(&self.records, self.crs, target)?;
        Ok(Layer::new(self.name.clone(), target, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{place, square};
    use geo::{Coord, CoordsIter};

    #[test]
    fn test_attributes_pass_through() {
        let record = place("The Crown", "Pub", 530_000.0, 180_000.0)
            .with_address(Some("High Street".to_string()), Some("SW1A 1AA".to_string()))
            .with_url(Some("https://example.org".to_string()));

        let out = reproject(&[record.clone()], Crs::BritishNationalGrid, Crs::Wgs84).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, record.name);
        assert_eq!(out[0].street_name, record.street_name);
        assert_eq!(out[0].postcode, record.postcode);
        assert_eq!(out[0].url, record.url);
        assert!((out[0].geometry.x() - (-0.128)).abs() < 0.01);
        assert!((out[0].geometry.y() - 51.504).abs() < 0.01);
    }

    #[test]
    fn test_zone_round_trip() {
        let zone = ZoneRecord::new("E01000001", square((529_000.0, 179_000.0), (531_000.0, 181_000.0)));
        let layer = Layer::new("zones", Crs::BritishNationalGrid, vec![zone.clone()]);

        let there = layer.to_crs(Crs::Wgs84).unwrap();
        assert_eq!(there.crs, Crs::Wgs84);
        let back = there.to_crs(Crs::BritishNationalGrid).unwrap();

        let original: Vec<Coord<f64>> = zone.geometry.coords_iter().collect();
        let round_trip: Vec<Coord<f64>> = back.records[0].geometry.coords_iter().collect();
        assert_eq!(original.len(), round_trip.len());
        for (a, b) in original.iter().zip(&round_trip) {
            assert!((a.x - b.x).abs() < 0.05);
            assert!((a.y - b.y).abs() < 0.05);
        }
    }

    #[test]
    fn test_failure_names_record() {
        let records = vec![place("ok", "Cafe", 0.0, 0.0), place("North Pole Cafe", "Cafe", 0.0, 90.0)];

        let err = reproject(&records, Crs::Wgs84, Crs::WebMercator).unwrap_err();

        assert_eq!(err.stage(), Stage::Reproject);
        assert!(err.to_string().contains("#1 place `North Pole Cafe`"));
    }

    #[test]
    fn test_empty_input() {
        let out: Vec<PlaceRecord> = reproject(&[], Crs::BritishNationalGrid, Crs::Wgs84).unwrap();
        assert!(out.is_empty());
    }
}
