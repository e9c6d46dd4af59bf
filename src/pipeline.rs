use crate::aggregate::aggregate;
use crate::choropleth::assemble;
use crate::config::AppConfig;
use crate::crs::Crs;
use crate::error::{EmptyResult, PipelineError, Stage};
use crate::filter::{filter, Column};
use crate::join::join_places;
use crate::partition::{partition, CategoryPartition};
use crate::types::{AggregateRecord, CategorySet, ChoroplethRecord, Layer, PlaceRecord, ZoneRecord};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

// Everything here is in the target CRS
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub crs: Crs,
    pub places: Vec<PlaceRecord>,
    pub zones: Vec<ZoneRecord>,
    pub pair_count: usize,
    pub aggregates: Vec<AggregateRecord>,
    pub choropleth: Vec<ChoroplethRecord>,
    pub partitions: BTreeMap<String, CategoryPartition>,
    pub warnings: Vec<EmptyResult>,
}

pub struct Pipeline {
    categories: CategorySet,
    keep_columns: Vec<Column>,
    target_crs: Crs,
    parallel: bool,
}

impl Pipeline {
    pub fn new(categories: CategorySet, keep_columns: Vec<Column>, target_crs: Crs, parallel: bool) -> Self {
        Self {
            categories,
            keep_columns,
            target_crs,
            parallel,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.category_set()?,
            config.processing.keep_columns.clone(),
            config.processing.target_crs,
            config.processing.parallel,
        ))
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn run(&self, places: &Layer<PlaceRecord>, zones: &Layer<ZoneRecord>) -> Result<PipelineOutput, PipelineError> {
        let mut warnings = Vec::new();
        let mut note_empty = |stage: Stage, is_empty: bool| {
            if is_empty {
                warn!(%stage, "stage produced no records");
                warnings.push(EmptyResult { stage });
            }
        };

        // Only places in a configured category are reprojected
        let filtered = {
            let _span = info_span!("filter").entered();
            let filtered = filter(&places.records, &self.categories, &self.keep_columns);
            info!(input = places.len(), kept = filtered.len(), "filtered places");
            Layer::new(places.name.clone(), places.crs, filtered)
        };
        note_empty(Stage::Filter, filtered.is_empty());

        let (filtered, zones) = {
            let _span = info_span!("reproject", crs = %self.target_crs).entered();
            (filtered.to_crs(self.target_crs)?, zones.to_crs(self.target_crs)?)
        };
        let filtered = filtered.records;

        let pairs = {
            let _span = info_span!("join", parallel = self.parallel).entered();
            join_places(&filtered, &zones.records, self.parallel)
        };
        info!(pairs = pairs.len(), "joined places to zones");
        note_empty(Stage::Join, pairs.is_empty());

        let aggregates = {
            let _span = info_span!("aggregate").entered();
            aggregate(&pairs)
        };
        info!(groups = aggregates.len(), "aggregated counts");
        note_empty(Stage::Aggregate, aggregates.is_empty());

        let choropleth = {
            let _span = info_span!("assemble").entered();
            assemble(&zones.records, &aggregates)?
        };
        note_empty(Stage::Assemble, choropleth.is_empty());

        let partitions = partition(&filtered, &choropleth, self.categories.iter());

        Ok(PipelineOutput {
            crs: self.target_crs,
            places: filtered,
            zones: zones.records,
            pair_count: pairs.len(),
            aggregates,
            choropleth,
            partitions,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoinKeyError;
    use crate::types::fixtures::{categories, place, square};

    fn scenario() -> (Layer<PlaceRecord>, Layer<ZoneRecord>) {
        let places = vec![
            place("a", "Cafe", 0.1, 0.1),
            place("b", "Pub", 0.1, 0.1),
            place("c", "Cafe", 5.0, 5.0),
            place("d", "Cinema", 0.2, 0.2),
        ];
        let zones = vec![
            ZoneRecord::new("Z1", square((0.0, 0.0), (1.0, 1.0))),
            ZoneRecord::new("Z2", square((4.0, 4.0), (6.0, 6.0))),
            ZoneRecord::new("Z3", square((8.0, 8.0), (9.0, 9.0))),
        ];
        (Layer::new("poi", Crs::Wgs84, places), Layer::new("zones", Crs::Wgs84, zones))
    }

    fn pipeline(parallel: bool) -> Pipeline {
        Pipeline::new(categories(), Column::ALL.to_vec(), Crs::Wgs84, parallel)
    }

    #[test]
    fn test_scenario_end_to_end() {
        let (places, zones) = scenario();
        let out = pipeline(false).run(&places, &zones).unwrap();

        assert_eq!(out.places.len(), 3);
        assert_eq!(out.pair_count, 3);
        let aggregates: Vec<(&str, &str, u32)> = out
            .aggregates
            .iter()
            .map(|a| (a.category.as_str(), a.zone_key.as_str(), a.count))
            .collect();
        assert_eq!(aggregates, vec![("Cafe", "Z1", 1), ("Cafe", "Z2", 1), ("Pub", "Z1", 1)]);

        assert_eq!(out.choropleth.len(), 3);
        for row in &out.choropleth {
            assert!(zones.records.iter().any(|z| z.zone_key == row.zone_key));
            assert!(row.count >= 1);
        }

        assert_eq!(out.partitions["cafe"].places.len(), 2);
        assert_eq!(out.partitions["cafe"].choropleth.len(), 2);
        assert_eq!(out.partitions["bar"].choropleth.len(), 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_parallel_run_matches() {
        let (places, zones) = scenario();
        let sequential = pipeline(false).run(&places, &zones).unwrap();
        let parallel = pipeline(true).run(&places, &zones).unwrap();

        assert_eq!(sequential.aggregates, parallel.aggregates);
        assert_eq!(sequential.choropleth, parallel.choropleth);
    }

    #[test]
    fn test_empty_points() {
        let (_, zones) = scenario();
        let places = Layer::new("poi", Crs::Wgs84, Vec::new());

        let out = pipeline(false).run(&places, &zones).unwrap();

        assert_eq!(out.pair_count, 0);
        assert!(out.aggregates.is_empty());
        assert!(out.choropleth.is_empty());
        assert!(out.partitions.values().all(|p| p.places.is_empty() && p.choropleth.is_empty()));
        let stages: Vec<Stage> = out.warnings.iter().map(|w| w.stage).collect();
        assert_eq!(stages, vec![Stage::Filter, Stage::Join, Stage::Aggregate, Stage::Assemble]);
    }

    #[test]
    fn test_reprojects_to_target() {
        let places = Layer::new(
            "poi",
            Crs::BritishNationalGrid,
            vec![place("The Crown", "Pub", 530_000.0, 180_000.0)],
        );
        let zones = Layer::new(
            "zones",
            Crs::Wgs84,
            vec![ZoneRecord::new("Westminster", square((-0.2, 51.45), (-0.05, 51.55)))],
        );

        let out = pipeline(false).run(&places, &zones).unwrap();

        assert_eq!(out.crs, Crs::Wgs84);
        assert_eq!(out.choropleth.len(), 1);
        assert_eq!(out.choropleth[0].zone_key, "Westminster");
        assert!((out.places[0].geometry.x() - (-0.128)).abs() < 0.01);
    }

    #[test]
    fn test_reprojection_failure_aborts() {
        let (places, _) = scenario();
        let zones = Layer::new(
            "zones",
            Crs::Wgs84,
            vec![ZoneRecord::new("pole", square((0.0, 80.0), (1.0, 90.0)))],
        );
        let pipeline = Pipeline::new(categories(), Column::ALL.to_vec(), Crs::WebMercator, false);

        let err = pipeline.run(&places, &zones).unwrap_err();

        assert_eq!(err.stage(), Stage::Reproject);
        assert!(err.to_string().contains("zone `pole`"));
    }

    #[test]
    fn test_unrequested_category_never_reprojected() {
        let (mut places, zones) = scenario();
        // Outside web mercator's domain, but "Cinema" is not a configured category
        places.records.push(place("Polar Cinema", "Cinema", 0.0, 90.0));
        let pipeline = Pipeline::new(categories(), Column::ALL.to_vec(), Crs::WebMercator, false);

        let out = pipeline.run(&places, &zones).unwrap();

        assert_eq!(out.crs, Crs::WebMercator);
        assert_eq!(out.places.len(), 3);
        assert_eq!(out.pair_count, 3);
    }

    #[test]
    fn test_requested_category_out_of_domain_aborts() {
        let (mut places, zones) = scenario();
        places.records.push(place("Polar Cafe", "Cafe", 0.0, 90.0));
        let pipeline = Pipeline::new(categories(), Column::ALL.to_vec(), Crs::WebMercator, false);

        let err = pipeline.run(&places, &zones).unwrap_err();

        assert_eq!(err.stage(), Stage::Reproject);
        assert!(err.to_string().contains("place `Polar Cafe`"));
    }

    #[test]
    fn test_duplicate_zone_keys_abort() {
        let (places, _) = scenario();
        let zones = Layer::new(
            "zones",
            Crs::Wgs84,
            vec![
                ZoneRecord::new("Z1", square((0.0, 0.0), (1.0, 1.0))),
                ZoneRecord::new("z 1", square((4.0, 4.0), (6.0, 6.0))),
            ],
        );

        let err = pipeline(false).run(&places, &zones).unwrap_err();

        assert!(matches!(err, PipelineError::JoinKey(JoinKeyError::DuplicateZone { .. })));
    }
}
