use crate::types::{JoinPair, PlaceRecord, ZoneRecord};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::Point;
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;
use tracing::debug;

// Bounding box of one zone, pointing back at its position in the zone slice
struct ZoneEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// R-tree over zone bounding boxes, holding the zones it was built from.
///
/// `Z` is any owned or borrowed zone slice: the join borrows, the HTTP
/// service owns.
pub struct ZoneIndex<Z = Vec<ZoneRecord>> {
    zones: Z,
    tree: RTree<ZoneEnvelope>,
}

impl<Z: AsRef<[ZoneRecord]>> ZoneIndex<Z> {
    pub fn new(zones: Z) -> Self {
        let envelopes: Vec<ZoneEnvelope> = zones
            .as_ref()
            .iter()
            .enumerate()
            // Empty geometries have no bounding box and can contain nothing
            .filter_map(|(index, zone)| {
                let rect = zone.geometry.bounding_rect()?;
                Some(ZoneEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(envelopes),
            zones,
        }
    }

    pub fn zones(&self) -> &[ZoneRecord] {
        self.zones.as_ref()
    }

    /// Positions of the zones whose interior or boundary holds `point`,
    /// in ascending order.
    pub fn containing(&self, point: &Point<f64>) -> Vec<usize> {
        let zones = self.zones();
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| zones[i].geometry.coordinate_position(&point.0) != CoordPos::Outside)
            .collect();
        hits.sort_unstable();
        hits
    }
}

pub fn spatial_join(places: &[PlaceRecord], zones: &[ZoneRecord]) -> Vec<JoinPair> {
    join_places(places, zones, false)
}

/// Pair every place with every zone containing it.
///
/// Places outside all zones produce no pairs. A place inside several
/// overlapping zones produces one pair per zone. Pairs are ordered by place
/// position then zone position whether or not the work runs in parallel.
pub fn join_places(places: &[PlaceRecord], zones: &[ZoneRecord], parallel: bool) -> Vec<JoinPair> {
    let index = ZoneIndex::new(zones);

    let pairs_for = |(i, place): (usize, &PlaceRecord)| -> Vec<JoinPair> {
        index
            .containing(&place.geometry)
            .into_iter()
            .map(|z| JoinPair {
                place: i,
                zone: z,
                category: place.category.clone(),
                zone_key: zones[z].zone_key.clone(),
            })
            .collect()
    };

    let pairs: Vec<JoinPair> = if parallel {
        places.par_iter().enumerate().flat_map_iter(pairs_for).collect()
    } else {
        places.iter().enumerate().flat_map(pairs_for).collect()
    };

    let matched: HashSet<usize> = pairs.iter().map(|p| p.place).collect();
    debug!(
        places = places.len(),
        zones = zones.len(),
        pairs = pairs.len(),
        unmatched = places.len() - matched.len(),
        "spatial join complete"
    );

    pairs
}
