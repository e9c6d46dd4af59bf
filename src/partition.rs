use crate::types::{Category, ChoroplethRecord, PlaceRecord};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPartition {
    pub places: Vec<PlaceRecord>,
    pub choropleth: Vec<ChoroplethRecord>,
}

pub fn partition<'a>(
    places: &[PlaceRecord],
    choropleth: &[ChoroplethRecord],
    categories: impl IntoIterator<Item = &'a Category>,
) -> BTreeMap<String, CategoryPartition> {
    categories
        .into_iter()
        .map(|category| {
            let subset = CategoryPartition {
                places: places
                    .iter()
                    .filter(|p| p.category == category.label)
                    .cloned()
                    .collect(),
                choropleth: choropleth
                    .iter()
                    .filter(|r| r.category == category.label)
                    .cloned()
                    .collect(),
            };
            (category.key.clone(), subset)
        })
        .collect()
}
