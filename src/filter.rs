use crate::types::{CategorySet, PlaceRecord};
use serde::Deserialize;

/// Optional place attributes that can be kept or dropped.
/// Category and geometry are always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Name,
    StreetName,
    Postcode,
    Url,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Name, Column::StreetName, Column::Postcode, Column::Url];
}

pub fn filter(records: &[PlaceRecord], categories: &CategorySet, keep_columns: &[Column]) -> Vec<PlaceRecord> {
    let keep = |column: Column| keep_columns.contains(&column);

    records
        .iter()
        .filter(|r| categories.contains_label(&r.category))
        .map(|r| PlaceRecord {
            name: if keep(Column::Name) { r.name.clone() } else { String::new() },
            category: r.category.clone(),
            street_name: r.street_name.clone().filter(|_| keep(Column::StreetName)),
            postcode: r.postcode.clone().filter(|_| keep(Column::Postcode)),
            url: r.url.clone().filter(|_| keep(Column::Url)),
            geometry: r.geometry,
        })
        .collect()
}
