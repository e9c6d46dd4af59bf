use crate::html::{address, popup_html, tooltip_html};
use crate::pipeline::PipelineOutput;
use crate::types::{Category, CategorySet, ChoroplethRecord, PlaceRecord};
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

fn feature(geometry: geojson::Value, properties: serde_json::Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: match properties {
            serde_json::Value::Object(map) => Some(map),
            _ => Some(JsonObject::new()),
        },
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn places_collection(places: &[PlaceRecord]) -> FeatureCollection {
    let features = places
        .iter()
        .map(|place| {
            let popup = popup_html(&place.name, &address(place), place.url.as_deref().unwrap_or(""));
            feature(
                geojson::Value::from(&place.geometry),
                json!({
                    "name": place.name,
                    "category": place.category,
                    "street_name": place.street_name,
                    "postcode": place.postcode,
                    "url": place.url,
                    "popup": popup,
                    "tooltip": tooltip_html(&place.name),
                }),
            )
        })
        .collect();
    collection(features)
}

pub fn choropleth_collection(rows: &[ChoroplethRecord], category: &Category) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|row| {
            feature(
                geojson::Value::from(&row.geometry),
                json!({
                    "zone_key": row.zone_key,
                    "category": row.category,
                    "count": row.count,
                    "color": category.color,
                }),
            )
        })
        .collect();
    collection(features)
}

/// Write per-category GeoJSON layers and the aggregate table into `dir`.
pub fn write_outputs(dir: &Path, categories: &CategorySet, output: &PipelineOutput) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    for category in categories.iter() {
        let Some(part) = output.partitions.get(&category.key) else {
            continue;
        };

        let points_path = dir.join(format!("{}_points.geojson", category.key));
        fs::write(&points_path, places_collection(&part.places).to_string())
            .with_context(|| format!("Failed to write {:?}", points_path))?;

        let choropleth_path = dir.join(format!("{}_choropleth.geojson", category.key));
        fs::write(&choropleth_path, choropleth_collection(&part.choropleth, category).to_string())
            .with_context(|| format!("Failed to write {:?}", choropleth_path))?;

        info!(category = %category.key, places = part.places.len(), zones = part.choropleth.len(), "wrote layers");
    }

    let csv_path = dir.join("aggregates.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("Failed to create {:?}", csv_path))?;
    for record in &output.aggregates {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}
