use crate::config::{PointColumns, PointsInput, ZonesInput};
use crate::types::{Layer, PlaceRecord, ZoneRecord};
use anyhow::{anyhow, bail, Context, Result};
use csv::ReaderBuilder;
use geo::{MultiPolygon, Point};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Shapefile,
    GeoJson,
    Csv,
}

fn detect_format(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input file {:?} has no extension", path))?;

    match extension.as_str() {
        "shp" => Ok(Format::Shapefile),
        "json" | "geojson" => Ok(Format::GeoJson),
        "csv" => Ok(Format::Csv),
        _ => Err(anyhow!("Unsupported input format: {}", extension)),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn check_layer(expected: Option<&str>, found: &str, path: &Path) -> Result<()> {
    match expected {
        Some(expected) if expected != found => {
            bail!("Layer '{}' not found in {:?} (it holds '{}')", expected, path, found)
        }
        _ => Ok(()),
    }
}

/// Load the points layer and tag it with the configured CRS.
pub fn load_places(input: &PointsInput) -> Result<Layer<PlaceRecord>> {
    info!(path = ?input.path, "loading places");

    let (name, places) = match detect_format(&input.path)? {
        Format::GeoJson => load_geojson_places(input)?,
        Format::Shapefile => load_shapefile_places(input)?,
        Format::Csv => load_csv_places(input)?,
    };

    info!(layer = %name, places = places.len(), crs = %input.crs, "loaded places");
    Ok(Layer::new(name, input.crs, places))
}

/// Load the zones layer and tag it with the configured CRS.
pub fn load_zones(input: &ZonesInput) -> Result<Layer<ZoneRecord>> {
    info!(path = ?input.path, "loading zones");

    let zones = match detect_format(&input.path)? {
        Format::GeoJson => load_geojson_zones(input)?,
        Format::Shapefile => load_shapefile_zones(input)?,
        Format::Csv => bail!("Zones need polygon geometry; CSV is only supported for points"),
    };

    info!(zones = zones.len(), crs = %input.crs, "loaded zones");
    Ok(Layer::new(file_stem(&input.path), input.crs, zones))
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(anyhow!("GeoJSON must be a FeatureCollection")),
    }
}

fn json_string(props: Option<&JsonObject>, key: &str) -> Option<String> {
    match props?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dbase_string(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build a place from string attributes looked up by column name.
/// Returns `None` when the category is missing or blank.
fn build_place(columns: &PointColumns, point: Point<f64>, get: impl Fn(&str) -> Option<String>) -> Option<PlaceRecord> {
    // POI extracts carry plenty of unnamed features
    let name = get(&columns.name).unwrap_or_default();
    let category = get(&columns.category)?;

    let place = PlaceRecord::new(name, category, point).ok()?;
    Some(
        place
            .with_address(get(&columns.street_name), get(&columns.postcode))
            .with_url(get(&columns.url)),
    )
}

fn log_uncategorized(uncategorized: usize, path: &Path) {
    if uncategorized > 0 {
        debug!(uncategorized, path = ?path, "skipped places without a category");
    }
}

fn load_geojson_places(input: &PointsInput) -> Result<(String, Vec<PlaceRecord>)> {
    let collection = read_feature_collection(&input.path)?;

    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("name"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(&input.path));
    check_layer(input.layer.as_deref(), &name, &input.path)?;

    let mut places = Vec::new();
    let mut skipped = 0;
    let mut uncategorized = 0;

    for feature in collection.features {
        let point = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match geometry {
                    geo::Geometry::Point(p) => p,
                    _ => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            None => {
                skipped += 1;
                continue;
            }
        };

        let props = feature.properties.as_ref();
        match build_place(&input.columns, point, |key| json_string(props, key)) {
            Some(place) => places.push(place),
            None => uncategorized += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "skipped features without point geometry");
    }
    log_uncategorized(uncategorized, &input.path);
    Ok((name, places))
}

fn load_shapefile_places(input: &PointsInput) -> Result<(String, Vec<PlaceRecord>)> {
    let name = file_stem(&input.path);
    check_layer(input.layer.as_deref(), &name, &input.path)?;

    let mut reader = Reader::from_path(&input.path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.path))?;

    let mut places = Vec::new();
    let mut uncategorized = 0;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let point = match shape {
            shapefile::Shape::Point(p) => Point::new(p.x, p.y),
            shapefile::Shape::PointM(p) => Point::new(p.x, p.y),
            shapefile::Shape::PointZ(p) => Point::new(p.x, p.y),
            _ => continue, // Skip non-point shapes
        };

        match build_place(&input.columns, point, |key| dbase_string(&record, key)) {
            Some(place) => places.push(place),
            None => uncategorized += 1,
        }
    }

    log_uncategorized(uncategorized, &input.path);
    Ok((name, places))
}

fn load_csv_places(input: &PointsInput) -> Result<(String, Vec<PlaceRecord>)> {
    let name = file_stem(&input.path);
    check_layer(input.layer.as_deref(), &name, &input.path)?;

    let file = File::open(&input.path)
        .with_context(|| format!("Failed to open CSV file: {:?}", input.path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let x_idx = column(&input.columns.x)
        .ok_or_else(|| anyhow!("Coordinate column '{}' not found in CSV", input.columns.x))?;
    let y_idx = column(&input.columns.y)
        .ok_or_else(|| anyhow!("Coordinate column '{}' not found in CSV", input.columns.y))?;

    let mut places = Vec::new();
    let mut uncategorized = 0;

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let coordinate = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>()
                .with_context(|| format!("Row {}: invalid coordinate '{}'", i + 1, raw))
        };
        let point = Point::new(coordinate(x_idx)?, coordinate(y_idx)?);

        let get = |key: &str| {
            column(key)
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match build_place(&input.columns, point, get) {
            Some(place) => places.push(place),
            None => uncategorized += 1,
        }
    }

    log_uncategorized(uncategorized, &input.path);
    Ok((name, places))
}

fn load_geojson_zones(input: &ZonesInput) -> Result<Vec<ZoneRecord>> {
    let collection = read_feature_collection(&input.path)?;
    let mut zones = Vec::new();

    for feature in collection.features {
        // 1. Get key
        let key = match json_string(feature.properties.as_ref(), &input.key_column) {
            Some(key) => key,
            None => continue, // Skip if no key or not string/number
        };

        // 2. Get geometry
        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        zones.push(ZoneRecord::new(key, geometry));
    }

    Ok(zones)
}

fn load_shapefile_zones(input: &ZonesInput) -> Result<Vec<ZoneRecord>> {
    let mut reader = Reader::from_path(&input.path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.path))?;

    let mut zones = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        if record.get(&input.key_column).is_none() {
            bail!("Key column '{}' not found in Shapefile", input.key_column);
        }
        let key = match dbase_string(&record, &input.key_column) {
            Some(key) => key,
            None => continue, // Skip if null
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // Skip non-polygon shapes
        };

        zones.push(ZoneRecord::new(key, geometry));
    }

    Ok(zones)
}
