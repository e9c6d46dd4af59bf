use crate::crs::Crs;
use crate::filter::Column;
use crate::types::{Category, CategorySet};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub processing: ProcessingConfig,
    pub categories: Vec<Category>,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub points: PointsInput,
    pub zones: ZonesInput,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PointsInput {
    pub path: PathBuf,
    // Must match the GeoJSON `name` member or the file stem when set
    pub layer: Option<String>,
    pub crs: Crs,
    #[serde(default)]
    pub columns: PointColumns,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PointColumns {
    pub name: String,
    pub category: String,
    pub street_name: String,
    pub postcode: String,
    pub url: String,
    // CSV coordinate columns
    pub x: String,
    pub y: String,
}

impl Default for PointColumns {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            category: "classname".to_string(),
            street_name: "street_name".to_string(),
            postcode: "postcode".to_string(),
            url: "url".to_string(),
            x: "feature_easting".to_string(),
            y: "feature_northing".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZonesInput {
    pub path: PathBuf,
    pub crs: Crs,
    pub key_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    pub target_crs: Crs,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "all_columns")]
    pub keep_columns: Vec<Column>,
}

fn all_columns() -> Vec<Column> {
    Column::ALL.to_vec()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.category_set()?;
        Ok(config)
    }

    pub fn category_set(&self) -> Result<CategorySet> {
        CategorySet::new(self.categories.clone()).context("Invalid [[categories]] configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        [input.points]
        path = "data/poi.geojson"
        layer = "Points of Interest 2023_06"
        crs = "EPSG:27700"

        [input.zones]
        path = "data/lsoa.shp"
        crs = "epsg:27700"
        key_column = "lsoa11nmw"

        [processing]
        target_crs = "EPSG:4326"
        parallel = true

        [[categories]]
        key = "bar"
        label = "Pubs, Bars and Inns"
        color = "#d95f0e"

        [[categories]]
        key = "cafe"
        label = "Cafes, Snack Bars and Tea Rooms"
        color = "#8c510a"

        [output]
        dir = "output"

        [server]
        port = 3000
    "##;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.input.points.crs, Crs::BritishNationalGrid);
        assert_eq!(config.input.points.layer.as_deref(), Some("Points of Interest 2023_06"));
        assert_eq!(config.input.points.columns, PointColumns::default());
        assert_eq!(config.input.zones.key_column, "lsoa11nmw");
        assert_eq!(config.processing.target_crs, Crs::Wgs84);
        assert!(config.processing.parallel);
        assert_eq!(config.processing.keep_columns, Column::ALL.to_vec());
        assert_eq!(config.category_set().unwrap().len(), 2);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_repository_config_parses() {
        let config = AppConfig::from_toml(include_str!("../config.toml")).unwrap();
        assert_eq!(config.input.zones.crs, Crs::BritishNationalGrid);
        assert_eq!(config.categories[0].label, "Pubs, Bars and Inns");
    }

    #[test]
    fn test_column_overrides() {
        let toml = SAMPLE.replace(
            "crs = \"EPSG:27700\"\n",
            "crs = \"EPSG:27700\"\n[input.points.columns]\ncategory = \"class\"\n",
        );
        let config = AppConfig::from_toml(&toml).unwrap();
        assert_eq!(config.input.points.columns.category, "class");
        assert_eq!(config.input.points.columns.name, "name");
    }

    #[test]
    fn test_unknown_crs_rejected() {
        let toml = SAMPLE.replace("EPSG:4326", "EPSG:1234");
        let err = AppConfig::from_toml(&toml).unwrap_err();
        assert!(format!("{:#}", err).contains("EPSG:1234"));
    }

    #[test]
    fn test_crs_is_required() {
        let toml = SAMPLE.replace("target_crs = \"EPSG:4326\"", "");
        assert!(AppConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn test_duplicate_categories_rejected() {
        let toml = SAMPLE.replace("key = \"cafe\"", "key = \"bar\"");
        assert!(AppConfig::from_toml(&toml).is_err());
    }
}
