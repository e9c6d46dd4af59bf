use crate::crs::Crs;
use anyhow::{bail, Result};
use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    pub name: String,
    // Raw value of the source classification column
    pub category: String,
    pub street_name: Option<String>,
    pub postcode: Option<String>,
    pub url: Option<String>,
    pub geometry: Point<f64>,
}

impl PlaceRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>, geometry: Point<f64>) -> Result<Self> {
        let name = name.into();
        let category = category.into();
        if category.trim().is_empty() {
            bail!("Place '{}' has an empty category", name);
        }
        Ok(Self {
            name,
            category,
            street_name: None,
            postcode: None,
            url: None,
            geometry,
        })
    }

    pub fn with_address(mut self, street_name: Option<String>, postcode: Option<String>) -> Self {
        self.street_name = street_name;
        self.postcode = postcode;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub zone_key: String,
    pub geometry: MultiPolygon<f64>,
}

impl ZoneRecord {
    pub fn new(zone_key: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            zone_key: zone_key.into(),
            geometry,
        }
    }
}

/// A collection of records tagged with the CRS its coordinates are in.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<T> {
    pub name: String,
    pub crs: Crs,
    pub records: Vec<T>,
}

impl<T> Layer<T> {
    pub fn new(name: impl Into<String>, crs: Crs, records: Vec<T>) -> Self {
        Self {
            name: name.into(),
            crs,
            records,
        }
    }

    /// Replace the CRS tag without touching coordinates.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A place found inside a zone. `place` and `zone` index the joined inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPair {
    pub place: usize,
    pub zone: usize,
    pub category: String,
    pub zone_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRecord {
    pub category: String,
    pub zone_key: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethRecord {
    pub zone_key: String,
    pub geometry: MultiPolygon<f64>,
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Category {
    pub key: String,   // Short id used in file names and URLs
    pub label: String, // Value of the category column in the source data
    pub color: String, // Hex code
}

// Configuration order is kept
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut labels = HashSet::new();
        for category in &categories {
            if category.key.trim().is_empty() || category.label.trim().is_empty() {
                bail!("Category keys and labels must not be empty");
            }
            if !keys.insert(category.key.as_str()) {
                bail!("Duplicate category key '{}'", category.key);
            }
            if !labels.insert(category.label.as_str()) {
                bail!("Duplicate category label '{}'", category.label);
            }
        }
        Ok(Self { categories })
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.categories.iter().any(|c| c.label == label)
    }

    pub fn by_key(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    pub fn by_label(&self, label: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
