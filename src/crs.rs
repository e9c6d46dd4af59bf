//! Coordinate reference systems and the transforms between them.
//!
//! The projection math is done by PROJ. `Crs` only names the systems this
//! tool accepts. Coordinates use GIS axis order throughout: `x` is easting
//! or longitude, `y` is northing or latitude.

use crate::error::CrsError;
use geo::Coord;
use proj::Proj;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Crs {
    /// OSGB36 / British National Grid (EPSG:27700).
    BritishNationalGrid,
    /// WGS84 longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// Spherical web mercator in metres (EPSG:3857).
    WebMercator,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Crs::BritishNationalGrid => 27700,
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    fn from_epsg(code: u32) -> Option<Self> {
        match code {
            27700 => Some(Crs::BritishNationalGrid),
            4326 => Some(Crs::Wgs84),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    // Rejected before PROJ sees them
    fn check_input(self, c: Coord<f64>) -> Result<(), CrsError> {
        let in_range = match self {
            Crs::Wgs84 => c.y.abs() <= 90.0 && c.x.abs() <= 180.0,
            _ => true,
        };
        if c.x.is_finite() && c.y.is_finite() && in_range {
            Ok(())
        } else {
            Err(self.out_of_domain(c, None))
        }
    }

    fn out_of_domain(self, c: Coord<f64>, source: Option<proj::ProjError>) -> CrsError {
        CrsError::OutOfDomain {
            crs: self.to_string(),
            x: c.x,
            y: c.y,
            source,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    /// Accepts `EPSG:<code>` in any case, a bare code, or one of the
    /// aliases `OSGB36`, `BNG`, `WGS84`, `WEBMERCATOR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "OSGB36" | "BNG" => return Ok(Crs::BritishNationalGrid),
            "WGS84" => return Ok(Crs::Wgs84),
            "WEBMERCATOR" => return Ok(Crs::WebMercator),
            _ => {}
        }

        let code = upper.strip_prefix("EPSG:").unwrap_or(&upper);
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CrsError::Malformed(s.to_string()));
        }
        let code: u32 = code
            .parse()
            .map_err(|_| CrsError::Malformed(s.to_string()))?;

        Crs::from_epsg(code).ok_or_else(|| CrsError::Unknown(s.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub struct Transform {
    pub source: Crs,
    pub target: Crs,
    // None for identity
    proj: Option<Proj>,
}

impl Transform {
    pub fn new(source: Crs, target: Crs) -> Result<Self, CrsError> {
        let proj = if source == target {
            None
        } else {
            // new_known_crs normalizes axis order, so EPSG:4326 comes out lon/lat
            let proj = Proj::new_known_crs(&source.to_string(), &target.to_string(), None)
                .map_err(|source_err| CrsError::Create {
                    from: source.to_string(),
                    to: target.to_string(),
                    source: source_err,
                })?;
            Some(proj)
        };
        Ok(Self { source, target, proj })
    }

    pub fn inverse(&self) -> Result<Self, CrsError> {
        Self::new(self.target, self.source)
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    pub fn apply(&self, c: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        let Some(proj) = &self.proj else {
            return Ok(c);
        };
        self.source.check_input(c)?;

        let (x, y) = proj
            .convert((c.x, c.y))
            .map_err(|err| self.source.out_of_domain(c, Some(err)))?;
        if !(x.is_finite() && y.is_finite()) {
            return Err(self.target.out_of_domain(c, None));
        }
        Ok(Coord { x, y })
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}
