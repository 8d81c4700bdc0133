//! Geometry shapes a target table can be provisioned with.

use geojson::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base geometry kind, without dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryKind {
    /// Kind of a GeoJSON geometry value. Collections have no kind.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Point(_) => Some(Self::Point),
            Value::MultiPoint(_) => Some(Self::MultiPoint),
            Value::LineString(_) => Some(Self::LineString),
            Value::MultiLineString(_) => Some(Self::MultiLineString),
            Value::Polygon(_) => Some(Self::Polygon),
            Value::MultiPolygon(_) => Some(Self::MultiPolygon),
            Value::GeometryCollection(_) => None,
        }
    }

    /// The multi-part kind able to hold this kind.
    pub fn multi(self) -> Self {
        match self {
            Self::Point | Self::MultiPoint => Self::MultiPoint,
            Self::LineString | Self::MultiLineString => Self::MultiLineString,
            Self::Polygon | Self::MultiPolygon => Self::MultiPolygon,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::MultiPoint => "MULTIPOINT",
            Self::LineString => "LINESTRING",
            Self::MultiLineString => "MULTILINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPolygon => "MULTIPOLYGON",
        }
    }
}

/// Geometry kind plus Z flag, fixed for a table's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryShape {
    pub kind: GeometryKind,
    pub has_z: bool,
}

impl GeometryShape {
    pub fn new(kind: GeometryKind, has_z: bool) -> Self {
        Self { kind, has_z }
    }

    /// Shape of the storage column: loaded geometries are always multi-part.
    pub fn storage_shape(&self) -> Self {
        Self::new(self.kind.multi(), self.has_z)
    }

    /// PostGIS typmod name, e.g. `MULTIPOLYGON` or `MULTILINESTRINGZ`.
    pub fn postgis_type(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeometryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), if self.has_z { "Z" } else { "" })
    }
}

impl FromStr for GeometryShape {
    type Err = ShapeParseError;

    /// Accepts `POLYGON`, `MultiLineStringZ`, `POINT Z` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        let (base, has_z) = match compact.strip_suffix('Z') {
            Some(base) => (base, true),
            None => (compact.as_str(), false),
        };

        let kind = match base {
            "POINT" => GeometryKind::Point,
            "MULTIPOINT" => GeometryKind::MultiPoint,
            "LINESTRING" => GeometryKind::LineString,
            "MULTILINESTRING" => GeometryKind::MultiLineString,
            "POLYGON" => GeometryKind::Polygon,
            "MULTIPOLYGON" => GeometryKind::MultiPolygon,
            _ => return Err(ShapeParseError(s.to_string())),
        };

        Ok(Self::new(kind, has_z))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Geometry type {0} is not supported")]
pub struct ShapeParseError(pub String);

/// Whether a geometry value carries a third coordinate.
///
/// Checks the first position only; GeoJSON geometries do not mix dimensions.
pub fn value_has_z(value: &Value) -> bool {
    let first = match value {
        Value::Point(p) => Some(p),
        Value::MultiPoint(points) => points.first(),
        Value::LineString(line) => line.first(),
        Value::MultiLineString(lines) => lines.first().and_then(|l| l.first()),
        Value::Polygon(rings) => rings.first().and_then(|r| r.first()),
        Value::MultiPolygon(polygons) => polygons
            .first()
            .and_then(|p| p.first())
            .and_then(|r| r.first()),
        Value::GeometryCollection(geometries) => {
            return geometries.iter().any(|g| value_has_z(&g.value));
        }
    };
    first.map(|position| position.len() >= 3).unwrap_or(false)
}
