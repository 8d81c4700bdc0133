//! Common test fixtures: dataset names, WFS responses and sample features.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use wfs_common::{ColumnDefinition, FeatureTypeSchema, TableDefinition};

/// Dataset names used across the test suite.
pub mod datasets {
    /// A point dataset keyed by OBJECTID
    pub const AIRPORTS: &str = "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW";

    /// Catalogue package name publishing [`AIRPORTS`]
    pub const AIRPORTS_PACKAGE: &str = "bc-airports";

    /// A line dataset keyed by SEQUENCE_ID
    pub const ROADS: &str = "WHSE_BASEMAPPING.TRIM_TRANSPORTATION_LINES";

    /// A polygon dataset with no OBJECTID or SEQUENCE_ID
    pub const VEG: &str = "WHSE_FOREST_VEGETATION.VEG_COMP_LYR_R1_POLY";
}

/// `resultType=hits` response reporting `number_matched` features.
pub fn hits_xml(number_matched: u64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" numberMatched="{}" numberReturned="0" timeStamp="2024-01-01T00:00:00.000Z"/>"#,
        number_matched
    )
}

/// GetCapabilities response listing `names`, prefixed with `pub:`.
pub fn capabilities_xml(names: &[&str]) -> String {
    let feature_types: String = names
        .iter()
        .map(|n| format!("<FeatureType><Name>pub:{}</Name><Title>{}</Title></FeatureType>", n, n))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns="http://www.opengis.net/wfs/2.0" version="2.0.0">
<FeatureTypeList>{}</FeatureTypeList>
</wfs:WFS_Capabilities>"#,
        feature_types
    )
}

/// DescribeFeatureType JSON for a feature type with `properties` and an
/// optional geometry property.
pub fn describe_json(geometry_column: Option<&str>, properties: &[&str]) -> String {
    let mut declared: Vec<serde_json::Value> = properties
        .iter()
        .map(|p| json!({"name": p, "maxOccurs": 1, "minOccurs": 0, "nillable": true, "type": "xsd:string", "localType": "string"}))
        .collect();
    if let Some(geom) = geometry_column {
        declared.push(json!({"name": geom, "maxOccurs": 1, "minOccurs": 0, "nillable": true, "type": "gml:Point", "localType": "Point"}));
    }
    json!({
        "elementFormDefault": "qualified",
        "targetNamespace": "http://delius.gov.bc.ca/pub",
        "targetPrefix": "pub",
        "featureTypes": [{"typeName": "FEATURE", "properties": declared}]
    })
    .to_string()
}

/// Feature type schema with a `SHAPE` geometry column.
pub fn feature_type_schema(properties: &[&str]) -> FeatureTypeSchema {
    FeatureTypeSchema {
        geometry_column: Some("SHAPE".to_string()),
        geometry_type: Some("Point".to_string()),
        properties: properties.iter().map(|p| p.to_string()).collect(),
        property_types: properties
            .iter()
            .map(|p| (p.to_string(), "string".to_string()))
            .collect(),
    }
}

/// Catalogue definition matching [`airport_feature`] attributes.
pub fn airports_table_definition() -> TableDefinition {
    TableDefinition {
        schema: vec![
            ColumnDefinition::new("OBJECTID", "NUMBER").with_precision(10),
            ColumnDefinition::new("AIRPORT_NAME", "VARCHAR2").with_precision(100),
            ColumnDefinition {
                column_comments: Some("Date the record was last updated".to_string()),
                ..ColumnDefinition::new("WHEN_UPDATED", "DATE")
            },
            ColumnDefinition::new("SHAPE", "SDO_GEOMETRY"),
        ],
        comments: Some("Airports, heliports and water aerodromes in BC".to_string()),
    }
}

/// A feature with the given attributes and geometry.
pub fn feature(properties: serde_json::Value, geometry: Option<Value>) -> Feature {
    let properties: Option<JsonObject> = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    Feature {
        bbox: None,
        geometry: geometry.map(Geometry::new),
        id: None,
        properties,
        foreign_members: None,
    }
}

/// An airport feature in uppercase WFS attribute style.
pub fn airport_feature(object_id: u64, geometry: Option<Value>) -> Feature {
    feature(
        json!({
            "OBJECTID": object_id,
            "AIRPORT_NAME": format!("Airport {}", object_id),
            "WHEN_UPDATED": "2023-06-01Z",
            "SE_ANNO_CAD_DATA": null
        }),
        geometry,
    )
}

pub fn point(x: f64, y: f64) -> Value {
    Value::Point(vec![x, y])
}

pub fn point_z(x: f64, y: f64, z: f64) -> Value {
    Value::Point(vec![x, y, z])
}

pub fn line(coords: &[(f64, f64)]) -> Value {
    Value::LineString(coords.iter().map(|&(x, y)| vec![x, y]).collect())
}

/// Closed square polygon with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Value {
    Value::Polygon(vec![vec![
        vec![x, y],
        vec![x + size, y],
        vec![x + size, y + size],
        vec![x, y + size],
        vec![x, y],
    ]])
}

/// GeoJSON FeatureCollection body as GeoServer returns it.
pub fn feature_collection_json(features: Vec<Feature>) -> String {
    let number = features.len();
    let mut foreign_members = JsonObject::new();
    foreign_members.insert("numberMatched".to_string(), json!(number));
    foreign_members.insert("numberReturned".to_string(), json!(number));
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };
    serde_json::to_string(&collection).expect("FeatureCollection serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airport_feature_properties() {
        let f = airport_feature(7, Some(point(1.0, 2.0)));
        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["OBJECTID"], 7);
        assert!(f.geometry.is_some());
    }

    #[test]
    fn test_square_is_closed() {
        match square(0.0, 0.0, 1.0) {
            Value::Polygon(rings) => assert_eq!(rings[0].first(), rings[0].last()),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_hits_xml_contains_count() {
        assert!(hits_xml(25_000).contains(r#"numberMatched="25000""#));
    }
}
