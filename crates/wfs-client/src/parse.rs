//! Parsing of WFS response bodies.

use geojson::{Feature, GeoJson};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use wfs_common::{FeatureTypeSchema, LoadError, LoadResult};

/// Read `numberMatched` from a `resultType=hits` response.
///
/// GeoServer answers hits requests with an empty `wfs:FeatureCollection`
/// element whatever `outputFormat` was asked for.
pub fn parse_number_matched(xml: &str, context: &str) -> LoadResult<u64> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"FeatureCollection" =>
            {
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| LoadError::parse(context, err))?;
                    if attr.key.local_name().as_ref() == b"numberMatched" {
                        let value = attr
                            .unescape_value()
                            .map_err(|err| LoadError::parse(context, err))?;
                        return value.trim().parse().map_err(|_| {
                            LoadError::parse(context, format!("numberMatched is not a count: {value}"))
                        });
                    }
                }
                return Err(LoadError::parse(context, "FeatureCollection has no numberMatched attribute"));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::parse(
                    context,
                    format!("XML parsing error at position {}: {:?}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Err(LoadError::parse(context, "no FeatureCollection element in response"))
}

/// Feature type names from a GetCapabilities document, prefix stripped.
pub fn parse_feature_type_names(xml: &str) -> LoadResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut names = Vec::new();
    let mut in_feature_type = false;
    let mut in_name = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"FeatureType" => in_feature_type = true,
                b"Name" if in_feature_type => in_name = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_name => {
                let text = t
                    .unescape()
                    .map_err(|err| LoadError::parse("GetCapabilities", err))?;
                let name = match text.split_once(':') {
                    Some((_, local)) => local.to_string(),
                    None => text.to_string(),
                };
                names.push(name);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"FeatureType" => in_feature_type = false,
                b"Name" => in_name = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::parse(
                    "GetCapabilities",
                    format!("XML parsing error at position {}: {:?}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    names.sort();
    names.dedup();
    Ok(names)
}

/// Features of a GetFeature JSON response.
pub fn parse_feature_collection(body: &str, context: &str) -> LoadResult<Vec<Feature>> {
    match body.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => Ok(collection.features),
        Ok(GeoJson::Feature(feature)) => Ok(vec![feature]),
        Ok(GeoJson::Geometry(_)) => Err(LoadError::parse(
            context,
            "expected a FeatureCollection, got a bare geometry",
        )),
        Err(err) => Err(LoadError::parse(context, err)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeResponse {
    #[serde(default)]
    feature_types: Vec<DescribedType>,
}

#[derive(Debug, Deserialize)]
struct DescribedType {
    #[serde(default)]
    properties: Vec<DescribedProperty>,
}

#[derive(Debug, Deserialize)]
struct DescribedProperty {
    name: String,
    #[serde(rename = "type", default)]
    type_: String,
    #[serde(rename = "localType", default)]
    local_type: String,
}

/// Schema from a JSON DescribeFeatureType response.
///
/// Properties typed in the `gml:` namespace are geometries; the first one
/// becomes the geometry column and all others keep their declared order.
pub fn parse_feature_type_schema(body: &str, context: &str) -> LoadResult<FeatureTypeSchema> {
    let response: DescribeResponse =
        serde_json::from_str(body).map_err(|err| LoadError::parse(context, err))?;
    let described = response
        .feature_types
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::parse(context, "no featureTypes in DescribeFeatureType response"))?;

    let mut schema = FeatureTypeSchema::default();
    for property in described.properties {
        if property.type_.starts_with("gml:") {
            if schema.geometry_column.is_none() {
                schema.geometry_column = Some(property.name);
                schema.geometry_type = Some(property.local_type);
            }
        } else {
            schema
                .property_types
                .insert(property.name.clone(), property.local_type);
            schema.properties.push(property.name);
        }
    }
    Ok(schema)
}
