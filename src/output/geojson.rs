//! GeoJSON feature collections
//!
//! Turns a dataset response of the form `{"<dataset>": [record, ...]}` into a
//! `FeatureCollection` built from one geometry field of each record.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde_json::{json, Map};

/// Default record field holding the geometry
pub const DEFAULT_GEOMETRY_FIELD: &str = "regionGeometry";

/// Build a `FeatureCollection` from `body[dataset_name][*][geometry_field]`.
///
/// Records with a null or missing geometry are skipped. Values that are
/// already a `Feature` are kept as they are; anything else becomes the
/// geometry of a new feature with empty properties.
pub fn feature_collection(
    body: &JsonValue,
    dataset_name: &str,
    geometry_field: &str,
) -> Result<JsonValue> {
    let records = body
        .get(dataset_name)
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::decode(format!("response has no `{dataset_name}` array")))?;

    let features: Vec<JsonValue> = records
        .iter()
        .filter_map(|record| record.get(geometry_field))
        .filter(|geometry| !geometry.is_null())
        .map(to_feature)
        .collect();

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

fn to_feature(value: &JsonValue) -> JsonValue {
    if value.get("type").and_then(JsonValue::as_str) == Some("Feature") {
        return value.clone();
    }
    json!({
        "type": "Feature",
        "geometry": value,
        "properties": JsonValue::Object(Map::new()),
    })
}
