//! Geometry helpers for feature records.
//!
//! Two shapes appear in the wild. Point layers (alerts) deliver a separate
//! `geometry` object of `{x, y}` next to the attributes. Polyline layers
//! (congestion) embed the path in an attribute as a JSON-encoded string of
//! `[{"x": …, "y": …}, …]` points. Both are WGS84 longitude/latitude.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::Record;

use super::error::GisError;

/// A WGS84 coordinate pair: `x` is longitude, `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Fold a point `geometry` object into the record's `x`/`y` attributes.
///
/// Only applies when the geometry is an object with numeric `x` and `y`
/// and the record carries neither attribute yet; records that already have
/// either one are left entirely alone so the two sources never mix. The
/// original JSON number values are copied verbatim.
pub(crate) fn merge_point_geometry(record: &mut Record, geometry: Option<&Value>) {
    let Some(Value::Object(geom)) = geometry else {
        return;
    };
    if record.has_field("x") || record.has_field("y") {
        return;
    }
    let (Some(x), Some(y)) = (geom.get("x"), geom.get("y")) else {
        return;
    };
    if !x.is_number() || !y.is_number() {
        return;
    }
    record.set("x", x.clone());
    record.set("y", y.clone());
}

/// Decode a polyline attribute into its points.
///
/// Accepts the field as a JSON-encoded string (the usual wire form) or as
/// an already-decoded array. Decoding is strict JSON, never any form of
/// code evaluation. A missing, null, or malformed field is a
/// [`GisError::Schema`].
pub fn parse_line_field(record: &Record, field: &str) -> Result<Vec<Point>, GisError> {
    let value = record
        .get(field)
        .ok_or_else(|| GisError::Schema(format!("record has no `{field}` field")))?;

    match value {
        Value::String(text) => serde_json::from_str(text).map_err(|err| {
            GisError::Schema(format!("`{field}` is not a JSON point list: {err}"))
        }),
        Value::Array(_) => serde_json::from_value(value.clone()).map_err(|err| {
            GisError::Schema(format!("`{field}` is not a point array: {err}"))
        }),
        Value::Null => Err(GisError::Schema(format!("`{field}` is null"))),
        _ => Err(GisError::Schema(format!(
            "`{field}` holds neither a JSON string nor an array"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(field: &str, value: Value) -> Record {
        let mut r = Record::new();
        r.set(field, value);
        r
    }

    #[test]
    fn merge_adds_coordinates_when_absent() {
        let mut r = Record::new();
        r.set("objectid", json!(1));
        merge_point_geometry(&mut r, Some(&json!({"x": -43.93, "y": -19.92})));
        assert_eq!(r.get_f64("x"), Some(-43.93));
        assert_eq!(r.get_f64("y"), Some(-19.92));
    }

    #[test]
    fn merge_never_overwrites_existing_coordinates() {
        let mut r = Record::new();
        r.set("x", json!(-40.0));
        merge_point_geometry(&mut r, Some(&json!({"x": -43.93, "y": -19.92})));
        assert_eq!(r.get_f64("x"), Some(-40.0));
        // y is not half-merged either
        assert!(!r.has_field("y"));
    }

    #[test]
    fn merge_ignores_non_point_geometry() {
        let mut r = Record::new();
        merge_point_geometry(&mut r, Some(&json!({"paths": [[[1.0, 2.0]]]})));
        assert!(!r.has_field("x"));

        merge_point_geometry(&mut r, Some(&json!({"x": "east", "y": -19.9})));
        assert!(!r.has_field("x"));

        merge_point_geometry(&mut r, None);
        assert!(!r.has_field("x"));
    }

    #[test]
    fn parse_line_field_decodes_stringified_points() {
        let r = record_with(
            "line",
            json!(r#"[{"x": -44.1, "y": -19.8}, {"x": -44.2, "y": -19.7}]"#),
        );
        let points = parse_line_field(&r, "line").unwrap();
        assert_eq!(
            points,
            vec![
                Point { x: -44.1, y: -19.8 },
                Point { x: -44.2, y: -19.7 },
            ]
        );
    }

    #[test]
    fn parse_line_field_accepts_decoded_arrays() {
        let r = record_with("line", json!([{"x": 1.0, "y": 2.0}]));
        let points = parse_line_field(&r, "line").unwrap();
        assert_eq!(points, vec![Point { x: 1.0, y: 2.0 }]);
    }

    #[test]
    fn parse_line_field_rejects_junk() {
        let missing = Record::new();
        assert!(matches!(
            parse_line_field(&missing, "line"),
            Err(GisError::Schema(_))
        ));

        let null = record_with("line", Value::Null);
        assert!(matches!(
            parse_line_field(&null, "line"),
            Err(GisError::Schema(_))
        ));

        let not_json = record_with("line", json!("x: 1, y: 2"));
        assert!(matches!(
            parse_line_field(&not_json, "line"),
            Err(GisError::Schema(_))
        ));

        let number = record_with("line", json!(12));
        assert!(matches!(
            parse_line_field(&number, "line"),
            Err(GisError::Schema(_))
        ));
    }
}
