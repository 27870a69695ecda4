//! Length bands for congestion segments.
//!
//! The congestion layer reports segment length in meters. For grouping, each
//! record gets a derived `faixa_extensao` field: a half-open band `[lo, hi)`
//! rendered as a Portuguese label. Records with a missing, negative, or
//! non-numeric length get no band field at all.

use serde_json::Value;

use super::Dataset;

/// Source field holding the segment length in meters.
pub const LENGTH_FIELD: &str = "length";

/// Derived field the band label is written to.
pub const BAND_FIELD: &str = "faixa_extensao";

/// Band label for a length in meters. Bands are half-open: 500 m falls in
/// the second band, 5000 m in the last.
pub fn length_band(meters: f64) -> Option<&'static str> {
    if !meters.is_finite() || meters < 0.0 {
        return None;
    }
    let label = if meters < 500.0 {
        "Até 500 m"
    } else if meters < 1000.0 {
        "500 m a 1 km"
    } else if meters < 2000.0 {
        "1 km a 2 km"
    } else if meters < 5000.0 {
        "2 km a 5 km"
    } else {
        "Acima de 5 km"
    };
    Some(label)
}

/// Add [`BAND_FIELD`] to every record with a usable [`LENGTH_FIELD`].
/// Records without one are left without the band field, so they drop out
/// of band counts the same way nulls drop out of `value_counts`.
pub fn apply_length_bands(dataset: &mut Dataset) {
    for record in dataset.iter_mut() {
        let Some(meters) = record.get_f64(LENGTH_FIELD) else {
            continue;
        };
        if let Some(band) = length_band(meters) {
            record.set(BAND_FIELD, Value::String(band.to_string()));
        }
    }
}
