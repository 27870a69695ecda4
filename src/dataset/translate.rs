//! Portuguese labels for the categorical codes the feature services emit.
//!
//! The alert layer sends Waze-style `type`/`subtype` codes; the congestion
//! layer sends a numeric severity level. Each table maps the wire code to
//! the label the dashboards display. Codes missing from a table are left
//! as-is by [`Dataset::translate_field`], so a new upstream code degrades
//! to showing the raw code rather than failing the fetch.

use super::Dataset;

// ---------------------------------------------------------------------------
// Alert tables
// ---------------------------------------------------------------------------

/// `type` codes on the alert layer.
pub const ALERT_TYPE_PT: &[(&str, &str)] = &[
    ("JAM", "Engarrafamento"),
    ("ACCIDENT", "Acidente"),
    ("ROAD_CLOSED", "Estrada Fechada"),
    ("HAZARD", "Perigo"),
];

/// `subtype` codes on the alert layer.
///
/// `ACIDENT_MINOR` (single C) is what the service actually sends, so the
/// key keeps that spelling.
pub const ALERT_SUBTYPE_PT: &[(&str, &str)] = &[
    ("ACIDENT_MINOR", "Acidente Menor"),
    ("ACCIDENT_MAJOR", "Acidente Maior"),
    ("NO_SUBTYPE", "Sem Subtipo"),
    ("JAM_MODERATE_TRAFFIC", "Tráfego Moderado"),
    ("JAM_HEAVY_TRAFFIC", "Tráfego Intenso"),
    ("JAM_STAND_STILL_TRAFFIC", "Tráfego Parado"),
    ("JAM_LIGHT_TRAFFIC", "Tráfego Leve"),
    ("HAZARD_ON_ROAD", "Perigo na Estrada"),
    ("HAZARD_ON_SHOULDER", "Perigo no Acostamento"),
    ("HAZARD_WEATHER", "Condições Climáticas Adversas"),
    ("HAZARD_ON_ROAD_OBJECT", "Objeto na Estrada"),
    ("HAZARD_ON_ROAD_POT_HOLE", "Buraco na Estrada"),
    ("HAZARD_ON_ROAD_ROAD_KILL", "Animal Morto na Estrada"),
    ("HAZARD_ON_SHOULDER_CAR_STOPPED", "Carro Parado no Acostamento"),
    ("HAZARD_ON_SHOULDER_ANIMALS", "Animais no Acostamento"),
    ("HAZARD_ON_SHOULDER_MISSING_SIGN", "Placa Faltando no Acostamento"),
    ("HAZARD_WEATHER_FOG", "Nevoeiro"),
    ("HAZARD_WEATHER_HAIL", "Granizo"),
    ("HAZARD_WEATHER_HEAVY_RAIN", "Chuva Intensa"),
    ("HAZARD_WEATHER_HEAVY_SNOW", "Neve Intensa"),
    ("HAZARD_WEATHER_FLOOD", "Enchente"),
    ("HAZARD_WEATHER_MONSOON", "Monção"),
    ("HAZARD_WEATHER_TORNADO", "Tornado"),
    ("HAZARD_WEATHER_HEAT_WAVE", "Onda de Calor"),
    ("HAZARD_WEATHER_HURRICANE", "Furacão"),
    ("HAZARD_WEATHER_FREEZING_RAIN", "Chuva Congelante"),
    ("HAZARD_ON_ROAD_LANE_CLOSED", "Faixa Fechada na Estrada"),
    ("HAZARD_ON_ROAD_OIL", "Óleo na Estrada"),
    ("HAZARD_ON_ROAD_ICE", "Gelo na Estrada"),
    ("HAZARD_ON_ROAD_CONSTRUCTION", "Obra na Estrada"),
    ("HAZARD_ON_ROAD_CAR_STOPPED", "Carro Parado na Estrada"),
    ("HAZARD_ON_ROAD_TRAFFIC_LIGHT_FAULT", "Semáforo com Defeito"),
    ("ROAD_CLOSED_HAZARD", "Via Fechada por Perigo"),
    ("ROAD_CLOSED_CONSTRUCTION", "Via Fechada por Obras"),
    ("ROAD_CLOSED_EVENT", "Via Fechada por Evento"),
];

// ---------------------------------------------------------------------------
// Congestion tables
// ---------------------------------------------------------------------------

/// `level` codes on the congestion layer (0 = free flow, 5 = standstill).
/// Keys are the textual form because [`Dataset::translate_field`] coerces
/// numeric levels to text before the lookup.
pub const CONGESTION_LEVEL_PT: &[(&str, &str)] = &[
    ("0", "Fluxo Livre"),
    ("1", "Tráfego Leve"),
    ("2", "Tráfego Moderado"),
    ("3", "Tráfego Intenso"),
    ("4", "Tráfego Muito Intenso"),
    ("5", "Tráfego Parado"),
];

// ---------------------------------------------------------------------------
// Lookup and per-layer normalization
// ---------------------------------------------------------------------------

/// Linear lookup; the tables are small enough that a map is not worth it.
pub fn lookup<'t>(table: &[(&'t str, &'t str)], key: &str) -> Option<&'t str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Translate the alert layer's categorical fields in place.
pub fn normalize_alerts(dataset: &mut Dataset) {
    dataset.translate_field("type", ALERT_TYPE_PT);
    dataset.translate_field("subtype", ALERT_SUBTYPE_PT);
}

/// Translate the congestion layer's severity level in place and derive the
/// length band field from the segment length.
pub fn normalize_congestion(dataset: &mut Dataset) {
    dataset.translate_field("level", CONGESTION_LEVEL_PT);
    super::bins::apply_length_bands(dataset);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use serde_json::{Value, json};

    fn record(pairs: &[(&str, Value)]) -> Record {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.set(*k, v.clone());
        }
        r
    }

    #[test]
    fn alert_tables_cover_the_known_codes() {
        assert_eq!(lookup(ALERT_TYPE_PT, "JAM"), Some("Engarrafamento"));
        assert_eq!(lookup(ALERT_TYPE_PT, "HAZARD"), Some("Perigo"));
        assert_eq!(lookup(ALERT_SUBTYPE_PT, "ACIDENT_MINOR"), Some("Acidente Menor"));
        assert_eq!(
            lookup(ALERT_SUBTYPE_PT, "HAZARD_ON_ROAD_POT_HOLE"),
            Some("Buraco na Estrada")
        );
        assert_eq!(
            lookup(ALERT_SUBTYPE_PT, "ROAD_CLOSED_EVENT"),
            Some("Via Fechada por Evento")
        );
        assert_eq!(lookup(ALERT_SUBTYPE_PT, "NOT_A_CODE"), None);
    }

    #[test]
    fn normalize_alerts_translates_both_fields() {
        let mut ds = Dataset::from_records(vec![record(&[
            ("type", json!("ROAD_CLOSED")),
            ("subtype", json!("ROAD_CLOSED_CONSTRUCTION")),
            ("street", json!("Av. do Contorno")),
        ])]);
        normalize_alerts(&mut ds);

        let r = &ds.records()[0];
        assert_eq!(r.get_str("type"), Some("Estrada Fechada"));
        assert_eq!(r.get_str("subtype"), Some("Via Fechada por Obras"));
        // untranslated fields untouched
        assert_eq!(r.get_str("street"), Some("Av. do Contorno"));
    }

    #[test]
    fn normalize_alerts_passes_unknown_codes_through() {
        let mut ds = Dataset::from_records(vec![record(&[
            ("type", json!("JAM")),
            ("subtype", json!("BRAND_NEW_SUBTYPE")),
        ])]);
        normalize_alerts(&mut ds);

        let r = &ds.records()[0];
        assert_eq!(r.get_str("type"), Some("Engarrafamento"));
        assert_eq!(r.get_str("subtype"), Some("BRAND_NEW_SUBTYPE"));
    }

    #[test]
    fn normalize_alerts_is_idempotent() {
        let mut ds = Dataset::from_records(vec![record(&[
            ("type", json!("ACCIDENT")),
            ("subtype", json!("ACCIDENT_MAJOR")),
        ])]);
        normalize_alerts(&mut ds);
        let once = ds.clone();
        normalize_alerts(&mut ds);
        assert_eq!(ds, once);
    }

    #[test]
    fn congestion_level_translates_from_number_or_text() {
        let mut ds = Dataset::from_records(vec![
            record(&[("level", json!(3))]),
            record(&[("level", json!(3.0))]),
            record(&[("level", json!("5"))]),
            record(&[("level", json!(0))]),
        ]);
        ds.translate_field("level", CONGESTION_LEVEL_PT);

        assert_eq!(ds.records()[0].get_str("level"), Some("Tráfego Intenso"));
        assert_eq!(ds.records()[1].get_str("level"), Some("Tráfego Intenso"));
        assert_eq!(ds.records()[2].get_str("level"), Some("Tráfego Parado"));
        assert_eq!(ds.records()[0].get_str("level"), Some("Tráfego Intenso"));
        assert_eq!(ds.records()[3].get_str("level"), Some("Fluxo Livre"));
    }

    #[test]
    fn normalize_congestion_adds_length_band() {
        let mut ds = Dataset::from_records(vec![record(&[
            ("level", json!(2)),
            ("length", json!(1250)),
        ])]);
        normalize_congestion(&mut ds);

        let r = &ds.records()[0];
        assert_eq!(r.get_str("level"), Some("Tráfego Moderado"));
        assert_eq!(r.get_str("faixa_extensao"), Some("1 km a 2 km"));
    }
}
