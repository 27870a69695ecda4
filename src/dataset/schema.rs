//! Display schemas: which fields each layer exposes, in what order, under
//! which pt-BR label.
//!
//! A schema is an ordered `(source_field, display_label)` list. Projection
//! keeps only schema fields and renames them; anything the service sends
//! beyond the schema (internal codes, audit columns, raw geometry) is
//! dropped. Column order is authoritative for CSV output; JSON object key
//! order carries no meaning.

use serde_json::Map;

use super::{Dataset, Record};

pub type DisplaySchema = &'static [(&'static str, &'static str)];

/// Alert layer: one row per Waze alert.
pub const ALERTS_DISPLAY: DisplaySchema = &[
    ("objectid", "Alerta"),
    ("type", "Tipo de Alerta"),
    ("subtype", "Subtipo de Alerta"),
    ("street", "Via"),
    ("trecho", "Trecho"),
    ("rodovia", "Rodovia"),
    ("mesorregiao", "Mesorregião"),
    ("municipio", "Município"),
    ("regional", "Regional"),
    ("jurisdicao", "Jurisdição"),
    ("x", "Longitude"),
    ("y", "Latitude"),
];

/// Congestion layer: one row per jam segment. `faixa_extensao` is the
/// derived length band, so this schema expects a normalized dataset.
pub const CONGESTION_DISPLAY: DisplaySchema = &[
    ("objectid", "Congestionamento"),
    ("street", "Via"),
    ("trecho", "Trecho"),
    ("rodovia", "Rodovia"),
    ("municipio", "Município"),
    ("regional", "Regional"),
    ("level", "Nível"),
    ("speedkmh", "Velocidade (km/h)"),
    ("delay", "Atraso (s)"),
    ("length", "Extensão (m)"),
    ("faixa_extensao", "Faixa de Extensão"),
];

/// Column list for rendering an already-projected dataset: the display
/// label is both the field name and the header.
pub fn label_columns(schema: DisplaySchema) -> Vec<(&'static str, &'static str)> {
    schema.iter().map(|(_, label)| (*label, *label)).collect()
}

impl Dataset {
    /// Project every record onto `schema`: keep only schema fields, renamed
    /// to their display label. Fields a record does not carry are simply
    /// absent from the projected record (a JSON null is kept as null).
    pub fn select(&self, schema: DisplaySchema) -> Dataset {
        self.iter()
            .map(|record| {
                let mut out = Map::new();
                for (field, label) in schema {
                    if let Some(value) = record.get(field) {
                        out.insert((*label).to_string(), value.clone());
                    }
                }
                Record(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn select_keeps_only_schema_fields_under_display_labels() {
        let mut r = Record::new();
        r.set("objectid", json!(42));
        r.set("type", json!("Engarrafamento"));
        r.set("globalid", json!("{ABC}"));
        r.set("x", json!(-43.95));

        let ds = Dataset::from_records(vec![r]).select(ALERTS_DISPLAY);
        let out = &ds.records()[0];

        assert_eq!(out.text("Alerta").as_deref(), Some("42"));
        assert_eq!(out.get_str("Tipo de Alerta"), Some("Engarrafamento"));
        assert_eq!(out.get_f64("Longitude"), Some(-43.95));
        // dropped and unprojected fields are gone
        assert!(!out.has_field("globalid"));
        assert!(!out.has_field("objectid"));
        // fields the record never had stay absent rather than becoming null
        assert!(!out.has_field("Via"));
    }

    #[test]
    fn select_preserves_nulls_but_not_missing_fields() {
        let mut r = Record::new();
        r.set("street", Value::Null);

        let ds = Dataset::from_records(vec![r]).select(ALERTS_DISPLAY);
        let out = &ds.records()[0];
        assert!(out.has_field("Via"));
        assert!(out.get("Via").unwrap().is_null());
    }

    #[test]
    fn csv_after_select_follows_schema_order() {
        let mut r = Record::new();
        r.set("objectid", json!(1));
        r.set("type", json!("Perigo"));
        let ds = Dataset::from_records(vec![r]).select(ALERTS_DISPLAY);

        let csv = ds.to_csv(&label_columns(ALERTS_DISPLAY));
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("Alerta,Tipo de Alerta,Subtipo de Alerta,Via"));
        assert!(header.ends_with("Longitude,Latitude"));
    }
}
