//! Flat record collections produced by the feature-service fetcher.
//!
//! A [`Record`] is one feature's attribute set: a flat mapping from field
//! name to a JSON scalar or nested value, with the schema implied by the
//! service rather than declared by the caller. A [`Dataset`] is an ordered
//! collection of records in service-returned order.
//!
//! This module carries the consumer-facing operations the dashboards need
//! after a fetch: text coercion, translation of categorical codes,
//! client-side equality filters, and value counting. All filtering happens
//! here, after full retrieval — no predicate is ever pushed to the server.

pub mod bins;
pub mod schema;
pub mod translate;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One feature's attributes, flattened to field → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Borrow the raw value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrow a field as `&str`, if it holds a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Read a field as `f64`, accepting JSON numbers and numeric strings
    /// (feature services are inconsistent about which one they send).
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Set or replace a field.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Whether the record carries the field at all (a JSON `null` counts
    /// as present).
    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The field's value coerced to display text; `None` for missing
    /// fields and JSON nulls.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(value_to_text)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Text coercion
// ---------------------------------------------------------------------------

/// Coerce a JSON value to display text.
///
/// Strings pass through, numbers render without a trailing `.0` when they
/// are whole (so a level sent as `3` or `3.0` both become `"3"` and hit the
/// same translation key), booleans render as `true`/`false`, and nested
/// arrays/objects fall back to compact JSON. Nulls yield `None` — they are
/// never turned into a literal `"null"` string.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        other => Some(other.to_string()),
    }
}

/// Render a JSON number, collapsing whole floats to their integer form.
fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// An ordered collection of records, in service-returned order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    /// Records whose `field`, coerced to text, equals `value`.
    ///
    /// Records missing the field (or holding null) never match. Filters
    /// compose by chaining calls; order is preserved.
    pub fn filter_eq(&self, field: &str, value: &str) -> Dataset {
        let records = self
            .records
            .iter()
            .filter(|r| r.text(field).as_deref() == Some(value))
            .cloned()
            .collect();
        Dataset { records }
    }

    /// Replace a categorical field in place: coerce to text, then map
    /// through the lookup table. Codes absent from the table keep their
    /// coerced text form; missing fields and nulls are left untouched.
    ///
    /// Never fails, never adds or removes records, and a second application
    /// is a no-op for unmapped codes (translated labels are not themselves
    /// table keys).
    pub fn translate_field(&mut self, field: &str, table: &[(&str, &str)]) {
        for record in &mut self.records {
            let Some(text) = record.text(field) else {
                continue;
            };
            let replaced = translate::lookup(table, &text)
                .map(str::to_string)
                .unwrap_or(text);
            record.set(field, Value::String(replaced));
        }
    }

    /// Rewrite a field's text through `f`, leaving it unchanged where `f`
    /// returns `None` or the field is missing/null.
    pub fn rewrite_field(&mut self, field: &str, f: impl Fn(&str) -> Option<String>) {
        for record in &mut self.records {
            let Some(text) = record.text(field) else {
                continue;
            };
            if let Some(rewritten) = f(&text) {
                record.set(field, Value::String(rewritten));
            }
        }
    }

    /// Count occurrences of each distinct text value of `field`.
    ///
    /// Missing fields and nulls are skipped. Results are sorted by count
    /// descending; ties keep the order in which each value first appeared
    /// in the dataset.
    pub fn value_counts(&self, field: &str) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for record in &self.records {
            let Some(text) = record.text(field) else {
                continue;
            };
            if !counts.contains_key(&text) {
                first_seen.push(text.clone());
            }
            *counts.entry(text).or_default() += 1;
        }

        let mut out: Vec<(String, usize)> = first_seen
            .into_iter()
            .map(|v| {
                let c = counts[&v];
                (v, c)
            })
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    /// The most frequent value of `field`, if any record carries it.
    pub fn top(&self, field: &str) -> Option<(String, usize)> {
        self.value_counts(field).into_iter().next()
    }

    /// Distinct text values of `field` in first-appearance order.
    pub fn distinct(&self, field: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for record in &self.records {
            if let Some(text) = record.text(field)
                && !seen.contains(&text)
            {
                seen.push(text);
            }
        }
        seen
    }

    /// Serialize the whole dataset as a JSON array.
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Render as CSV with an explicit column order.
    ///
    /// `columns` pairs a source field with its header label; cells for
    /// missing fields are empty. Used with a display schema so the column
    /// order never depends on map iteration order.
    pub fn to_csv(&self, columns: &[(&str, &str)]) -> String {
        let mut out = String::new();
        let header: Vec<String> = columns.iter().map(|(_, label)| csv_escape(label)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for record in &self.records {
            let row: Vec<String> = columns
                .iter()
                .map(|(field, _)| record.text(field).map(|t| csv_escape(&t)).unwrap_or_default())
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    /// Render as CSV without a schema: columns are the sorted union of all
    /// field names, headers are the raw field names.
    pub fn to_csv_raw(&self) -> String {
        let mut fields: Vec<&str> = Vec::new();
        for record in &self.records {
            for key in record.0.keys() {
                if !fields.contains(&key.as_str()) {
                    fields.push(key);
                }
            }
        }
        fields.sort_unstable();

        let columns: Vec<(&str, &str)> = fields.iter().map(|f| (*f, *f)).collect();
        self.to_csv(&columns)
    }
}

impl IntoIterator for Dataset {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Quote a CSV cell when it contains a comma, quote, or line break.
pub(crate) fn csv_escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

// ---------------------------------------------------------------------------
// Highway reference canonicalization
// ---------------------------------------------------------------------------

/// Matches a highway designation: a 2–3 letter prefix (BR, MG, LMG, AMG…)
/// with an optional separator before the number.
static HIGHWAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]{2,3})\s*[-–]?\s*(\d{1,4})\s*$").expect("highway regex must compile")
});

/// Canonicalize a highway reference: `"br 381"`, `"BR381"`, and `"BR-381"`
/// all become `"BR-381"`. Leading zeros are kept (`"mg 010"` → `"MG-010"`,
/// the official designation). Returns `None` when the text is not a plain
/// highway code, so free-text values pass through unchanged.
pub fn canonical_highway(raw: &str) -> Option<String> {
    let caps = HIGHWAY_RE.captures(raw)?;
    let prefix = caps.get(1)?.as_str().to_ascii_uppercase();
    let number = caps.get(2)?.as_str();
    Some(format!("{prefix}-{number}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
