// ── Raw telemetry ──
//
// A snapshot is what one fetch returned: module name to field map, in
// the provider's order. Values stay loosely typed until a module
// extracts the fields its kind needs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReadingError;

/// A single field as the provider reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Anything else (null, bool, array, object). Never extractable.
    Other(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => Self::Number(f),
                None => Self::Other(Value::Number(n)),
            },
            Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }
}

/// One module's fields from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleReading {
    fields: IndexMap<String, FieldValue>,
}

impl ModuleReading {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A finite number.
    pub fn number(&self, field: &'static str) -> Result<f64, ReadingError> {
        match self.fields.get(field) {
            None => Err(ReadingError::MissingField { field }),
            Some(FieldValue::Number(n)) if n.is_finite() => Ok(*n),
            Some(FieldValue::Number(n)) => Err(ReadingError::InvalidField {
                field,
                reason: format!("{n} is not finite"),
            }),
            Some(other) => Err(ReadingError::InvalidField {
                field,
                reason: format!("expected a number, got {}", describe(other)),
            }),
        }
    }

    /// A number with no fractional part.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn integer(&self, field: &'static str) -> Result<i64, ReadingError> {
        const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

        let n = self.number(field)?;
        if n.fract() != 0.0 || n.abs() > LIMIT {
            return Err(ReadingError::InvalidField {
                field,
                reason: format!("expected an integer, got {n}"),
            });
        }
        Ok(n as i64)
    }
}

fn describe(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Number(_) => "a number",
        FieldValue::Text(_) => "a string",
        FieldValue::Other(Value::Null) => "null",
        FieldValue::Other(Value::Bool(_)) => "a boolean",
        FieldValue::Other(Value::Array(_)) => "an array",
        FieldValue::Other(_) => "an object",
    }
}

impl From<Map<String, Value>> for ModuleReading {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect()
    }
}

impl FromIterator<(String, FieldValue)> for ModuleReading {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Everything one fetch returned, keyed by module name.
///
/// Replaced wholesale every poll; modules only ever borrow it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    station: Option<String>,
    modules: IndexMap<String, ModuleReading>,
}

impl TelemetrySnapshot {
    pub fn new(station: Option<String>) -> Self {
        Self {
            station,
            modules: IndexMap::new(),
        }
    }

    /// Build from `(name, reading)` pairs, keeping their order.
    pub fn from_entries<I, N>(station: Option<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (N, ModuleReading)>,
        N: Into<String>,
    {
        Self {
            station,
            modules: entries.into_iter().map(|(n, r)| (n.into(), r)).collect(),
        }
    }

    /// Add or replace a module's reading.
    pub fn insert(&mut self, name: impl Into<String>, reading: ModuleReading) {
        self.modules.insert(name.into(), reading);
    }

    /// Display name of the station this snapshot came from.
    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleReading> {
        self.modules.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleReading)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl From<(Option<&str>, netatmo_api::LastData)> for TelemetrySnapshot {
    fn from((station, data): (Option<&str>, netatmo_api::LastData)) -> Self {
        Self::from_entries(
            station.map(str::to_owned),
            data.into_iter().map(|(name, map)| (name, ModuleReading::from(map))),
        )
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reading(value: Value) -> ModuleReading {
        match value {
            Value::Object(map) => ModuleReading::from(map),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn json_values_map_to_field_values() {
        let r = reading(json!({
            "Temperature": 21.5,
            "CO2": 612,
            "temp_trend": "up",
            "reachable": true,
            "Rain": null
        }));
        assert_eq!(r.get("Temperature"), Some(&FieldValue::Number(21.5)));
        assert_eq!(r.get("CO2"), Some(&FieldValue::Number(612.0)));
        assert_eq!(r.get("temp_trend"), Some(&FieldValue::Text("up".into())));
        assert_eq!(r.get("reachable"), Some(&FieldValue::Other(json!(true))));
        assert!(r.contains("Rain"));
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn number_extraction_reports_shape() {
        let r = reading(json!({ "Temperature": "warm", "Rain": null, "Noise": 40 }));
        assert_eq!(r.number("Noise"), Ok(40.0));
        assert_eq!(
            r.number("Humidity"),
            Err(ReadingError::MissingField { field: "Humidity" })
        );
        assert!(matches!(
            r.number("Temperature"),
            Err(ReadingError::InvalidField { field: "Temperature", ref reason }) if reason.contains("a string")
        ));
        assert!(matches!(
            r.number("Rain"),
            Err(ReadingError::InvalidField { field: "Rain", .. })
        ));
    }

    #[test]
    fn integer_extraction_rejects_fractions() {
        let r = reading(json!({ "CO2": 612, "Humidity": 45.5, "WindAngle": -10 }));
        assert_eq!(r.integer("CO2"), Ok(612));
        assert_eq!(r.integer("WindAngle"), Ok(-10));
        assert!(matches!(
            r.integer("Humidity"),
            Err(ReadingError::InvalidField { field: "Humidity", .. })
        ));
    }

    #[test]
    fn snapshot_keeps_provider_order() {
        let snapshot = TelemetrySnapshot::from_entries(
            Some("Home".into()),
            [
                ("Zeta", ModuleReading::default()),
                ("Alpha", ModuleReading::default()),
                ("Mid", ModuleReading::default()),
            ],
        );
        let names: Vec<&str> = snapshot.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(snapshot.station(), Some("Home"));
    }
}
