// ── Module state machine ──
//
// One `Module` per discovered sensor. Each poll it looks itself up in
// the snapshot and extracts every driver its kind publishes. A reading
// is all-or-nothing: one bad field discards the whole cycle for that
// module and the last good reading stays in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::convert::{ConversionError, convert_pressure, convert_temperature, encode_trend};
use crate::error::ReadingError;
use crate::model::{
    DriverReading, DriverSpec, DriverValue, Extract, ModuleAddress, ModuleKind, ModuleReading,
    NormalizedReading, TelemetrySnapshot,
};
use crate::sink::DriverSink;

/// A discovered module and its last-known state.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    kind: ModuleKind,
    address: ModuleAddress,
    reading: Option<NormalizedReading>,
    updated_at: Option<DateTime<Utc>>,
}

/// Read-only view of a module for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSnapshot {
    pub name: String,
    pub kind: ModuleKind,
    pub address: ModuleAddress,
    pub node_def_id: Option<&'static str>,
    pub reading: Option<NormalizedReading>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Module {
    pub fn new(name: impl Into<String>, kind: ModuleKind, address: ModuleAddress) -> Self {
        Self {
            name: name.into(),
            kind,
            address,
            reading: None,
            updated_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn address(&self) -> &ModuleAddress {
        &self.address
    }

    /// Last good reading.
    pub fn reading(&self) -> Option<&NormalizedReading> {
        self.reading.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            address: self.address.clone(),
            node_def_id: self.kind.node_definition().map(|d| d.id),
            reading: self.reading.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Convert a payload into this module's drivers without touching state.
    pub fn normalize(&self, raw: &ModuleReading) -> Result<NormalizedReading, ReadingError> {
        let values = self
            .kind
            .drivers()
            .iter()
            .map(|spec| {
                extract(spec, raw).map(|value| DriverReading {
                    driver: spec.driver,
                    value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NormalizedReading {
            kind: self.kind,
            values,
        })
    }

    /// Take this cycle's reading from `snapshot` and publish it.
    ///
    /// On any error nothing is stored or emitted. `first_poll` forces
    /// every emission.
    pub fn refresh<K: DriverSink + ?Sized>(
        &mut self,
        snapshot: &TelemetrySnapshot,
        first_poll: bool,
        sink: &mut K,
    ) -> Result<&NormalizedReading, ReadingError> {
        let Some(raw) = snapshot.get(&self.name) else {
            return Err(ReadingError::NoData {
                module: self.name.clone(),
            });
        };

        let reading = self.normalize(raw)?;
        for r in reading.iter() {
            sink.emit(&self.address, r.driver, r.value, first_poll);
        }
        debug!(
            module = %self.name,
            address = %self.address,
            drivers = reading.len(),
            "module refreshed"
        );

        self.updated_at = Some(Utc::now());
        Ok(self.reading.insert(reading))
    }
}

fn extract(spec: &DriverSpec, raw: &ModuleReading) -> Result<DriverValue, ReadingError> {
    match spec.extract {
        Extract::Status => Ok(DriverValue::Integer(1)),
        Extract::Temperature(field) => converted(raw, field, convert_temperature),
        Extract::Pressure(field) => converted(raw, field, convert_pressure),
        Extract::Trend(field) => Ok(DriverValue::Integer(encode_trend(raw.get(field)).code())),
        Extract::When(field) => raw.number(field).map(|secs| DriverValue::Float(secs / 10.0)),
        Extract::Float(field) => raw.number(field).map(DriverValue::Float),
        Extract::Integer(field) => raw.integer(field).map(DriverValue::Integer),
    }
}

fn converted(
    raw: &ModuleReading,
    field: &'static str,
    convert: fn(f64) -> Result<f64, ConversionError>,
) -> Result<DriverValue, ReadingError> {
    let value = raw.number(field)?;
    convert(value)
        .map(DriverValue::Float)
        .map_err(|e| ReadingError::InvalidField {
            field,
            reason: e.to_string(),
        })
}
