// ── Drivers and node definitions ──
//
// Each module kind publishes a fixed, ordered set of drivers. The same
// table drives both the profile handed to the host and the extraction
// a module performs on every poll, so the two cannot disagree.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::kind::ModuleKind;

/// A published value slot on a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Driver {
    St,
    Gv0,
    Gv1,
    Gv2,
    Gv3,
    Gv4,
    Gv5,
    Gv6,
    Gv7,
    Gv8,
    Gv9,
    Gv10,
    Gv11,
}

/// A driver's value. Integer drivers never carry a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriverValue {
    Integer(i64),
    Float(f64),
}

impl DriverValue {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for DriverValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Unit-of-measure codes understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Uom {
    Boolean,
    Decibel,
    Fahrenheit,
    RelativeHumidity,
    InchesHg,
    Index,
    Mph,
    Percent,
    Ppm,
    Raw,
    Degrees,
}

impl Uom {
    pub fn code(self) -> u8 {
        match self {
            Self::Boolean => 2,
            Self::Decibel => 12,
            Self::Fahrenheit => 17,
            Self::RelativeHumidity => 22,
            Self::InchesHg => 23,
            Self::Index => 25,
            Self::Mph => 48,
            Self::Percent => 51,
            Self::Ppm => 54,
            Self::Raw => 56,
            Self::Degrees => 76,
        }
    }
}

/// How a driver's value is read out of a module's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// Always `1` once the rest of the reading succeeded.
    Status,
    /// Celsius field converted to Fahrenheit.
    Temperature(&'static str),
    /// hPa field converted to inHg.
    Pressure(&'static str),
    /// Trend string encoded as a code. Never fails.
    Trend(&'static str),
    /// Epoch seconds, published divided by ten.
    When(&'static str),
    Float(&'static str),
    Integer(&'static str),
}

/// One driver of a node definition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriverSpec {
    pub driver: Driver,
    pub uom: Uom,
    pub label: &'static str,
    #[serde(skip)]
    pub extract: Extract,
}

impl DriverSpec {
    const fn new(driver: Driver, uom: Uom, label: &'static str, extract: Extract) -> Self {
        Self {
            driver,
            uom,
            label,
            extract,
        }
    }
}

/// A node type as installed in the host's profile.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub drivers: &'static [DriverSpec],
}

// ── Tables ───────────────────────────────────────────────────────────

use Driver as D;
use Extract as X;
use Uom as U;

const STATUS: DriverSpec = DriverSpec::new(D::St, U::Boolean, "Status", X::Status);

pub const CONTROLLER_NODE: NodeDefinition = NodeDefinition {
    id: "Netatmo",
    name: "Netatmo Weather Station",
    drivers: &[STATUS],
};

pub const MAIN_NODE: NodeDefinition = NodeDefinition {
    id: "main_netatmo",
    name: "Main Station",
    drivers: &[
        STATUS,
        DriverSpec::new(D::Gv0, U::Fahrenheit, "Temperature", X::Temperature("Temperature")),
        DriverSpec::new(D::Gv1, U::Ppm, "CO2", X::Integer("CO2")),
        DriverSpec::new(D::Gv2, U::RelativeHumidity, "Humidity", X::Integer("Humidity")),
        DriverSpec::new(D::Gv3, U::Decibel, "Noise", X::Integer("Noise")),
        DriverSpec::new(D::Gv4, U::InchesHg, "Pressure", X::Pressure("Pressure")),
        DriverSpec::new(
            D::Gv5,
            U::InchesHg,
            "Absolute Pressure",
            X::Pressure("AbsolutePressure"),
        ),
        DriverSpec::new(D::Gv6, U::Fahrenheit, "Min Temperature", X::Temperature("min_temp")),
        DriverSpec::new(D::Gv7, U::Fahrenheit, "Max Temperature", X::Temperature("max_temp")),
        DriverSpec::new(D::Gv8, U::Index, "Temperature Trend", X::Trend("temp_trend")),
        DriverSpec::new(D::Gv9, U::Index, "Pressure Trend", X::Trend("pressure_trend")),
        DriverSpec::new(D::Gv10, U::Raw, "Last Update", X::When("When")),
        DriverSpec::new(D::Gv11, U::Raw, "WiFi Signal", X::Integer("wifi_status")),
    ],
};

pub const INDOOR_NODE: NodeDefinition = NodeDefinition {
    id: "in_netatmo",
    name: "Indoor Module",
    drivers: &[
        STATUS,
        DriverSpec::new(D::Gv0, U::Fahrenheit, "Temperature", X::Temperature("Temperature")),
        DriverSpec::new(D::Gv1, U::Ppm, "CO2", X::Integer("CO2")),
        DriverSpec::new(D::Gv2, U::RelativeHumidity, "Humidity", X::Integer("Humidity")),
        DriverSpec::new(D::Gv3, U::Fahrenheit, "Min Temperature", X::Temperature("min_temp")),
        DriverSpec::new(D::Gv4, U::Fahrenheit, "Max Temperature", X::Temperature("max_temp")),
        DriverSpec::new(D::Gv5, U::Index, "Temperature Trend", X::Trend("temp_trend")),
        DriverSpec::new(D::Gv6, U::Raw, "Last Update", X::When("When")),
        DriverSpec::new(D::Gv7, U::Percent, "Battery", X::Integer("battery_percent")),
        DriverSpec::new(D::Gv8, U::Raw, "Radio Signal", X::Integer("rf_status")),
    ],
};

pub const OUTDOOR_NODE: NodeDefinition = NodeDefinition {
    id: "out_netatmo",
    name: "Outdoor Module",
    drivers: &[
        STATUS,
        DriverSpec::new(D::Gv0, U::Fahrenheit, "Temperature", X::Temperature("Temperature")),
        DriverSpec::new(D::Gv1, U::RelativeHumidity, "Humidity", X::Integer("Humidity")),
        DriverSpec::new(D::Gv2, U::Fahrenheit, "Min Temperature", X::Temperature("min_temp")),
        DriverSpec::new(D::Gv3, U::Fahrenheit, "Max Temperature", X::Temperature("max_temp")),
        DriverSpec::new(D::Gv4, U::Index, "Temperature Trend", X::Trend("temp_trend")),
        DriverSpec::new(D::Gv5, U::Raw, "Last Update", X::When("When")),
        DriverSpec::new(D::Gv6, U::Percent, "Battery", X::Integer("battery_percent")),
        DriverSpec::new(D::Gv7, U::Raw, "Radio Signal", X::Integer("rf_status")),
    ],
};

pub const WIND_NODE: NodeDefinition = NodeDefinition {
    id: "wind_netatmo",
    name: "Wind Gauge",
    drivers: &[
        STATUS,
        DriverSpec::new(D::Gv0, U::Mph, "Wind Strength", X::Float("WindStrength")),
        DriverSpec::new(D::Gv1, U::Degrees, "Wind Angle", X::Integer("WindAngle")),
        DriverSpec::new(D::Gv2, U::Mph, "Gust Strength", X::Float("GustStrength")),
        DriverSpec::new(D::Gv3, U::Degrees, "Gust Angle", X::Integer("GustAngle")),
        DriverSpec::new(D::Gv4, U::Mph, "Max Wind Strength", X::Float("max_wind_str")),
        DriverSpec::new(D::Gv5, U::Degrees, "Max Wind Angle", X::Integer("max_wind_angle")),
        DriverSpec::new(D::Gv6, U::Raw, "Last Update", X::When("When")),
        DriverSpec::new(D::Gv7, U::Percent, "Battery", X::Integer("battery_percent")),
        DriverSpec::new(D::Gv8, U::Raw, "Radio Signal", X::Integer("rf_status")),
    ],
};

pub const RAIN_NODE: NodeDefinition = NodeDefinition {
    id: "rain_netatmo",
    name: "Rain Gauge",
    drivers: &[
        STATUS,
        DriverSpec::new(D::Gv0, U::InchesHg, "Rain", X::Float("Rain")),
        DriverSpec::new(D::Gv1, U::InchesHg, "Rain Last Hour", X::Float("sum_rain_1")),
        DriverSpec::new(D::Gv2, U::InchesHg, "Rain Last 24h", X::Float("sum_rain_24")),
        DriverSpec::new(D::Gv3, U::Raw, "Last Update", X::When("When")),
        DriverSpec::new(D::Gv4, U::Percent, "Battery", X::Integer("battery_percent")),
        DriverSpec::new(D::Gv5, U::Raw, "Radio Signal", X::Integer("rf_status")),
    ],
};

impl ModuleKind {
    /// The node definition a module of this kind is published with.
    pub fn node_definition(self) -> Option<&'static NodeDefinition> {
        match self {
            Self::Main => Some(&MAIN_NODE),
            Self::Indoor => Some(&INDOOR_NODE),
            Self::Outdoor => Some(&OUTDOOR_NODE),
            Self::Wind => Some(&WIND_NODE),
            Self::Rain => Some(&RAIN_NODE),
            Self::Unknown => None,
        }
    }

    /// Drivers published for this kind, `ST` first.
    pub fn drivers(self) -> &'static [DriverSpec] {
        self.node_definition().map_or(&[], |def| def.drivers)
    }
}

/// Every node definition, controller first.
pub fn node_definitions() -> [&'static NodeDefinition; 6] {
    [
        &CONTROLLER_NODE,
        &MAIN_NODE,
        &INDOOR_NODE,
        &OUTDOOR_NODE,
        &WIND_NODE,
        &RAIN_NODE,
    ]
}

// ── Normalized readings ──────────────────────────────────────────────

/// One published value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverReading {
    pub driver: Driver,
    pub value: DriverValue,
}

/// A module's converted values for one cycle, in driver-table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReading {
    pub kind: ModuleKind,
    pub values: Vec<DriverReading>,
}

impl NormalizedReading {
    pub fn get(&self, driver: Driver) -> Option<DriverValue> {
        self.values
            .iter()
            .find(|r| r.driver == driver)
            .map(|r| r.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriverReading> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
