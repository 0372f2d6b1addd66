// Weather station endpoint
//
// `GET /api/getstationsdata` returns every station the account can see,
// each with its own dashboard and a list of paired radio modules. The
// "last data" view flattens that tree into one field map per module name,
// which is the shape downstream consumers classify.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::AccessToken;
use crate::client::NetatmoClient;
use crate::error::Error;

/// Flattened per-module readings, in station order (base station first,
/// then its modules as the API lists them).
pub type LastData = Vec<(String, Map<String, Value>)>;

#[derive(Debug, Clone, Deserialize)]
struct StationsEnvelope {
    body: StationsData,
}

/// Body of the `getstationsdata` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationsData {
    #[serde(default)]
    pub devices: Vec<StationDevice>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// A base station (`NAMain`).
#[derive(Debug, Clone, Deserialize)]
pub struct StationDevice {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub home_name: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub reachable: Option<bool>,
    #[serde(default)]
    pub wifi_status: Option<i64>,
    #[serde(default)]
    pub dashboard_data: Option<Map<String, Value>>,
    #[serde(default)]
    pub modules: Vec<StationModule>,
}

/// A radio module paired with a station (`NAModule1`..`NAModule4`).
#[derive(Debug, Clone, Deserialize)]
pub struct StationModule {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(rename = "type", default)]
    pub module_type: Option<String>,
    #[serde(default)]
    pub reachable: Option<bool>,
    #[serde(default)]
    pub battery_percent: Option<i64>,
    #[serde(default)]
    pub battery_vp: Option<i64>,
    #[serde(default)]
    pub rf_status: Option<i64>,
    #[serde(default)]
    pub dashboard_data: Option<Map<String, Value>>,
}

impl StationDevice {
    /// `station_name`, falling back to `home_name`.
    pub fn display_name(&self) -> Option<&str> {
        self.station_name.as_deref().or(self.home_name.as_deref())
    }
}

impl StationsData {
    /// Name of the first station on the account.
    pub fn default_home(&self) -> Option<&str> {
        self.devices.first().and_then(StationDevice::display_name)
    }

    /// Find a station by display name or `_id`; `None` picks the first one.
    pub fn station(&self, selector: Option<&str>) -> Option<&StationDevice> {
        match selector {
            None => self.devices.first(),
            Some(key) => self
                .devices
                .iter()
                .find(|d| d.display_name() == Some(key) || d.id == key),
        }
    }

    /// Flatten one station into `(module_name, fields)` pairs.
    ///
    /// Each entry is the module's `dashboard_data` with `time_utc` renamed
    /// to `When`, plus the radio/wifi health fields that live beside the
    /// dashboard. Modules without dashboard data (lost modules) are skipped,
    /// as are readings older than `stale_after` when given. An unnamed
    /// module is keyed by its `_id`.
    pub fn last_data(
        &self,
        selector: Option<&str>,
        stale_after: Option<Duration>,
        now: DateTime<Utc>,
    ) -> LastData {
        let Some(station) = self.station(selector) else {
            return Vec::new();
        };
        let Some(ref dashboard) = station.dashboard_data else {
            debug!(station = %station.id, "station has no dashboard data");
            return Vec::new();
        };

        let limit = stale_after.map(|age| {
            now.timestamp()
                .saturating_sub(i64::try_from(age.as_secs()).unwrap_or(i64::MAX))
        });
        let fresh = |fields: &Map<String, Value>| match (limit, fields.get("time_utc")) {
            (Some(limit), Some(ts)) => ts.as_i64().is_none_or(|ts| ts > limit),
            _ => true,
        };

        let mut out = Vec::with_capacity(station.modules.len() + 1);

        if fresh(dashboard) {
            let mut fields = with_when(dashboard, now);
            if let Some(wifi) = station.wifi_status {
                fields.insert("wifi_status".into(), Value::from(wifi));
            }
            let name = station.module_name.clone().unwrap_or_else(|| station.id.clone());
            out.push((name, fields));
        }

        for module in &station.modules {
            let Some(ref dashboard) = module.dashboard_data else {
                debug!(module = %module.id, "module has no dashboard data, skipping");
                continue;
            };
            if !fresh(dashboard) {
                debug!(module = %module.id, "module reading is stale, skipping");
                continue;
            }

            let mut fields = with_when(dashboard, now);
            for (key, value) in [
                ("rf_status", module.rf_status),
                ("battery_vp", module.battery_vp),
                ("battery_percent", module.battery_percent),
            ] {
                if let Some(v) = value {
                    fields.insert(key.into(), Value::from(v));
                }
            }
            let name = module.module_name.clone().unwrap_or_else(|| module.id.clone());
            out.push((name, fields));
        }

        out
    }
}

/// Copy a dashboard, moving `time_utc` to `When` (or stamping `now`).
fn with_when(dashboard: &Map<String, Value>, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = dashboard.clone();
    let when = fields
        .remove("time_utc")
        .unwrap_or_else(|| Value::from(now.timestamp()));
    fields.insert("When".into(), when);
    fields
}

impl NetatmoClient {
    /// Fetch station data. `device_id` restricts the result to one station.
    pub async fn stations_data(
        &self,
        token: &AccessToken,
        device_id: Option<&str>,
    ) -> Result<StationsData, Error> {
        let mut url = self.endpoint("api/getstationsdata")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("get_favorites", "false");
            if let Some(id) = device_id {
                query.append_pair("device_id", id);
            }
        }

        let envelope: StationsEnvelope = self.get(url, token.secret().expose_secret()).await?;
        debug!(stations = envelope.body.devices.len(), "station data received");
        Ok(envelope.body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> StationsData {
        serde_json::from_value(json!({
            "devices": [{
                "_id": "70:ee:50:00:00:01",
                "station_name": "Home",
                "module_name": "Living Room",
                "type": "NAMain",
                "wifi_status": 56,
                "dashboard_data": {
                    "time_utc": 1_700_000_000,
                    "Temperature": 21.3,
                    "CO2": 612,
                    "Noise": 38
                },
                "modules": [
                    {
                        "_id": "02:00:00:00:00:01",
                        "module_name": "Garden",
                        "type": "NAModule1",
                        "battery_percent": 80,
                        "rf_status": 60,
                        "dashboard_data": { "time_utc": 1_699_990_000, "Temperature": 4.2 }
                    },
                    {
                        "_id": "05:00:00:00:00:01",
                        "type": "NAModule3",
                        "battery_percent": 40,
                        "rf_status": 70,
                        "dashboard_data": { "time_utc": 1_700_000_000, "Rain": 0.0 }
                    },
                    {
                        "_id": "06:00:00:00:00:01",
                        "module_name": "Lost",
                        "type": "NAModule2"
                    }
                ]
            }]
        }))
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_100, 0).unwrap()
    }

    #[test]
    fn flattens_station_and_modules_in_order() {
        let data = sample().last_data(None, None, now());
        let names: Vec<&str> = data.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Living Room", "Garden", "05:00:00:00:00:01"]);
    }

    #[test]
    fn renames_time_utc_and_adds_health_fields() {
        let data = sample().last_data(None, None, now());
        let (_, main) = &data[0];
        assert_eq!(main.get("When"), Some(&json!(1_700_000_000)));
        assert!(main.get("time_utc").is_none());
        assert_eq!(main.get("wifi_status"), Some(&json!(56)));

        let (_, garden) = &data[1];
        assert_eq!(garden.get("battery_percent"), Some(&json!(80)));
        assert_eq!(garden.get("rf_status"), Some(&json!(60)));
    }

    #[test]
    fn drops_stale_modules() {
        let data = sample().last_data(None, Some(Duration::from_secs(3600)), now());
        let names: Vec<&str> = data.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Living Room", "05:00:00:00:00:01"]);
    }

    #[test]
    fn unknown_station_yields_nothing() {
        assert!(sample().last_data(Some("Cabin"), None, now()).is_empty());
        assert_eq!(sample().default_home(), Some("Home"));
    }
}
