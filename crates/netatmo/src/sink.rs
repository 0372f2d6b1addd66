//! Driver sink for the daemon: publishes through `tracing`.
//!
//! Values are reported only when they change (or when forced), and
//! notices are kept so `remove`/`clear` can log what went away.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, error, info, warn};

use netatmo_core::{Driver, DriverSink, DriverValue, ModuleAddress, ModuleKind, NodeDefinition};

#[derive(Debug, Default)]
pub struct LogSink {
    last: HashMap<(ModuleAddress, Driver), DriverValue>,
    notices: BTreeMap<String, String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriverSink for LogSink {
    fn emit(&mut self, address: &ModuleAddress, driver: Driver, value: DriverValue, force: bool) {
        let previous = self.last.insert((address.clone(), driver), value);
        if force || previous != Some(value) {
            info!(%address, %driver, %value, force, "driver");
        }
    }

    fn add_notice(&mut self, key: &str, message: &str) {
        warn!(notice = key, "{message}");
        self.notices.insert(key.to_owned(), message.to_owned());
    }

    fn remove_notice(&mut self, key: &str) {
        if self.notices.remove(key).is_some() {
            info!(notice = key, "notice cleared");
        }
    }

    fn clear_notices(&mut self) {
        if !self.notices.is_empty() {
            info!(count = self.notices.len(), "notices cleared");
            self.notices.clear();
        }
    }

    fn request_restart(&mut self) {
        error!("restart requested");
    }

    fn install_profile(&mut self, nodes: &[&'static NodeDefinition]) {
        for node in nodes {
            debug!(node = node.id, drivers = node.drivers.len(), "node definition");
        }
    }

    fn add_node(&mut self, address: &ModuleAddress, kind: ModuleKind, name: &str) {
        info!(%address, %kind, module = name, "node added");
    }
}
