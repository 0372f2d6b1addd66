// ── Driver sink ──
//
// The host side of the pipeline: wherever converted values, operator
// notices and restart requests end up. Implementations must not block;
// they are called from inside a poll cycle.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Driver, DriverValue, ModuleAddress, ModuleKind, NodeDefinition};

/// Receives everything the supervisor publishes.
pub trait DriverSink: Send {
    /// Publish one driver value. `force` asks the host to report it even
    /// if unchanged.
    fn emit(&mut self, address: &ModuleAddress, driver: Driver, value: DriverValue, force: bool);

    /// Raise (or replace) a keyed notice for the operator.
    fn add_notice(&mut self, key: &str, message: &str);

    fn remove_notice(&mut self, key: &str);

    fn clear_notices(&mut self);

    /// The supervisor cannot recover on its own and wants a fresh process.
    fn request_restart(&mut self);

    /// (Re)install node definitions.
    fn install_profile(&mut self, nodes: &[&'static NodeDefinition]) {
        let _ = nodes;
    }

    /// A module was discovered and will be published under `address`.
    fn add_node(&mut self, address: &ModuleAddress, kind: ModuleKind, name: &str) {
        let _ = (address, kind, name);
    }
}

/// One recorded `emit` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emission {
    pub address: ModuleAddress,
    pub driver: Driver,
    pub value: DriverValue,
    pub force: bool,
}

/// A sink that keeps everything in memory.
///
/// Used by one-shot commands that print what a cycle produced, and by
/// tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub emissions: Vec<Emission>,
    pub notices: IndexMap<String, String>,
    pub nodes: Vec<(ModuleAddress, ModuleKind, String)>,
    pub profile_installs: Vec<Vec<&'static str>>,
    pub restart_requested: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value emitted for a driver.
    pub fn latest(&self, address: &str, driver: Driver) -> Option<DriverValue> {
        self.emissions
            .iter()
            .rev()
            .find(|e| e.address.as_str() == address && e.driver == driver)
            .map(|e| e.value)
    }

    /// Forget recorded emissions.
    pub fn take_emissions(&mut self) -> Vec<Emission> {
        std::mem::take(&mut self.emissions)
    }
}

impl DriverSink for MemorySink {
    fn emit(&mut self, address: &ModuleAddress, driver: Driver, value: DriverValue, force: bool) {
        self.emissions.push(Emission {
            address: address.clone(),
            driver,
            value,
            force,
        });
    }

    fn add_notice(&mut self, key: &str, message: &str) {
        self.notices.insert(key.to_owned(), message.to_owned());
    }

    fn remove_notice(&mut self, key: &str) {
        self.notices.shift_remove(key);
    }

    fn clear_notices(&mut self) {
        self.notices.clear();
    }

    fn request_restart(&mut self) {
        self.restart_requested = true;
    }

    fn install_profile(&mut self, nodes: &[&'static NodeDefinition]) {
        self.profile_installs
            .push(nodes.iter().map(|n| n.id).collect());
    }

    fn add_node(&mut self, address: &ModuleAddress, kind: ModuleKind, name: &str) {
        self.nodes.push((address.clone(), kind, name.to_owned()));
    }
}
