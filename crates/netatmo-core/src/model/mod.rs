// ── Domain model ──
//
// Raw snapshots on one side, typed driver readings on the other, and
// the kind/address pair that ties a module name to its node.

pub mod driver;
pub mod kind;
pub mod reading;

pub use driver::{
    CONTROLLER_NODE, Driver, DriverReading, DriverSpec, DriverValue, Extract, NodeDefinition,
    NormalizedReading, Uom, node_definitions,
};
pub use kind::{CONTROLLER_ADDRESS, ModuleAddress, ModuleKind};
pub use reading::{FieldValue, ModuleReading, TelemetrySnapshot};
