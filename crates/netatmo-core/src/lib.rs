//! Module classification and telemetry normalization for Netatmo weather
//! stations.
//!
//! This crate sits between a raw telemetry snapshot and the typed driver
//! values a host publishes:
//!
//! - **[`Controller`]**: async handle that owns the cycle boundary. Timer
//!   polls are coalesced, host [`Command`]s are queued through an `mpsc`
//!   channel, and background tasks stop on a `CancellationToken`.
//!
//! - **[`Supervisor`]**: configure, discover and poll. Re-authenticates
//!   once when the session is rejected and requests a restart if that
//!   fails too.
//!
//! - **[`Classifier`]**: infers a [`ModuleKind`] from payload shape and
//!   assigns each module a stable [`ModuleAddress`].
//!
//! - **[`Module`]**: last-known state per sensor. Readings are
//!   all-or-nothing; a bad cycle never clobbers a good reading.
//!
//! - **[`convert`]**: unit conversion with round-half-up and trend
//!   encoding.
//!
//! The HTTP side lives behind [`TelemetrySource`] ([`NetatmoSource`] for the
//! real cloud) and the host side behind [`DriverSink`].

pub mod classify;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod module;
pub mod sink;
pub mod source;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{Classification, Classifier, kind_of};
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, CredentialField, CredentialParams, Credentials, IndoorOrdering};
pub use controller::Controller;
pub use convert::{ConversionError, Trend, convert_pressure, convert_temperature, encode_trend};
pub use error::{CoreError, ReadingError};
pub use module::{Module, ModuleSnapshot};
pub use sink::{DriverSink, Emission, MemorySink};
pub use source::{NetatmoSource, SourceError, TelemetrySource};
pub use supervisor::{AUTH_NOTICE_KEY, CycleOutcome, Supervisor, SupervisorState};

pub use model::{
    CONTROLLER_ADDRESS, Driver, DriverReading, DriverSpec, DriverValue, FieldValue, ModuleAddress,
    ModuleKind, ModuleReading, NodeDefinition, NormalizedReading, TelemetrySnapshot, Uom,
    node_definitions,
};
